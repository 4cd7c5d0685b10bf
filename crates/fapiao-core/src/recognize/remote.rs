//! Remote structured extraction contract.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::RemoteError;
use crate::media::ImageSource;
use crate::models::fields::ExtractedFields;

/// System prompt for text extraction.
pub const TEXT_SYSTEM_PROMPT: &str =
    "你是发票信息提取助手。从用户提供的发票文本中提取关键信息，只返回JSON格式，不要其他内容。";

/// User prompt preceding the invoice text.
pub const TEXT_USER_PROMPT: &str = r#"从以下发票文本中提取信息，返回JSON格式：
{
  "invoiceNumber": "发票号码(8-20位数字)",
  "invoiceCode": "发票代码(10-12位数字，全电发票可为空)",
  "date": "开票日期(YYYY-MM-DD格式)",
  "seller": "销售方名称",
  "buyer": "购买方名称",
  "amount": 金额(数字),
  "taxAmount": 税额(数字),
  "totalAmount": 价税合计(数字)
}

发票文本：
"#;

/// Instruction sent alongside a page image.
pub const IMAGE_INSTRUCTION: &str =
    "识别发票，返回JSON: {invoiceNumber,invoiceCode,date,seller,buyer,amount,taxAmount,totalAmount}";

lazy_static! {
    // Outermost brace pair, so prose or code fences around the object are ignored.
    static ref JSON_OBJECT: Regex = Regex::new(r"\{(?s:.)*\}").unwrap();
}

/// A remote service that turns page text or images into invoice fields.
#[async_trait]
pub trait RemoteExtractor: Send + Sync {
    /// Structured extraction from page text.
    async fn extract_text(&self, text: &str) -> Result<ExtractedFields, RemoteError>;

    /// Structured extraction from a page image.
    async fn extract_image(&self, image: &ImageSource) -> Result<ExtractedFields, RemoteError>;
}

/// Build the user message for text extraction, keeping at most `max_chars`
/// characters of the invoice text.
pub fn text_prompt(text: &str, max_chars: usize) -> String {
    let mut prompt = String::from(TEXT_USER_PROMPT);
    prompt.extend(text.chars().take(max_chars));
    prompt
}

/// Recover invoice fields from free-form model output.
pub fn fields_from_content(content: &str) -> Result<ExtractedFields, RemoteError> {
    let object = JSON_OBJECT
        .find(content)
        .ok_or_else(|| RemoteError::UnparseableResponse(preview(content)))?;
    let json: Value = serde_json::from_str(object.as_str())
        .map_err(|e| RemoteError::UnparseableResponse(e.to_string()))?;
    if !json.is_object() {
        return Err(RemoteError::UnparseableResponse(preview(content)));
    }
    Ok(ExtractedFields::from_remote_json(&json))
}

fn preview(content: &str) -> String {
    const PREVIEW_CHARS: usize = 80;
    if content.trim().is_empty() {
        return "empty response".to_string();
    }
    content.chars().take(PREVIEW_CHARS).collect()
}
