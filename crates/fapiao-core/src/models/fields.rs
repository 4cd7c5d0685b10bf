//! Canonical extraction output shared by every recognition strategy.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Length of a fully digitized (全电) invoice number. Such invoices carry no code.
pub const FULL_DIGITAL_NUMBER_LEN: usize = 20;

/// Structured fields of one invoice.
///
/// Strings are empty and amounts zero when a field is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedFields {
    /// 发票号码.
    pub invoice_number: String,
    /// 发票代码.
    pub invoice_code: String,
    /// 开票日期 as `YYYY-MM-DD`, or empty.
    pub date: String,
    /// 销售方名称.
    pub seller: String,
    /// 购买方名称.
    pub buyer: String,
    /// 金额 (net amount).
    pub amount: Decimal,
    /// 税额.
    pub tax_amount: Decimal,
    /// 价税合计.
    pub total_amount: Decimal,
}

impl ExtractedFields {
    /// Whether the fields carry enough to count as a recognized invoice.
    pub fn has_content(&self) -> bool {
        !self.invoice_number.is_empty()
            || !self.invoice_code.is_empty()
            || self.total_amount > Decimal::ZERO
    }

    /// Whether this is a fully digitized invoice (20-digit number, no code).
    pub fn is_fully_digital(&self) -> bool {
        self.invoice_number.len() == FULL_DIGITAL_NUMBER_LEN
    }

    /// Adapt the JSON object returned by a remote model.
    ///
    /// Missing or malformed values fall back to their zero value.
    pub fn from_remote_json(json: &Value) -> Self {
        Self {
            invoice_number: json_string(json.get("invoiceNumber")),
            invoice_code: json_string(json.get("invoiceCode")),
            date: normalize_date(&json_string(json.get("date"))),
            seller: json_string(json.get("seller")),
            buyer: json_string(json.get("buyer")),
            amount: json_amount(json.get("amount")),
            tax_amount: json_amount(json.get("taxAmount")),
            total_amount: json_amount(json.get("totalAmount")),
        }
    }
}

fn json_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn json_amount(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .map(|d| d.round_dp(2))
            .unwrap_or_default(),
        Some(Value::String(s)) => parse_amount(s).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

/// Parse an amount such as `1,234.50`, `¥128.5` or `￥ 99`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Normalize a date into `YYYY-MM-DD` when it is in a recognizable layout.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}
