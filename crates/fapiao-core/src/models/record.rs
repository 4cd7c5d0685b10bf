//! Invoice records tracked across a batch.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::ExtractedFields;
use crate::error::RecognitionError;

/// Stable identifier of a record within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub u64);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Strategy that produced a record's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionMethod {
    /// Regex rules over the page's text layer.
    LayoutRegex,
    /// Remote language model over the page text.
    RemoteLlm,
    /// Remote vision model over the page image.
    RemoteOcr,
}

impl RecognitionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LayoutRegex => "layout-regex",
            Self::RemoteLlm => "remote-llm",
            Self::RemoteOcr => "remote-ocr",
        }
    }
}

/// Lifecycle of recognition: `Pending -> Processing -> Success | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Error,
}

impl RecognitionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Validity of a record as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Valid,
    Invalid,
    Duplicate,
}

/// Successful recognition result.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognized {
    pub fields: ExtractedFields,
    pub method: RecognitionMethod,
}

/// Everything needed to create a record before its fields are known.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    /// Display name, e.g. `a.pdf - page 2 - invoice 1`.
    pub file_name: String,
    /// Name of the uploaded file this record came from.
    pub source_file: String,
    /// 1-based page number for PDF sources.
    pub page_number: Option<u32>,
}

impl InvoiceDraft {
    pub fn new(file_name: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source_file: source_file.into(),
            page_number: None,
        }
    }

    pub fn with_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}

/// One invoice as tracked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub file_name: String,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page_number: Option<u32>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: ExtractedFields,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recognition_method: Option<RecognitionMethod>,
    pub recognition_status: RecognitionStatus,
    pub status: InvoiceStatus,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl InvoiceRecord {
    /// Create a pending record.
    pub fn new(id: InvoiceId, draft: InvoiceDraft) -> Self {
        Self {
            id,
            file_name: draft.file_name,
            source_file: draft.source_file,
            page_number: draft.page_number,
            uploaded_at: Utc::now(),
            fields: ExtractedFields::default(),
            recognition_method: None,
            recognition_status: RecognitionStatus::Pending,
            status: InvoiceStatus::Valid,
            is_duplicate: false,
            error_message: None,
        }
    }

    /// Store fields and settle the status from their content.
    ///
    /// A record without number, code or positive total ends in `Error`
    /// regardless of which strategy produced it.
    pub fn apply_fields(&mut self, fields: ExtractedFields, method: RecognitionMethod) {
        let has_content = fields.has_content();
        self.fields = fields;
        self.recognition_method = Some(method);
        if has_content {
            self.recognition_status = RecognitionStatus::Success;
            self.status = InvoiceStatus::Valid;
            self.error_message = None;
        } else {
            self.recognition_status = RecognitionStatus::Error;
            self.status = InvoiceStatus::Invalid;
            self.error_message = Some(
                RecognitionError::ExtractionIncomplete {
                    remote_failure: None,
                }
                .to_string(),
            );
        }
    }

    /// Apply the terminal outcome of the recognition cascade.
    pub fn apply_recognition(&mut self, outcome: Result<Recognized, RecognitionError>) {
        match outcome {
            Ok(recognized) => self.apply_fields(recognized.fields, recognized.method),
            Err(err) => {
                self.recognition_status = RecognitionStatus::Error;
                self.status = InvoiceStatus::Invalid;
                self.error_message = Some(err.to_string());
            }
        }
    }

    /// Whether the record may take part in duplicate detection.
    pub fn is_recognized(&self) -> bool {
        self.recognition_status == RecognitionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record() -> InvoiceRecord {
        InvoiceRecord::new(InvoiceId(1), InvoiceDraft::new("a.pdf", "a.pdf").with_page(1))
    }

    #[test]
    fn test_apply_fields_without_content_is_error() {
        let mut record = record();
        record.apply_fields(ExtractedFields::default(), RecognitionMethod::RemoteLlm);
        assert_eq!(record.recognition_status, RecognitionStatus::Error);
        assert_eq!(record.status, InvoiceStatus::Invalid);
        assert_eq!(record.error_message.as_deref(), Some("no valid content recognized"));
    }

    #[test]
    fn test_apply_fields_with_total_only_is_success() {
        let mut record = record();
        let fields = ExtractedFields {
            total_amount: Decimal::from(12),
            ..Default::default()
        };
        record.apply_fields(fields, RecognitionMethod::LayoutRegex);
        assert!(record.is_recognized());
        assert_eq!(record.recognition_method, Some(RecognitionMethod::LayoutRegex));
    }

    #[test]
    fn test_apply_recognition_error_keeps_message() {
        let mut record = record();
        record.apply_recognition(Err(RecognitionError::ImageOnlyUnsupported));
        assert_eq!(record.recognition_status, RecognitionStatus::Error);
        assert!(record.error_message.unwrap().contains("image-only"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["invoiceNumber"], "");
        assert_eq!(json["recognitionStatus"], "pending");
        assert_eq!(json["pageNumber"], 1);
    }
}
