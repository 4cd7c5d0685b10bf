//! Data models: extracted fields, invoice records and configuration.

pub mod config;
pub mod fields;
pub mod record;

pub use config::FapiaoConfig;
pub use fields::ExtractedFields;
pub use record::{
    InvoiceDraft, InvoiceId, InvoiceRecord, InvoiceStatus, RecognitionMethod, RecognitionStatus,
    Recognized,
};
