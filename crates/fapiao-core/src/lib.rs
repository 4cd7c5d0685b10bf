//! Core library for Chinese VAT invoice (发票) extraction.
//!
//! This crate provides:
//! - Page layout reconstruction from positioned text fragments
//! - Regex field extraction and multi-invoice page segmentation
//! - A recognition cascade with remote text and vision fallbacks
//! - Duplicate detection and an ordered invoice store
//! - PDF loading and batch processing (`native` feature)

pub mod dedup;
pub mod error;
pub mod invoice;
pub mod layout;
pub mod media;
pub mod models;
pub mod recognize;
pub mod store;

#[cfg(feature = "native")]
pub mod batch;
#[cfg(feature = "native")]
pub mod pdf;

pub use dedup::{check_duplicates, dedupe_key};
pub use error::{FapiaoError, FileError, PdfError, RecognitionError, RemoteError, Result};
pub use invoice::{InvoiceParser, InvoiceSegment, InvoiceSegmenter, RegexInvoiceParser};
pub use layout::{PageLayout, PositionedFragment};
pub use media::ImageSource;
pub use models::{
    ExtractedFields, FapiaoConfig, InvoiceDraft, InvoiceId, InvoiceRecord, InvoiceStatus,
    RecognitionMethod, RecognitionStatus, Recognized,
};
pub use recognize::{RecognitionInput, Recognizer, RemoteExtractor};
pub use store::{FinalizedInvoices, InvoiceField, InvoiceStore};

#[cfg(feature = "native")]
pub use batch::{BatchProcessor, BatchReport, is_supported_file};
#[cfg(feature = "native")]
pub use pdf::{PdfLayoutSource, PdfPage};
#[cfg(feature = "native")]
pub use recognize::SiliconFlowClient;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
