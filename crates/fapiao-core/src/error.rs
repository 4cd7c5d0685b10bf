//! Error types for the fapiao-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the fapiao library.
#[derive(Error, Debug)]
pub enum FapiaoError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Remote recognition service error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Input file error.
    #[error("file error: {0}")]
    File(#[from] FileError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Embedded image with dimensions that cannot describe a real bitmap.
    #[error("invalid image dimensions: {width}x{height}")]
    ImageDimensions { width: i64, height: i64 },
}

/// Errors raised while admitting or reading an input file.
#[derive(Error, Debug)]
pub enum FileError {
    /// File extension is not one of pdf/jpg/jpeg/png.
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    /// The file could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the remote text/vision extraction service.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure.
    #[cfg(feature = "native")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// No JSON object could be recovered from the model output.
    #[error("unparseable response: {0}")]
    UnparseableResponse(String),
}

/// Why a single invoice ended in the `error` recognition state.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// A remote call failed and no other strategy produced a result.
    #[error("remote recognition failed: {0}")]
    RemoteCall(#[from] RemoteError),

    /// Every strategy ran but none produced a number, code or total.
    #[error("{}", incomplete_message(.remote_failure))]
    ExtractionIncomplete { remote_failure: Option<String> },

    /// Page has no text layer and no remote vision capability is configured.
    #[error("image-only page, recognition unsupported without remote capability")]
    ImageOnlyUnsupported,
}

fn incomplete_message(remote_failure: &Option<String>) -> String {
    match remote_failure {
        Some(reason) => format!("no valid content recognized (remote: {reason})"),
        None => "no valid content recognized".to_string(),
    }
}

/// Result type for the fapiao library.
pub type Result<T> = std::result::Result<T, FapiaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_error_messages() {
        assert_eq!(
            RecognitionError::ImageOnlyUnsupported.to_string(),
            "image-only page, recognition unsupported without remote capability"
        );
        assert_eq!(
            RecognitionError::ExtractionIncomplete { remote_failure: None }.to_string(),
            "no valid content recognized"
        );
        let with_remote = RecognitionError::ExtractionIncomplete {
            remote_failure: Some("server returned 500: boom".to_string()),
        };
        assert!(with_remote.to_string().contains("server returned 500"));
    }
}
