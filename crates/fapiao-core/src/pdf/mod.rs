//! PDF loading: per-page text layout plus an image for scanned pages.

mod extractor;
mod text_layout;

pub use extractor::PdfLayoutSource;
pub use text_layout::layout_from_page_text;

use crate::error::PdfError;
use crate::layout::PageLayout;
use crate::media::ImageSource;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Content from a single PDF page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Text layer of the page; blank for scans.
    pub layout: PageLayout,
    /// Embedded page image, only looked up for pages without usable text.
    pub image: Option<ImageSource>,
}
