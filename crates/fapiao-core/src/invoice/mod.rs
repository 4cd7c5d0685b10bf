//! Invoice field extraction module.

mod parser;
pub mod rules;
pub mod segmenter;

pub use parser::{InvoiceParser, RegexInvoiceParser};
pub use segmenter::{find_blocks, InvoiceBlock, InvoiceSegment, InvoiceSegmenter};
