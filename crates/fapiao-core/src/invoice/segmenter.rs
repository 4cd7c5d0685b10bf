//! Splitting pages that carry several invoices.
//!
//! A page is split at each invoice number occurrence. Pages where fewer than
//! two numbers are readable are split at their `（小写）` amount lines instead.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::layout::PageLayout;
use crate::models::fields::{ExtractedFields, FULL_DIGITAL_NUMBER_LEN};

use super::parser::{InvoiceParser, RegexInvoiceParser};
use super::rules::dates::format_date;
use super::rules::patterns::{
    CODE_LABELED, LOWERCASE_MARKER, SEGMENT_NUMBER_BARE_20, SEGMENT_NUMBER_LABELED,
    TOTAL_BRACKETED_LOWERCASE, YEN_AMOUNT,
};
use super::rules::{
    chars_after, chars_before, extract_amount_and_tax, extract_block_parties, find_code_before,
    follows_tax_id_label, parse_cn_amount, DateExtractor, FieldExtractor, InvoiceNumberExtractor,
    TotalAmountExtractor,
};

/// Characters skipped past the previous anchor when a block's text starts.
const BLOCK_START_OFFSET_CHARS: usize = 50;

/// A date belongs to an invoice when it starts fewer than this many
/// characters before the invoice number.
const DATE_LOOKBACK_CHARS: usize = 200;

/// A candidate region of a page holding one invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceBlock {
    pub invoice_number: String,
    pub invoice_code: String,
    pub total_amount: Decimal,
    pub date: String,
    /// Page text attributed to this invoice.
    pub text: String,
    /// Byte offset of the block's anchor (number or amount window start).
    pub start_index: usize,
    /// Byte offset where the block ends.
    pub end_index: usize,
}

/// One invoice found on a page, with the text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSegment {
    pub fields: ExtractedFields,
    pub text: String,
}

/// Multi-invoice page segmenter.
#[derive(Debug, Clone, Default)]
pub struct InvoiceSegmenter {
    parser: RegexInvoiceParser,
}

impl InvoiceSegmenter {
    pub fn new() -> Self {
        Self {
            parser: RegexInvoiceParser::new(),
        }
    }

    /// Split a page into invoices.
    ///
    /// A page with at most one block yields the whole-page extraction, or
    /// nothing when that has neither a number nor a positive total.
    pub fn segment(&self, layout: &PageLayout) -> Vec<InvoiceSegment> {
        let blocks = find_blocks(&layout.full_text);

        if blocks.len() <= 1 {
            let fields = self.parser.parse_layout(layout);
            if fields.invoice_number.is_empty() && fields.total_amount <= Decimal::ZERO {
                return Vec::new();
            }
            return vec![InvoiceSegment {
                fields,
                text: layout.full_text.clone(),
            }];
        }

        info!("Detected {} invoices on page", blocks.len());
        blocks
            .into_iter()
            .map(|block| InvoiceSegment {
                fields: self.block_fields(&block),
                text: block.text,
            })
            .collect()
    }

    /// Fields of every invoice on a page.
    pub fn parse_multiple(&self, layout: &PageLayout) -> Vec<ExtractedFields> {
        self.segment(layout)
            .into_iter()
            .map(|segment| segment.fields)
            .collect()
    }

    fn block_fields(&self, block: &InvoiceBlock) -> ExtractedFields {
        let parties = extract_block_parties(&block.text);
        let (amount, tax_amount) = extract_amount_and_tax(&block.text).unwrap_or_default();

        let mut fields = ExtractedFields {
            invoice_number: block.invoice_number.clone(),
            invoice_code: block.invoice_code.clone(),
            date: block.date.clone(),
            seller: parties.seller,
            buyer: parties.buyer,
            amount,
            tax_amount,
            total_amount: block.total_amount,
        };

        let needs_code = fields.invoice_code.is_empty()
            && fields.invoice_number.len() != FULL_DIGITAL_NUMBER_LEN;
        if needs_code || fields.date.is_empty() || fields.total_amount <= Decimal::ZERO {
            let parsed = self.parser.parse_text(&block.text);
            if needs_code {
                fields.invoice_code = parsed.invoice_code;
            }
            if fields.date.is_empty() {
                fields.date = parsed.date;
            }
            if fields.total_amount <= Decimal::ZERO {
                fields.total_amount = parsed.total_amount;
            }
        }

        debug!("Parsed block: number '{}', total {}", fields.invoice_number, fields.total_amount);
        fields
    }
}

/// Locate the invoice blocks of a page's full text.
pub fn find_blocks(text: &str) -> Vec<InvoiceBlock> {
    let numbers = InvoiceNumberExtractor::new().extract_all(text);

    if numbers.len() <= 1 {
        let markers: Vec<usize> = LOWERCASE_MARKER.find_iter(text).map(|m| m.start()).collect();
        if markers.len() > 1 {
            debug!("Splitting page by {} amount lines", markers.len());
            return blocks_by_amount(text, &markers);
        }
    }

    let amounts = TotalAmountExtractor::new().extract_all(text);
    let dates = DateExtractor::new().extract_all(text);

    numbers
        .iter()
        .enumerate()
        .map(|(i, number)| {
            let here = number.start();
            let next = numbers.get(i + 1).map_or(text.len(), |n| n.start());

            let total_amount = amounts
                .iter()
                .find(|a| a.start() > here && a.start() < next)
                .map(|a| a.value)
                .or_else(|| {
                    YEN_AMOUNT
                        .captures(&text[here..next])
                        .and_then(|caps| parse_cn_amount(&caps[1]))
                })
                .unwrap_or_default();

            let earliest_date = chars_before(text, here, DATE_LOOKBACK_CHARS - 1);
            let date = dates
                .iter()
                .find(|d| d.start() >= earliest_date && d.start() < next)
                .map(|d| format_date(d.value))
                .unwrap_or_default();

            // Never start past the block's own number, however close the previous one is.
            let text_start = match i {
                0 => 0,
                _ => chars_after(text, numbers[i - 1].start(), BLOCK_START_OFFSET_CHARS).min(here),
            };

            InvoiceBlock {
                invoice_number: number.value.clone(),
                invoice_code: find_code_before(text, here).unwrap_or_default(),
                total_amount,
                date,
                text: text[text_start..next].to_string(),
                start_index: here,
                end_index: next,
            }
        })
        .collect()
}

fn blocks_by_amount(text: &str, markers: &[usize]) -> Vec<InvoiceBlock> {
    let dates = DateExtractor::new();

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, &marker)| {
            let start = match i {
                0 => 0,
                _ => chars_after(text, markers[i - 1], BLOCK_START_OFFSET_CHARS).min(marker),
            };
            let end = markers.get(i + 1).copied().unwrap_or(text.len());
            let segment = &text[start..end];

            let total_amount = TOTAL_BRACKETED_LOWERCASE
                .captures(segment)
                .and_then(|caps| parse_cn_amount(&caps[1]))
                .unwrap_or_default();

            let invoice_number = SEGMENT_NUMBER_LABELED
                .captures(segment)
                .map(|caps| caps[1].to_string())
                .or_else(|| {
                    SEGMENT_NUMBER_BARE_20
                        .find_iter(segment)
                        .find(|m| !follows_tax_id_label(segment, m.start()))
                        .map(|m| m.as_str().to_string())
                })
                .unwrap_or_default();

            if invoice_number.is_empty() && total_amount <= Decimal::ZERO {
                return None;
            }

            Some(InvoiceBlock {
                invoice_number,
                invoice_code: CODE_LABELED
                    .captures(segment)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_default(),
                total_amount,
                date: dates
                    .extract(segment)
                    .map(|d| format_date(d.value))
                    .unwrap_or_default(),
                text: segment.to_string(),
                start_index: start,
                end_index: end,
            })
        })
        .collect()
}
