//! Layout-aware regex parser for a single invoice.

use tracing::{debug, trace};

use crate::layout::PageLayout;
use crate::models::fields::{ExtractedFields, FULL_DIGITAL_NUMBER_LEN};

use super::rules::{
    extract_amount_and_tax, extract_date, extract_invoice_code, extract_invoice_number,
    extract_parties, extract_total_amount,
};

/// Trait for single-invoice field extraction.
pub trait InvoiceParser {
    /// Parse the fields of the invoice shown on a page.
    fn parse_layout(&self, layout: &PageLayout) -> ExtractedFields;

    /// Parse fields from text without positions.
    fn parse_text(&self, text: &str) -> ExtractedFields {
        self.parse_layout(&PageLayout::from_text(text))
    }
}

/// Regex rule cascades over a page's text, with a column split for parties.
///
/// Never fails; fields that are not found stay empty or zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexInvoiceParser;

impl RegexInvoiceParser {
    pub fn new() -> Self {
        Self
    }
}

impl InvoiceParser for RegexInvoiceParser {
    fn parse_layout(&self, layout: &PageLayout) -> ExtractedFields {
        let text = layout.full_text.as_str();
        let mut fields = ExtractedFields::default();

        if let Some(number) = extract_invoice_number(text) {
            trace!("Invoice number matched by rule {}", number.rule);
            fields.invoice_number = number.value;
        }

        // Fully digitized invoices carry no code.
        if fields.invoice_number.len() != FULL_DIGITAL_NUMBER_LEN {
            if let Some(code) = extract_invoice_code(text) {
                trace!("Invoice code matched by rule {}", code.rule);
                fields.invoice_code = code.value;
            }
        }

        fields.date = extract_date(text).unwrap_or_default();
        fields.total_amount = extract_total_amount(text);

        if let Some((amount, tax)) = extract_amount_and_tax(text) {
            fields.amount = amount;
            fields.tax_amount = tax;
        }

        let parties = extract_parties(layout);
        fields.buyer = parties.buyer;
        fields.seller = parties.seller;

        debug!(
            "Parsed invoice: number '{}', code '{}', total {}",
            fields.invoice_number, fields.invoice_code, fields.total_amount
        );
        fields
    }
}
