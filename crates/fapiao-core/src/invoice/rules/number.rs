//! Invoice number (发票号码) extraction.

use lazy_static::lazy_static;

use super::patterns::{
    NUMBER_LABELED_20, NUMBER_LABELED_SHORT, NUMBER_NO_LABEL, NUMBER_SHORT_LABEL_20,
    NUMBER_SHORT_LABEL_8, SEGMENT_NUMBER_BARE_20, SEGMENT_NUMBER_LABELED, SEGMENT_NUMBER_NO,
};

use super::{first_match, follows_tax_id_label, group_1, ExtractionMatch, FieldExtractor, Rule};

lazy_static! {
    /// Ordered from most to least specific. Every rule needs a label: bare
    /// digit runs are bank accounts and tax IDs as often as invoice numbers.
    static ref NUMBER_RULES: Vec<Rule<String>> = vec![
        Rule::new("labeled-20", &NUMBER_LABELED_20, group_1),
        Rule::new("labeled-8-12", &NUMBER_LABELED_SHORT, group_1),
        Rule::new("short-label-20", &NUMBER_SHORT_LABEL_20, group_1),
        Rule::new("short-label-8", &NUMBER_SHORT_LABEL_8, group_1),
        Rule::new("no-prefix", &NUMBER_NO_LABEL, group_1),
    ];
}

/// Extract the invoice number of a single invoice.
pub fn extract_invoice_number(text: &str) -> Option<ExtractionMatch<String>> {
    first_match(&NUMBER_RULES, text)
}

/// Invoice number extractor.
///
/// `extract` runs the single-invoice cascade. `extract_all` lists the number
/// occurrences on a page in text order, for splitting multi-invoice pages.
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InvoiceNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        extract_invoice_number(text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let patterns = [
            &*SEGMENT_NUMBER_LABELED,
            &*SEGMENT_NUMBER_BARE_20,
            &*SEGMENT_NUMBER_NO,
        ];

        // The first pattern with any surviving match is used on its own.
        for pattern in patterns {
            let found: Vec<ExtractionMatch<String>> = pattern
                .captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let number = caps.get(1)?;
                    if follows_tax_id_label(text, whole.start()) {
                        return None;
                    }
                    Some(ExtractionMatch::new(
                        number.as_str().to_string(),
                        "segment",
                        whole.start(),
                        whole.end(),
                    ))
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }
}
