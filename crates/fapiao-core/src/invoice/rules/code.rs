//! Invoice code (发票代码) extraction.

use lazy_static::lazy_static;

use super::patterns::{CODE_BEFORE_LABEL, CODE_LABELED, CODE_SHORT_LABEL};
use super::{chars_before, first_match, group_1, ExtractionMatch, Rule};

/// Characters searched before an invoice number for its code.
pub const CODE_LOOKBACK_CHARS: usize = 100;

lazy_static! {
    static ref CODE_RULES: Vec<Rule<String>> = vec![
        Rule::new("labeled", &CODE_LABELED, group_1),
        Rule::new("short-label", &CODE_SHORT_LABEL, group_1),
        Rule::new("label-after", &CODE_BEFORE_LABEL, group_1),
    ];
}

/// Extract the invoice code.
///
/// Fully digitized invoices have no code, so callers skip this when the
/// number is 20 digits long.
pub fn extract_invoice_code(text: &str) -> Option<ExtractionMatch<String>> {
    first_match(&CODE_RULES, text)
}

/// Look for a labeled code in the characters just before `idx`.
pub fn find_code_before(text: &str, idx: usize) -> Option<String> {
    let from = chars_before(text, idx, CODE_LOOKBACK_CHARS);
    CODE_LABELED
        .captures(&text[from..idx])
        .map(|caps| caps[1].to_string())
}
