//! Rule-based field extractors for Chinese VAT invoices.
//!
//! Every field is located by an ordered table of [`Rule`]s; the first rule
//! whose pattern matches and whose capture converts wins.

pub mod amounts;
pub mod code;
pub mod dates;
pub mod number;
pub mod parties;
pub mod patterns;

pub use amounts::{
    extract_amount_and_tax, extract_total_amount, parse_cn_amount, TotalAmountExtractor,
};
pub use code::{extract_invoice_code, find_code_before};
pub use dates::{extract_date, DateExtractor};
pub use number::{extract_invoice_number, InvoiceNumberExtractor};
pub use parties::{extract_parties, extract_block_parties, Parties};

use regex::{Captures, Regex};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value located in source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Name of the rule that produced the value.
    pub rule: &'static str,
    /// Byte range of the whole match in the source text.
    pub position: (usize, usize),
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, rule: &'static str, start: usize, end: usize) -> Self {
        Self {
            value,
            rule,
            position: (start, end),
        }
    }

    pub fn start(&self) -> usize {
        self.position.0
    }
}

/// Converts a successful match into a field value.
///
/// Receives the haystack as well so that rules can look at the context
/// around the match.
pub type Convert<T> = fn(&Captures<'_>, &str) -> Option<T>;

/// One entry of an ordered extraction table.
pub struct Rule<T> {
    pub name: &'static str,
    pub pattern: &'static Regex,
    pub convert: Convert<T>,
}

impl<T> Rule<T> {
    pub fn new(name: &'static str, pattern: &'static Regex, convert: Convert<T>) -> Self {
        Self {
            name,
            pattern,
            convert,
        }
    }

    /// First match of this rule that converts.
    pub fn apply(&self, text: &str) -> Option<ExtractionMatch<T>> {
        self.pattern.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            (self.convert)(&caps, text)
                .map(|value| ExtractionMatch::new(value, self.name, whole.start(), whole.end()))
        })
    }
}

/// Run a table in order and return the first rule that yields a value.
pub fn first_match<T>(rules: &[Rule<T>], text: &str) -> Option<ExtractionMatch<T>> {
    rules.iter().find_map(|rule| rule.apply(text))
}

/// Capture group 1 as an owned string.
pub fn group_1(caps: &Captures<'_>, _text: &str) -> Option<String> {
    caps.get(1).map(|m| m.as_str().to_string())
}

/// Byte offset `n` characters before `idx`, clamped to the start of `text`.
pub fn chars_before(text: &str, idx: usize, n: usize) -> usize {
    if n == 0 {
        return idx;
    }
    text[..idx]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset `n` characters after `idx`, clamped to the end of `text`.
pub fn chars_after(text: &str, idx: usize, n: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| idx + i)
        .unwrap_or(text.len())
}

/// Whether a taxpayer ID label occurs in the 20 characters before `idx`.
pub fn follows_tax_id_label(text: &str, idx: usize) -> bool {
    let from = chars_before(text, idx, 20);
    patterns::TAX_ID_LABEL.is_match(&text[from..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_char_windows_respect_boundaries() {
        let text = "发票号码12";
        let idx = text.find('1').unwrap();
        assert_eq!(&text[chars_before(text, idx, 2)..idx], "号码");
        assert_eq!(chars_before(text, idx, 50), 0);
        assert_eq!(&text[..chars_after(text, 0, 1)], "发");
        assert_eq!(chars_after(text, 0, 100), text.len());
    }

    #[test]
    fn test_tax_id_label_guard() {
        let text = "纳税人识别号：91440300MA5XXXXX1X 12345678901234567890";
        let idx = text.find("1234567890123").unwrap();
        assert!(!follows_tax_id_label(text, idx));
        let text = "纳税人识别号：12345678901234567890";
        let idx = text.find("1234").unwrap();
        assert!(follows_tax_id_label(text, idx));
    }

    #[test]
    fn test_first_match_skips_rules_that_do_not_convert() {
        fn reject(_: &Captures<'_>, _: &str) -> Option<String> {
            None
        }
        let rules = [
            Rule::new("rejecting", &*patterns::NUMBER_LABELED_20, reject),
            Rule::new("accepting", &*patterns::NUMBER_LABELED_SHORT, group_1),
        ];
        let found = first_match(&rules, "发票号码：12345678").unwrap();
        assert_eq!(found.value, "12345678");
        assert_eq!(found.rule, "accepting");
    }
}
