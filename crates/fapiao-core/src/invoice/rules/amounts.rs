//! Amount extraction: 价税合计, 金额 and 税额.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Captures;
use rust_decimal::Decimal;

use super::patterns::{
    AMOUNT_AND_TAX, LOWERCASE_AMOUNT, MONEY_TOKEN, TOTAL_AFTER_UPPERCASE,
    TOTAL_BRACKETED_LOWERCASE, TOTAL_LOWERCASE_YEN, TOTAL_WITH_LOWERCASE, YEN_AMOUNT,
};
use super::{first_match, ExtractionMatch, FieldExtractor, Rule};

/// Tokens at or above this value are never taken as a fallback total.
const MAX_FALLBACK_TOTAL: i64 = 1_000_000_000;

lazy_static! {
    static ref TOTAL_RULES: Vec<Rule<Decimal>> = vec![
        Rule::new("total-lowercase", &TOTAL_WITH_LOWERCASE, amount_group),
        Rule::new("bracketed-lowercase", &TOTAL_BRACKETED_LOWERCASE, amount_group),
        Rule::new("lowercase-yen", &TOTAL_LOWERCASE_YEN, amount_group),
        Rule::new("after-uppercase", &TOTAL_AFTER_UPPERCASE, amount_group),
        Rule::new("yen", &YEN_AMOUNT, amount_group),
    ];
}

/// Parse a captured amount such as `1,234.5` or `99.`.
pub fn parse_cn_amount(s: &str) -> Option<Decimal> {
    let cleaned = s.replace(',', "");
    let cleaned = cleaned.trim().trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}

fn amount_group(caps: &Captures<'_>, _text: &str) -> Option<Decimal> {
    caps.get(1).and_then(|m| parse_cn_amount(m.as_str()))
}

/// Extract the total amount (价税合计).
///
/// Falls back to the largest `n.nn` token below one billion when no labeled
/// amount is found or the labeled amount is zero.
pub fn extract_total_amount(text: &str) -> Decimal {
    let labeled = first_match(&TOTAL_RULES, text)
        .map(|m| m.value)
        .unwrap_or_default();
    if labeled > Decimal::ZERO {
        return labeled;
    }
    largest_money_token(text).unwrap_or(labeled)
}

fn largest_money_token(text: &str) -> Option<Decimal> {
    let ceiling = Decimal::from(MAX_FALLBACK_TOTAL);
    MONEY_TOKEN
        .find_iter(text)
        .filter_map(|m| parse_cn_amount(m.as_str()))
        .filter(|v| *v > Decimal::ZERO && *v < ceiling)
        .max()
}

/// Extract `(amount, tax)` from the 合计 line.
pub fn extract_amount_and_tax(text: &str) -> Option<(Decimal, Decimal)> {
    let caps = AMOUNT_AND_TAX.captures(text)?;
    let amount = parse_cn_amount(caps.get(1)?.as_str())?;
    let tax = parse_cn_amount(caps.get(2)?.as_str())?;
    Some((amount, tax))
}

/// Total amount extractor.
///
/// `extract_all` lists every positive `小写` amount in text order; each one
/// closes an invoice on a multi-invoice page.
pub struct TotalAmountExtractor;

impl TotalAmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotalAmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TotalAmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        first_match(&TOTAL_RULES, text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        LOWERCASE_AMOUNT
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let value = amount_group(&caps, text)?;
                (value > Decimal::ZERO)
                    .then(|| ExtractionMatch::new(value, "lowercase", whole.start(), whole.end()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_cn_amount() {
        assert_eq!(parse_cn_amount("1,234.50"), Some(dec("1234.50")));
        assert_eq!(parse_cn_amount("99."), Some(dec("99")));
        assert_eq!(parse_cn_amount(","), None);
    }

    #[test]
    fn test_total_after_price_tax_label() {
        let text = "价税合计（大写）壹佰贰拾捌圆伍角 （小写）¥128.50";
        assert_eq!(extract_total_amount(text), dec("128.50"));
    }

    #[test]
    fn test_bracketed_lowercase_beats_other_yen_amounts() {
        let text = "税额 ¥5.00 合计 （小写）¥128.50";
        assert_eq!(extract_total_amount(text), dec("128.50"));
    }

    #[test]
    fn test_full_width_yen() {
        assert_eq!(extract_total_amount("小写：￥1,056.00"), dec("1056.00"));
    }

    #[test]
    fn test_falls_back_to_largest_token() {
        let text = "金额 100.00 税额 13.00 合计 113.00 账号 12345678901.00";
        assert_eq!(extract_total_amount(text), dec("113.00"));
    }

    #[test]
    fn test_zero_labeled_total_uses_fallback() {
        let text = "（小写）¥0.00 明细 88.80";
        assert_eq!(extract_total_amount(text), dec("88.80"));
    }

    #[test]
    fn test_no_amount_is_zero() {
        assert_eq!(extract_total_amount("发票号码 12345678"), Decimal::ZERO);
    }

    #[test]
    fn test_amount_and_tax_line() {
        assert_eq!(
            extract_amount_and_tax("合 计 ¥113.21 ¥14.72"),
            Some((dec("113.21"), dec("14.72")))
        );
        assert_eq!(extract_amount_and_tax("合计¥113.21"), None);
    }

    #[test]
    fn test_extract_all_lowercase_amounts() {
        let text = "（小写）¥100.00 ... (小写)¥0.00 ... 小写：¥200.50";
        let all = TotalAmountExtractor::new().extract_all(text);
        let values: Vec<Decimal> = all.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![dec("100.00"), dec("200.50")]);
    }
}
