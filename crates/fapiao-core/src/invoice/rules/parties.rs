//! Buyer (购买方) and seller (销售方) name extraction.
//!
//! VAT invoices print the buyer in the left column and the seller in the
//! right one. With positioned fragments the page is split at half its width
//! and each column is searched for a name label; regex tables over the full
//! text cover whatever the columns did not yield.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::patterns::{
    ANY_COMPANY_NAME, BLOCK_BUYER_INLINE, BLOCK_BUYER_SECTION, BLOCK_BUYER_SHORT,
    BLOCK_SELLER_INLINE, BLOCK_SELLER_SECTION, BLOCK_SELLER_SHORT, BUYER_COMPANY, BUYER_LABEL,
    BUYER_NAME_INLINE, BUYER_NAME_SPACED, BUYER_SECTION_NAME, BUYER_SHORT, NAME_LABEL, NAME_TAIL,
    SELLER_INLINE, SELLER_LABEL, SELLER_NAME_INLINE, SELLER_NAME_SPACED, SELLER_SECTION_NAME,
    SELLER_SHORT, STAMP_MARKER,
};
use super::{first_match, group_1, Rule};
use crate::layout::{PageLayout, PositionedFragment};

/// Column split used when every fragment sits at x = 0.
const DEFAULT_MID_X: f64 = 300.0;

/// Fragments within this vertical distance of a label continue its value.
const SAME_LINE_TOLERANCE: f64 = 4.0;

lazy_static! {
    static ref BUYER_RULES: Vec<Rule<String>> = vec![
        Rule::new("section-name", &BUYER_SECTION_NAME, cleaned_name),
        Rule::new("inline-name", &BUYER_NAME_INLINE, cleaned_name),
        Rule::new("short", &BUYER_SHORT, cleaned_name),
        Rule::new("spaced-name", &BUYER_NAME_SPACED, cleaned_name),
        Rule::new("company", &BUYER_COMPANY, cleaned_name),
    ];

    static ref SELLER_RULES: Vec<Rule<String>> = vec![
        Rule::new("section-name", &SELLER_SECTION_NAME, cleaned_name),
        Rule::new("inline-name", &SELLER_NAME_INLINE, cleaned_name),
        Rule::new("short", &SELLER_SHORT, cleaned_name),
        Rule::new("inline", &SELLER_INLINE, cleaned_name),
        Rule::new("spaced-name", &SELLER_NAME_SPACED, cleaned_name),
        Rule::new("any-company", &ANY_COMPANY_NAME, cleaned_name),
    ];

    static ref BLOCK_BUYER_RULES: Vec<Rule<String>> = vec![
        Rule::new("section-name", &BLOCK_BUYER_SECTION, cleaned_name),
        Rule::new("inline-name", &BLOCK_BUYER_INLINE, cleaned_name),
        Rule::new("short", &BLOCK_BUYER_SHORT, cleaned_name),
    ];

    static ref BLOCK_SELLER_RULES: Vec<Rule<String>> = vec![
        Rule::new("section-name", &BLOCK_SELLER_SECTION, cleaned_name),
        Rule::new("inline-name", &BLOCK_SELLER_INLINE, cleaned_name),
        Rule::new("short", &BLOCK_SELLER_SHORT, cleaned_name),
    ];
}

/// Buyer and seller names; empty when not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parties {
    pub buyer: String,
    pub seller: String,
}

/// Extract both parties from a page.
pub fn extract_parties(layout: &PageLayout) -> Parties {
    let mut parties = column_parties(&layout.fragments);

    if parties.buyer.is_empty() {
        parties.buyer = name_from_rules(&BUYER_RULES, &layout.full_text);
    }
    if parties.seller.is_empty() {
        parties.seller = name_from_rules(&SELLER_RULES, &layout.full_text);
    }
    parties
}

/// Extract both parties from the text of one invoice on a multi-invoice page.
pub fn extract_block_parties(text: &str) -> Parties {
    Parties {
        buyer: name_from_rules(&BLOCK_BUYER_RULES, text),
        seller: name_from_rules(&BLOCK_SELLER_RULES, text),
    }
}

fn name_from_rules(rules: &[Rule<String>], text: &str) -> String {
    first_match(rules, text).map(|m| m.value).unwrap_or_default()
}

fn column_parties(fragments: &[PositionedFragment]) -> Parties {
    if fragments.is_empty() {
        return Parties::default();
    }

    let max_x = fragments
        .iter()
        .map(|f| f.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let mid_x = if max_x / 2.0 == 0.0 {
        DEFAULT_MID_X
    } else {
        max_x / 2.0
    };

    let (left, right): (Vec<&PositionedFragment>, Vec<&PositionedFragment>) =
        fragments.iter().partition(|f| f.x < mid_x);

    Parties {
        buyer: value_in_column(&left, &NAME_LABEL)
            .or_else(|| value_in_column(&left, &BUYER_LABEL))
            .unwrap_or_default(),
        seller: value_in_column(&right, &NAME_LABEL)
            .or_else(|| value_in_column(&right, &SELLER_LABEL))
            .unwrap_or_default(),
    }
}

/// Text following the first label in a column that has any.
///
/// The label fragment's own remainder counts when it is longer than one
/// character; fragments on the same line are appended until the first one
/// that leaves the line.
fn value_in_column(column: &[&PositionedFragment], label: &Regex) -> Option<String> {
    for (i, fragment) in column.iter().enumerate() {
        let Some(found) = label.find(&fragment.text) else {
            continue;
        };

        let mut value = String::new();
        let own = fragment.text.replacen(found.as_str(), "", 1);
        let own = own.trim();
        if own.chars().count() > 1 {
            value.push_str(own);
        }

        for next in &column[i + 1..] {
            if (next.y - fragment.y).abs() > SAME_LINE_TOLERANCE {
                break;
            }
            value.push_str(&next.text);
        }

        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

fn cleaned_name(caps: &Captures<'_>, text: &str) -> Option<String> {
    let name = group_1(caps, text)?;
    let name = name.trim();
    (name.chars().count() > 1).then(|| {
        let name = NAME_TAIL.replace(&name, "");
        STAMP_MARKER.replace(&name, "").into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fragment(text: &str, x: f64, y: f64) -> PositionedFragment {
        PositionedFragment::new(text, x, y)
    }

    #[test]
    fn test_columns_split_buyer_and_seller() {
        let layout = PageLayout::from_fragments(vec![
            fragment("名称：", 20.0, 650.0),
            fragment("北京某某有限公司", 60.0, 650.0),
            fragment("名称：", 320.0, 651.0),
            fragment("上海某某科技有限公司", 360.0, 651.0),
            fragment("x", 560.0, 100.0),
        ]);
        let parties = extract_parties(&layout);
        assert_eq!(parties.buyer, "北京某某有限公司");
        assert_eq!(parties.seller, "上海某某科技有限公司");
    }

    #[test]
    fn test_label_fragment_with_inline_value() {
        let layout = PageLayout::from_fragments(vec![
            fragment("名称：个人", 10.0, 500.0),
            fragment("名称：深圳某某有限公司", 400.0, 500.0),
            fragment("统一社会信用代码", 400.0, 480.0),
        ]);
        let parties = extract_parties(&layout);
        assert_eq!(parties.buyer, "个人");
        assert_eq!(parties.seller, "深圳某某有限公司");
    }

    #[test]
    fn test_value_stops_at_next_line() {
        let fragments = vec![
            fragment("名称：", 10.0, 500.0),
            fragment("甲公司", 50.0, 502.0),
            fragment("乙公司", 50.0, 490.0),
        ];
        let column: Vec<&PositionedFragment> = fragments.iter().collect();
        assert_eq!(value_in_column(&column, &NAME_LABEL), Some("甲公司".to_string()));
    }

    #[test]
    fn test_regex_fallback_over_text() {
        let layout = PageLayout::from_text(
            "购买方名称：杭州某某网络有限公司 统一社会信用代码 销售方名称：广州某某贸易有限公司（章）",
        );
        let parties = extract_parties(&layout);
        assert_eq!(parties.buyer, "杭州某某网络有限公司");
        assert_eq!(parties.seller, "广州某某贸易有限公司");
    }

    #[test]
    fn test_section_name_pattern() {
        let layout = PageLayout::from_text("购 买 方 信息 名 称：成都某某餐饮店 纳税人识别号");
        assert_eq!(extract_parties(&layout).buyer, "成都某某餐饮店");
    }

    #[test]
    fn test_block_parties() {
        let text = "销售方名称：南京某某有限公司 统一社会信用代码 购买方名称：苏州某某有限公司";
        let parties = extract_block_parties(text);
        assert_eq!(parties.seller, "南京某某有限公司");
        assert_eq!(parties.buyer, "苏州某某有限公司");
    }

    #[test]
    fn test_no_parties() {
        assert_eq!(extract_parties(&PageLayout::from_text("金额 100.00")), Parties::default());
    }
}
