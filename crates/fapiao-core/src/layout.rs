//! Page layout: positioned text fragments in reading order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fragments whose y differs by at most this much share a line when sorting.
pub const LINE_TOLERANCE: f64 = 5.0;

/// One piece of text at a page coordinate (y grows upward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl PositionedFragment {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Text of one page in the three shapes the extractors consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    /// Fragments concatenated in reading order without separators.
    pub full_text: String,
    /// Fragments grouped into lines, for humans.
    pub linear_text: String,
    /// Fragments in reading order.
    pub fragments: Vec<PositionedFragment>,
}

impl PageLayout {
    /// Build a layout from fragments in arbitrary order.
    pub fn from_fragments(mut fragments: Vec<PositionedFragment>) -> Self {
        sort_reading_order(&mut fragments);
        let full_text = fragments.iter().map(|f| f.text.as_str()).collect();
        let linear_text = linearize(&fragments);
        Self {
            full_text,
            linear_text,
            fragments,
        }
    }

    /// Build a layout that only carries text (no positions).
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            full_text: text.clone(),
            linear_text: text,
            fragments: Vec::new(),
        }
    }

    /// Whether the page has (almost) no text layer.
    pub fn is_blank(&self, min_len: usize) -> bool {
        self.full_text.trim().chars().count() < min_len
    }
}

fn reading_order(a: &PositionedFragment, b: &PositionedFragment) -> Ordering {
    if (a.y - b.y).abs() > LINE_TOLERANCE {
        b.y.total_cmp(&a.y)
    } else {
        a.x.total_cmp(&b.x)
    }
}

// The tolerance band makes the comparator non-transitive, which the std sorts
// do not accept; a stable insertion sort gives a deterministic order instead.
fn sort_reading_order(fragments: &mut [PositionedFragment]) {
    for i in 1..fragments.len() {
        let mut j = i;
        while j > 0 && reading_order(&fragments[j - 1], &fragments[j]) == Ordering::Greater {
            fragments.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn linearize(fragments: &[PositionedFragment]) -> String {
    let mut lines: BTreeMap<i64, Vec<&PositionedFragment>> = BTreeMap::new();
    for fragment in fragments {
        let key = ((fragment.y / LINE_TOLERANCE).round() * LINE_TOLERANCE) as i64;
        lines.entry(key).or_default().push(fragment);
    }

    lines
        .into_values()
        .rev()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reading_order_top_to_bottom_left_to_right() {
        let layout = PageLayout::from_fragments(vec![
            PositionedFragment::new("C", 10.0, 100.0),
            PositionedFragment::new("B", 200.0, 702.0),
            PositionedFragment::new("A", 10.0, 700.0),
        ]);

        assert_eq!(layout.full_text, "ABC");
        assert_eq!(layout.linear_text, "A B\nC");
        assert_eq!(layout.fragments[0].text, "A");
    }

    #[test]
    fn test_full_text_and_fragments_share_order() {
        let layout = PageLayout::from_fragments(vec![
            PositionedFragment::new("名称：", 300.0, 650.0),
            PositionedFragment::new("发票号码：", 400.0, 760.0),
            PositionedFragment::new("12345678", 460.0, 761.0),
            PositionedFragment::new("名称：", 20.0, 651.0),
        ]);
        let joined: String = layout.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(layout.full_text, joined);
        assert!(layout.full_text.starts_with("发票号码：12345678"));
    }

    #[test]
    fn test_blank_detection() {
        assert!(PageLayout::from_text("  \n ").is_blank(10));
        assert!(PageLayout::from_text("abc").is_blank(10));
        assert!(!PageLayout::from_text("发票号码12345678901").is_blank(10));
    }

    #[test]
    fn test_from_fragments_is_deterministic() {
        let fragments = vec![
            PositionedFragment::new("x", 5.0, 10.0),
            PositionedFragment::new("y", 1.0, 14.0),
            PositionedFragment::new("z", 3.0, 18.0),
        ];
        let first = PageLayout::from_fragments(fragments.clone());
        let second = PageLayout::from_fragments(fragments);
        assert_eq!(first, second);
    }
}
