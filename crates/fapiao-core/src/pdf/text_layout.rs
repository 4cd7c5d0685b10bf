//! Positioned fragments recovered from plain page text.
//!
//! `pdf-extract` yields text with cells separated by runs of spaces, so
//! columns survive as character offsets. Each cell becomes a fragment placed
//! on a fixed grid, which is enough for the column split in party extraction.

use crate::layout::{PageLayout, PositionedFragment};

/// Horizontal advance per character column.
const CHAR_WIDTH: f64 = 6.0;
/// Vertical advance per text line.
const LINE_HEIGHT: f64 = 12.0;
/// y of the first line (A4 height in points).
const PAGE_TOP: f64 = 842.0;

/// Build a layout from the text of one page.
pub fn layout_from_page_text(text: &str) -> PageLayout {
    let fragments = text
        .lines()
        .enumerate()
        .flat_map(|(line_no, line)| {
            let y = PAGE_TOP - line_no as f64 * LINE_HEIGHT;
            cells(line)
                .into_iter()
                .map(move |(col, cell)| PositionedFragment::new(cell, col as f64 * CHAR_WIDTH, y))
        })
        .collect();
    PageLayout::from_fragments(fragments)
}

/// Split a line on runs of two or more spaces, keeping each cell's char column.
fn cells(line: &str) -> Vec<(usize, String)> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut spaces = 0;

    for (col, ch) in line.chars().enumerate() {
        if ch == ' ' || ch == '\t' {
            spaces += 1;
            continue;
        }
        if spaces >= 2 || current.is_empty() {
            if !current.is_empty() {
                cells.push((start, std::mem::take(&mut current)));
            }
            start = col;
        } else if spaces == 1 {
            current.push(' ');
        }
        spaces = 0;
        current.push(ch);
    }
    if !current.is_empty() {
        cells.push((start, current));
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cells_split_on_wide_gaps() {
        assert_eq!(
            cells("  名称：甲公司      名称：乙公司 A"),
            vec![(2, "名称：甲公司".to_string()), (14, "名称：乙公司 A".to_string())]
        );
        assert!(cells("   ").is_empty());
    }

    #[test]
    fn test_layout_keeps_columns_and_line_order() {
        let layout = layout_from_page_text("购买方  销售方\n名称：甲公司      名称：乙公司");
        assert_eq!(layout.full_text, "购买方销售方名称：甲公司名称：乙公司");
        assert_eq!(layout.fragments.len(), 4);
        assert!(layout.fragments[3].x > layout.fragments[2].x);
        assert!(layout.fragments[0].y > layout.fragments[2].y);
    }

    #[test]
    fn test_blank_text_gives_blank_layout() {
        assert!(layout_from_page_text("\n \n").is_blank(1));
    }
}
