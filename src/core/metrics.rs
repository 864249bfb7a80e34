//! Text Measurement Capability
//!
//! Caret geometry (preferred columns, virtual-column padding, vertical
//! movement, column selection) needs to know how wide text is, but the
//! engine must not depend on any particular shaper or font stack. Hosts
//! inject a [`TextMetrics`] implementation; [`MonospaceMetrics`] is the
//! reference implementation used by tests and terminal hosts.
//!
//! Implementations must be synchronous and side-effect-free; buffer
//! mutation never calls them, only caret positioning does. Lines are passed
//! without their terminator.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

pub trait TextMetrics {
    /// Total advance width of a line
    fn line_width(&self, line: &str) -> f32;

    /// Advance width of the line prefix ending at `byte_offset`
    fn offset_to_x(&self, line: &str, byte_offset: usize) -> f32;

    /// Byte offset of the grapheme boundary nearest to `x`
    fn hit_test(&self, line: &str, x: f32) -> usize;

    /// Advance width of a single space, the unit of virtual-column padding
    fn space_width(&self) -> f32;
}

// =============================================================================
// MONOSPACE REFERENCE IMPLEMENTATION
// =============================================================================

/// Fixed-cell metrics: every column is `cell` wide, wide graphemes take two
/// columns, tabs expand to the next tab stop
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    pub cell: f32,
    pub tab_width: usize,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            cell: 1.0,
            tab_width: 4,
        }
    }
}

impl MonospaceMetrics {
    fn columns_up_to(&self, line: &str, byte_offset: usize) -> usize {
        let mut cols = 0usize;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte_offset {
                break;
            }
            cols = self.advance(cols, g);
        }
        cols
    }

    fn advance(&self, cols: usize, grapheme: &str) -> usize {
        if grapheme == "\t" {
            (cols / self.tab_width + 1) * self.tab_width
        } else {
            cols + grapheme_columns(grapheme)
        }
    }
}

fn grapheme_columns(g: &str) -> usize {
    g.chars().map(|c| c.width().unwrap_or(0)).sum()
}

impl TextMetrics for MonospaceMetrics {
    fn line_width(&self, line: &str) -> f32 {
        self.columns_up_to(line, line.len()) as f32 * self.cell
    }

    fn offset_to_x(&self, line: &str, byte_offset: usize) -> f32 {
        self.columns_up_to(line, byte_offset) as f32 * self.cell
    }

    fn hit_test(&self, line: &str, x: f32) -> usize {
        let mut acc = 0.0f32;
        for (idx, g) in line.grapheme_indices(true) {
            let before = acc;
            acc = self.advance((before / self.cell) as usize, g) as f32 * self.cell;
            let width = acc - before;
            if x < before + width / 2.0 {
                return idx;
            }
        }
        line.len()
    }

    fn space_width(&self) -> f32 {
        self.cell
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii() {
        let m = MonospaceMetrics::default();
        assert_eq!(m.line_width("hello"), 5.0);
        assert_eq!(m.offset_to_x("hello", 2), 2.0);
        assert_eq!(m.space_width(), 1.0);
    }

    #[test]
    fn tabs_expand_to_stops() {
        let m = MonospaceMetrics::default();
        assert_eq!(m.line_width("a\tb"), 5.0); // a | pad to 4 | b
        assert_eq!(m.offset_to_x("a\tb", 2), 4.0);
    }

    #[test]
    fn wide_graphemes_take_two_columns() {
        let m = MonospaceMetrics::default();
        assert_eq!(m.line_width("a漢b"), 4.0);
        assert_eq!(m.offset_to_x("a漢b", 1 + "漢".len()), 3.0);
    }

    #[test]
    fn hit_test_snaps_to_nearest_boundary() {
        let m = MonospaceMetrics::default();
        assert_eq!(m.hit_test("abc", 0.0), 0);
        assert_eq!(m.hit_test("abc", 0.4), 0);
        assert_eq!(m.hit_test("abc", 0.6), 1);
        assert_eq!(m.hit_test("abc", 2.6), 3);
        assert_eq!(m.hit_test("abc", 99.0), 3);
    }

    #[test]
    fn hit_test_returns_byte_offsets() {
        let m = MonospaceMetrics::default();
        let line = "é漢x";
        assert_eq!(m.hit_test(line, 0.9), "é".len());
        assert_eq!(m.hit_test(line, 2.0), "é".len() + "漢".len());
    }
}
