//! Caret Motion
//!
//! Movement never touches the buffer; it only rewrites the cursor set.
//! Horizontal steps move by deletion units (CRLF pairs and grapheme
//! clusters stay atomic), vertical steps resolve the remembered column
//! through the injected metrics, and column selection produces one cursor
//! per touched line, flagged virtual where the line is too short to reach
//! the column.

use crate::core::cursor::Cursor;
use crate::core::editor::Editor;
use crate::core::utf8;

impl Editor {
    pub(crate) fn unit_before(&self, pos: usize) -> usize {
        let from = pos.saturating_sub(utf8::UNIT_WINDOW);
        let window = self.table.get_range(from, pos - from).unwrap_or_default();
        utf8::prev_unit(&window)
    }

    pub(crate) fn unit_after(&self, pos: usize) -> usize {
        let end = (pos + utf8::UNIT_WINDOW).min(self.table.len());
        let window = self.table.get_range(pos, end - pos).unwrap_or_default();
        utf8::next_unit(&window)
    }

    /// Step every caret one unit left or right
    ///
    /// Without `extend`, a selection collapses to its edge instead of
    /// stepping.
    pub fn move_horizontal(&mut self, forward: bool, extend: bool) {
        for i in 0..self.cursors.len() {
            let c = *self.cursors.get(i);
            let head = if c.has_selection() && !extend {
                if forward { c.end() } else { c.start() }
            } else if forward {
                c.head + self.unit_after(c.head)
            } else {
                c.head - self.unit_before(c.head)
            };
            let c = self.cursors.get_mut(i);
            c.head = head;
            if !extend {
                c.anchor = head;
            }
            c.is_virtual = false;
        }
        self.cursors.merge();
        self.refresh_cursor_x();
    }

    /// Step every caret to the next or previous word edge
    pub fn move_word(&mut self, forward: bool, extend: bool) {
        let len = self.table.len();
        for i in 0..self.cursors.len() {
            let mut p = self.cursors.get(i).head;
            if forward {
                while p < len && !utf8::is_word_byte(self.table.byte_at(p)) {
                    p += 1;
                }
                while p < len && utf8::is_word_byte(self.table.byte_at(p)) {
                    p += 1;
                }
            } else {
                while p > 0 && !utf8::is_word_byte(self.table.byte_at(p - 1)) {
                    p -= 1;
                }
                while p > 0 && utf8::is_word_byte(self.table.byte_at(p - 1)) {
                    p -= 1;
                }
            }
            let c = self.cursors.get_mut(i);
            c.head = p;
            if !extend {
                c.anchor = p;
            }
            c.is_virtual = false;
        }
        self.cursors.merge();
        self.refresh_cursor_x();
    }

    /// Move every caret one line up or down, holding the remembered column
    ///
    /// The preferred column survives trips through short lines, so it is
    /// deliberately not refreshed here.
    pub fn move_vertical(&mut self, down: bool, extend: bool) {
        let last_line = self.lines.line_count() - 1;
        let len = self.table.len();
        for i in 0..self.cursors.len() {
            let c = *self.cursors.get(i);
            let li = self.lines.line_of(c.head);
            let head = if down {
                if li == last_line {
                    len
                } else {
                    self.pos_from_line_x(li + 1, c.desired_x)
                }
            } else if li == 0 {
                0
            } else {
                self.pos_from_line_x(li - 1, c.desired_x)
            };
            let c = self.cursors.get_mut(i);
            c.head = head;
            if !extend {
                c.anchor = head;
            }
            c.is_virtual = false;
        }
        self.cursors.merge();
    }

    /// Jump every caret to the start or end of its line content
    pub fn move_line_edge(&mut self, end: bool, extend: bool) {
        for i in 0..self.cursors.len() {
            let head = {
                let c = self.cursors.get(i);
                let li = self.lines.line_of(c.head);
                let (start, content_end) = self.line_content_range(li);
                if end { content_end } else { start }
            };
            let c = self.cursors.get_mut(i);
            c.head = head;
            if !extend {
                c.anchor = head;
            }
            c.is_virtual = false;
        }
        self.cursors.merge();
        self.refresh_cursor_x();
    }

    pub fn select_all(&mut self) {
        let len = self.table.len();
        self.select(0, len);
    }

    /// Word (or whitespace-run, or single-unit) boundaries around `pos`
    pub(crate) fn word_boundaries(&self, pos: usize) -> (usize, usize) {
        let len = self.table.len();
        if len == 0 {
            return (0, 0);
        }
        let pos = pos.min(len - 1);
        let b = self.table.byte_at(pos);
        if utf8::is_word_byte(b) {
            let mut s = pos;
            let mut e = pos + 1;
            while s > 0 && utf8::is_word_byte(self.table.byte_at(s - 1)) {
                s -= 1;
            }
            while e < len && utf8::is_word_byte(self.table.byte_at(e)) {
                e += 1;
            }
            (s, e)
        } else if b == b' ' || b == b'\t' {
            let mut s = pos;
            let mut e = pos + 1;
            while s > 0 {
                let p = self.table.byte_at(s - 1);
                if p == b' ' || p == b'\t' { s -= 1 } else { break }
            }
            while e < len {
                let p = self.table.byte_at(e);
                if p == b' ' || p == b'\t' { e += 1 } else { break }
            }
            (s, e)
        } else {
            let step = self.unit_after(pos);
            (pos, pos + step.max(1))
        }
    }

    pub fn select_word_at(&mut self, pos: usize) {
        let (s, e) = self.word_boundaries(pos);
        self.select(s, e);
    }

    /// Select the whole line under `pos`, terminator included
    pub fn select_line_at(&mut self, pos: usize) {
        let li = self.lines.line_of(pos.min(self.table.len()));
        let (s, e) = self.lines.line_range(li);
        self.select(s, e);
    }

    // =========================================================================
    // COLUMN SELECTION
    // =========================================================================

    /// Rebuild the cursor set as a column selection between two corners
    ///
    /// One cursor per touched line; lines too short to reach the head
    /// column get a virtual caret clamped to their physical end. The cursor
    /// on the head's line ends up primary.
    pub fn column_select(&mut self, anchor: usize, head: usize) {
        let len = self.table.len();
        let anchor = anchor.min(len);
        let head = head.min(len);
        let la = self.lines.line_of(anchor);
        let lh = self.lines.line_of(head);
        let xa = self.x_at(anchor);
        let xh = self.x_at(head);
        let space_w = self.metrics.space_width();

        let lines: Vec<usize> = if lh >= la {
            (la..=lh).collect()
        } else {
            (lh..=la).rev().collect()
        };
        let mut cursors = Vec::with_capacity(lines.len());
        for li in lines {
            let a = self.pos_from_line_x(li, xa);
            let h = self.pos_from_line_x(li, xh);
            let mut c = Cursor::selecting(a, h);
            c.desired_x = xh;
            c.anchor_x = xa;
            c.is_virtual = xh - self.x_at(h) > space_w * 0.5;
            cursors.push(c);
        }
        self.cursors.restore(cursors);
    }

    /// Cancel any column selection without touching the buffer
    pub fn clear_virtual_columns(&mut self) {
        self.cursors.clear_virtual();
    }
}

// =============================================================================
// TESTS
// =============================================================================
