//! Line-Granular Operations
//!
//! Operations that act on whole lines project the cursor set onto a set of
//! line indices first: every line a selection touches, except that a
//! selection ending exactly at a line start does not claim that line.
//! Contiguous runs of projected lines move and copy as one block, and the
//! terminator-less last line gets its separator edits recorded in the same
//! batch so the document stays well-formed through undo.

use crate::core::cursor::Cursor;
use crate::core::editor::Editor;

impl Editor {
    /// Line indices covered by the current selections, sorted and deduped
    pub(crate) fn projected_lines(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for c in self.cursors.iter() {
            let first = self.lines.line_of(c.start());
            let mut last = self.lines.line_of(c.end());
            // A selection ending at a line start leaves that line out.
            if last > first && c.has_selection() && self.lines.start(last) == c.end() {
                last -= 1;
            }
            out.extend(first..=last);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Indent the projected lines by one indent unit
    ///
    /// With nothing selected this degrades to typing the unit at each caret.
    pub fn indent_lines(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        if self.cursors.iter().all(|c| !c.has_selection()) {
            let unit = self.indent_unit.clone();
            self.insert_at_cursors(&unit);
            return;
        }
        let unit = self.indent_unit.as_bytes().to_vec();
        let targets = self.projected_lines();
        let mut batch = self.begin_batch();
        for li in targets.iter().rev() {
            let start = self.lines.start(*li);
            self.apply_insert(start, &unit, &mut batch);
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.commit(batch);
    }

    /// Remove one leading indent unit from each projected line
    ///
    /// A line that does not start with the full unit still sheds a single
    /// leading tab or space, so mixed indentation keeps shrinking.
    pub fn unindent_lines(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        let unit = self.indent_unit.as_bytes().to_vec();
        let targets = self.projected_lines();
        let mut batch = self.begin_batch();
        for li in targets.iter().rev() {
            let (start, end) = self.line_content_range(*li);
            if start >= end {
                continue;
            }
            let head = self
                .table
                .get_range(start, unit.len().min(end - start))
                .unwrap_or_default();
            let take = if head == unit {
                unit.len()
            } else if matches!(head.first(), Some(&b'\t') | Some(&b' ')) {
                1
            } else {
                0
            };
            if take > 0 {
                self.apply_erase(start, take, &mut batch);
            }
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Delete every projected line, terminator included
    pub fn delete_lines(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        let targets = self.projected_lines();
        let mut batch = self.begin_batch();
        for li in targets.iter().rev() {
            let li = *li;
            if li >= self.lines.line_count() {
                continue;
            }
            let (start, end) = self.lines.line_range(li);
            let mut from = start;
            if li + 1 == self.lines.line_count() && from > 0 {
                // Last line carries no terminator; take the preceding one
                // so the previous line does not inherit a dangling break.
                from -= 1;
                if from > 0
                    && self.table.byte_at(from) == b'\n'
                    && self.table.byte_at(from - 1) == b'\r'
                {
                    from -= 1;
                }
            }
            self.apply_erase(from, end - from, &mut batch);
            self.rebuild_lines();
        }
        for c in self.cursors.iter_mut() {
            c.anchor = c.head;
            c.is_virtual = false;
        }
        self.cursors.merge();
        self.refresh_cursor_x();
        self.commit(batch);
    }

    /// Move each contiguous projected group one line up or down
    ///
    /// Cursors travel with their lines. A group touching the document edge
    /// pins the whole operation, matching how the selection would otherwise
    /// tear apart.
    pub fn move_lines(&mut self, up: bool) {
        if self.cursors.is_empty() {
            return;
        }
        let targets = self.projected_lines();
        if targets.is_empty() {
            return;
        }
        let line_count = self.lines.line_count();
        if up && targets[0] == 0 {
            return;
        }
        if !up && targets[targets.len() - 1] + 1 >= line_count {
            return;
        }

        // Cursor positions as (line, offset-in-line); remapped at the end.
        let places: Vec<((usize, usize), (usize, usize))> = self
            .cursors
            .iter()
            .map(|c| (self.line_place(c.head), self.line_place(c.anchor)))
            .collect();
        let mut delta = vec![0isize; line_count];

        let mut batch = self.begin_batch();
        for group in contiguous_groups(&targets) {
            let (first, last) = (group[0], group[group.len() - 1]);
            let gs = self.lines.line_range(first).0;
            let ge = self.lines.line_range(last).1;
            if up {
                let prev = first - 1;
                let (pa, pb) = self.lines.line_range(prev);
                let neighbor = self.table.get_range(pa, pb - pa).unwrap_or_default();
                let group_len = ge - gs;
                self.raw_erase(pa, neighbor.len(), &mut batch);
                let bytes = if ends_with_break(&self.table_bytes_at(pa, group_len)) {
                    neighbor
                } else {
                    rotate_break_to_front(&neighbor)
                };
                self.raw_insert(pa + group_len, &bytes, &mut batch);
                delta[prev] = group.len() as isize;
                for li in &group {
                    delta[*li] = -1;
                }
            } else {
                let next = last + 1;
                let (nb_s, nb_e) = self.lines.line_range(next);
                let group_bytes = self.table.get_range(gs, ge - gs).unwrap_or_default();
                let neighbor_len = nb_e - nb_s;
                self.raw_erase(gs, group_bytes.len(), &mut batch);
                let bytes = if ends_with_break(&self.table_bytes_at(gs, neighbor_len)) {
                    group_bytes
                } else {
                    rotate_break_to_front(&group_bytes)
                };
                self.raw_insert(gs + neighbor_len, &bytes, &mut batch);
                delta[next] = -(group.len() as isize);
                for li in &group {
                    delta[*li] = 1;
                }
            }
        }

        self.rebuild_lines();
        let remapped: Vec<(usize, usize)> = places
            .iter()
            .map(|(h, a)| (self.place_to_pos(*h, &delta), self.place_to_pos(*a, &delta)))
            .collect();
        for (c, (h, a)) in self.cursors.iter_mut().zip(remapped) {
            c.head = h;
            c.anchor = a;
        }
        self.refresh_cursor_x();
        self.commit(batch);
    }

    /// Duplicate each contiguous projected group
    ///
    /// `up` keeps the cursors on the upper copy, otherwise they follow the
    /// lower one.
    pub fn copy_lines(&mut self, up: bool) {
        if self.cursors.is_empty() {
            return;
        }
        let targets = self.projected_lines();
        if targets.is_empty() {
            return;
        }
        let mut batch = self.begin_batch();
        for group in contiguous_groups(&targets).into_iter().rev() {
            let (first, last) = (group[0], group[group.len() - 1]);
            let gs = self.lines.line_range(first).0;
            let ge = self.lines.line_range(last).1;
            let mut dup = self.table.get_range(gs, ge - gs).unwrap_or_default();
            if !ends_with_break(&dup) {
                dup.extend_from_slice(self.newline.as_str().as_bytes());
            }
            self.raw_insert(gs, &dup, &mut batch);
            if up {
                // Only positions past the original group slide down.
                let len = dup.len();
                for c in self.cursors.iter_mut() {
                    if c.head >= ge {
                        c.head += len;
                    }
                    if c.anchor >= ge {
                        c.anchor += len;
                    }
                }
            } else {
                self.cursors.shift_for_insert(gs, dup.len());
            }
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Insert a multi-line block column-aligned under the primary cursor
    ///
    /// Each block line lands on consecutive document lines at the primary
    /// cursor's column; short lines are padded with spaces and missing lines
    /// are created, all inside one batch so a single undo removes the lot.
    pub fn insert_rectangular_block(&mut self, text: &str) {
        if text.is_empty() || self.cursors.is_empty() {
            return;
        }
        let block: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        let primary = *self.cursors.primary();
        let base_line = self.lines.line_of(primary.head);
        let base_x = if primary.is_virtual {
            primary.desired_x
        } else {
            self.x_at(primary.head)
        };
        let space_w = self.metrics.space_width();
        let mut batch = self.begin_batch();

        // Grow the document so every block line has a target line.
        let missing = (base_line + block.len()).saturating_sub(self.lines.line_count());
        if missing > 0 {
            let tail = self.newline.as_str().repeat(missing);
            self.raw_insert(self.table.len(), tail.as_bytes(), &mut batch);
            self.rebuild_lines();
        }

        // Bottom-up, so upper-line offsets stay valid while editing.
        let mut carets: Vec<(usize, usize)> = Vec::with_capacity(block.len());
        for (i, piece) in block.iter().enumerate().rev() {
            let li = base_line + i;
            let (ls, le) = self.line_content_range(li);
            let line = self.line_text(li);
            let width = self.metrics.line_width(&line);
            if width + space_w * 0.5 < base_x {
                let pad = ((base_x - width) / space_w + 0.5) as usize;
                let mut bytes = vec![b' '; pad];
                bytes.extend_from_slice(piece.as_bytes());
                self.raw_insert(le, &bytes, &mut batch);
                carets.push((li, le - ls + bytes.len()));
            } else {
                let at = self.pos_from_line_x(li, base_x);
                self.raw_insert(at, piece.as_bytes(), &mut batch);
                carets.push((li, at - ls + piece.len()));
            }
        }

        self.rebuild_lines();
        // Top-to-bottom, so the bottom caret ends up primary.
        let cursors: Vec<Cursor> = carets
            .into_iter()
            .rev()
            .map(|(li, off)| Cursor::at(self.lines.start(li) + off))
            .collect();
        self.cursors.restore(cursors);
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    fn line_place(&self, pos: usize) -> (usize, usize) {
        let li = self.lines.line_of(pos);
        (li, pos - self.lines.start(li))
    }

    fn place_to_pos(&self, place: (usize, usize), delta: &[isize]) -> usize {
        let (li, off) = place;
        let shifted = if li < delta.len() {
            (li as isize + delta[li]).max(0) as usize
        } else {
            li
        };
        let (start, end) = self.lines.line_range(shifted.min(self.lines.line_count() - 1));
        (start + off).min(end)
    }

    fn table_bytes_at(&self, pos: usize, count: usize) -> Vec<u8> {
        self.table.get_range(pos, count).unwrap_or_default()
    }
}

/// Split sorted line indices into runs of consecutive lines
fn contiguous_groups(sorted: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &li in sorted {
        match groups.last_mut() {
            Some(g) if g[g.len() - 1] + 1 == li => g.push(li),
            _ => groups.push(vec![li]),
        }
    }
    groups
}

fn ends_with_break(bytes: &[u8]) -> bool {
    matches!(bytes.last(), Some(b'\n') | Some(b'\r'))
}

/// Move a trailing line break to the front, keeping its exact bytes
fn rotate_break_to_front(bytes: &[u8]) -> Vec<u8> {
    let term = if bytes.ends_with(b"\r\n") {
        2
    } else if ends_with_break(bytes) {
        1
    } else {
        0
    };
    let (content, brk) = bytes.split_at(bytes.len() - term);
    let mut out = brk.to_vec();
    out.extend_from_slice(content);
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn editor_with(text: &str) -> Editor {
        let mut ed = Editor::new();
        ed.load_original(Arc::new(text.as_bytes().to_vec()));
        ed
    }

    #[test]
    fn projection_excludes_line_start_end() {
        let mut ed = editor_with("aa\nbb\ncc\n");
        ed.select(0, 3); // ends exactly at start of line 1
        assert_eq!(ed.projected_lines(), vec![0]);
        ed.select(0, 4);
        assert_eq!(ed.projected_lines(), vec![0, 1]);
    }

    #[test]
    fn groups_split_on_gaps() {
        assert_eq!(
            contiguous_groups(&[0, 1, 3, 5, 6]),
            vec![vec![0, 1], vec![3], vec![5, 6]]
        );
    }

    #[test]
    fn indent_without_selection_types_unit() {
        let mut ed = editor_with("ab");
        ed.set_cursor(1);
        ed.indent_lines();
        assert_eq!(ed.to_text(), "a\tb");
    }

    #[test]
    fn indent_selected_lines() {
        let mut ed = editor_with("aa\nbb\ncc");
        ed.select(1, 5);
        ed.indent_lines();
        assert_eq!(ed.to_text(), "\taa\n\tbb\ncc");
        ed.undo();
        assert_eq!(ed.to_text(), "aa\nbb\ncc");
    }

    #[test]
    fn unindent_takes_one_tab_or_space() {
        let mut ed = editor_with("\taa\n  bb\ncc");
        ed.select(0, ed.len());
        ed.unindent_lines();
        assert_eq!(ed.to_text(), "aa\n bb\ncc");
    }

    #[test]
    fn unindent_removes_full_multichar_unit() {
        let mut ed = editor_with("aa\nbb\n");
        ed.set_indent_unit("    ");
        ed.select(0, ed.len());
        ed.indent_lines();
        ed.indent_lines();
        assert_eq!(ed.to_text(), "        aa\n        bb\n");
        ed.unindent_lines();
        ed.unindent_lines();
        assert_eq!(ed.to_text(), "aa\nbb\n");
    }

    #[test]
    fn unindent_multichar_unit_falls_back_to_one_byte() {
        let mut ed = editor_with("\taa\n bb");
        ed.set_indent_unit("    ");
        ed.select(0, ed.len());
        ed.unindent_lines();
        assert_eq!(ed.to_text(), "aa\nbb");
    }

    #[test]
    fn delete_middle_line() {
        let mut ed = editor_with("aa\nbb\ncc");
        ed.set_cursor(4);
        ed.delete_lines();
        assert_eq!(ed.to_text(), "aa\ncc");
        ed.undo();
        assert_eq!(ed.to_text(), "aa\nbb\ncc");
    }

    #[test]
    fn delete_last_line_takes_preceding_break() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(4);
        ed.delete_lines();
        assert_eq!(ed.to_text(), "aa");
    }

    #[test]
    fn delete_empty_last_line() {
        let mut ed = editor_with("aa\n");
        ed.set_cursor(3);
        ed.delete_lines();
        assert_eq!(ed.to_text(), "aa");
    }

    #[test]
    fn move_line_down_and_back() {
        let mut ed = editor_with("aa\nbb\ncc\n");
        ed.set_cursor(0);
        ed.move_lines(false);
        assert_eq!(ed.to_text(), "bb\naa\ncc\n");
        assert_eq!(ed.cursors().primary().head, 3);
        ed.move_lines(true);
        assert_eq!(ed.to_text(), "aa\nbb\ncc\n");
        assert_eq!(ed.cursors().primary().head, 0);
    }

    #[test]
    fn move_last_line_up_keeps_terminators() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(3);
        ed.move_lines(true);
        assert_eq!(ed.to_text(), "bb\naa");
        assert_eq!(ed.cursors().primary().head, 0);
        ed.undo();
        assert_eq!(ed.to_text(), "aa\nbb");
    }

    #[test]
    fn move_down_into_terminatorless_last_line() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(0);
        ed.move_lines(false);
        assert_eq!(ed.to_text(), "bb\naa");
    }

    #[test]
    fn move_at_edge_is_noop() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(0);
        ed.move_lines(true);
        assert_eq!(ed.to_text(), "aa\nbb");
        assert!(!ed.can_undo());
    }

    #[test]
    fn move_group_moves_together() {
        let mut ed = editor_with("aa\nbb\ncc\ndd\n");
        ed.select(0, 4); // lines 0..=1
        ed.move_lines(false);
        assert_eq!(ed.to_text(), "cc\naa\nbb\ndd\n");
        let c = ed.cursors().primary();
        assert_eq!((c.start(), c.end()), (3, 7));
    }

    #[test]
    fn copy_line_down_follows_copy() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(1);
        ed.copy_lines(false);
        assert_eq!(ed.to_text(), "aa\naa\nbb");
        assert_eq!(ed.cursors().primary().head, 4);
        ed.undo();
        assert_eq!(ed.to_text(), "aa\nbb");
    }

    #[test]
    fn copy_line_up_stays_on_upper() {
        let mut ed = editor_with("aa\nbb");
        ed.set_cursor(1);
        ed.copy_lines(true);
        assert_eq!(ed.to_text(), "aa\naa\nbb");
        assert_eq!(ed.cursors().primary().head, 1);
    }

    #[test]
    fn copy_terminatorless_last_line_gains_break() {
        let mut ed = editor_with("aa");
        ed.set_cursor(0);
        ed.copy_lines(false);
        assert_eq!(ed.to_text(), "aa\naa");
    }

    #[test]
    fn rectangular_insert_pads_short_lines() {
        let mut ed = editor_with("long line here\nab\n");
        ed.set_cursor(10);
        ed.insert_rectangular_block("XX\nYY");
        assert_eq!(ed.to_text(), "long line XXhere\nab        YY\n");
        // Single undo removes text and padding together.
        ed.undo();
        assert_eq!(ed.to_text(), "long line here\nab\n");
    }

    #[test]
    fn rectangular_insert_extends_document() {
        let mut ed = editor_with("ab");
        ed.set_cursor(2);
        ed.insert_rectangular_block("1\n2");
        assert_eq!(ed.to_text(), "ab1\n  2");
        ed.undo();
        assert_eq!(ed.to_text(), "ab");
    }

    #[test]
    fn rectangular_insert_places_caret_per_line() {
        let mut ed = editor_with("aa\nbb\n");
        ed.set_cursor(0);
        ed.insert_rectangular_block("x\ny");
        assert_eq!(ed.to_text(), "xaa\nybb\n");
        let heads: Vec<usize> = ed.cursors().iter().map(|c| c.head).collect();
        assert_eq!(heads, vec![1, 5]);
    }
}
