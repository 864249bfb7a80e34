//! Editing Engine
//!
//! `Editor` owns one document: the piece table, the line index, the cursor
//! set, the undo log, and the search state. Every user-visible action runs
//! the same shape: snapshot cursors, apply primitive ops back-to-front with
//! uniform positional shifting, snapshot cursors again, push the batch, and
//! rebuild the line index. The piece table and the cursor set are only ever
//! updated together, so they cannot drift apart.

use tracing::debug;

use crate::core::cursor::{Cursor, CursorSet};
use crate::core::error::Result;
use crate::core::event::{EditorEvent, EventSink, NullSink};
use crate::core::line_index::LineIndex;
use crate::core::metrics::{MonospaceMetrics, TextMetrics};
use crate::core::piece_table::{Chunk, OriginSource, PieceTable};
use crate::core::search::SearchState;
use crate::core::undo::{EditBatch, EditOp, UndoLog};
use crate::core::utf8;

/// How far into the document newline sniffing looks
const NEWLINE_SNIFF_LIMIT: usize = 4096;

// =============================================================================
// NEWLINE STYLE
// =============================================================================

/// The document's line terminator convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl Newline {
    /// Sniff the style from the first terminator in `bytes`
    pub fn detect(bytes: &[u8]) -> Self {
        let window = &bytes[..bytes.len().min(NEWLINE_SNIFF_LIMIT)];
        for (i, b) in window.iter().enumerate() {
            match b {
                b'\n' => return Newline::Lf,
                b'\r' => {
                    if window.get(i + 1) == Some(&b'\n') {
                        return Newline::CrLf;
                    }
                    return Newline::Cr;
                }
                _ => {}
            }
        }
        Newline::Lf
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
            Newline::Cr => "\r",
        }
    }
}

// =============================================================================
// EDITOR
// =============================================================================

pub struct Editor {
    pub(crate) table: PieceTable,
    pub(crate) lines: LineIndex,
    pub(crate) cursors: CursorSet,
    pub(crate) undo: UndoLog,
    pub(crate) search: SearchState,
    pub(crate) newline: Newline,
    pub(crate) indent_unit: String,
    pub(crate) dirty: bool,
    pub(crate) metrics: Box<dyn TextMetrics>,
    pub(crate) sink: Box<dyn EventSink>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// An empty document with monospace metrics and no event sink
    pub fn new() -> Self {
        Self::with_metrics(Box::new(MonospaceMetrics::default()))
    }

    pub fn with_metrics(metrics: Box<dyn TextMetrics>) -> Self {
        Self {
            table: PieceTable::empty(),
            lines: LineIndex::new(),
            cursors: CursorSet::single(0),
            undo: UndoLog::new(),
            search: SearchState::default(),
            newline: Newline::Lf,
            indent_unit: "\t".to_string(),
            dirty: false,
            metrics,
            sink: Box::new(NullSink),
        }
    }

    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = sink;
    }

    pub fn set_indent_unit(&mut self, unit: &str) {
        if !unit.is_empty() {
            self.indent_unit = unit.to_string();
        }
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    pub fn newline(&self) -> Newline {
        self.newline
    }

    pub fn set_newline(&mut self, newline: Newline) {
        self.newline = newline;
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Open a document over a caller-owned read-only region
    ///
    /// The region is never copied; edits accumulate in the edit log and the
    /// pieces reference both.
    pub fn load_original(&mut self, origin: OriginSource) {
        self.newline = Newline::detect((*origin).as_ref());
        self.table = PieceTable::from_origin(origin);
        self.after_document_swap();
    }

    /// Start a fresh empty document
    pub fn load_empty(&mut self) {
        self.newline = Newline::Lf;
        self.table = PieceTable::empty();
        self.after_document_swap();
    }

    fn after_document_swap(&mut self) {
        self.lines.rebuild(&self.table);
        self.cursors = CursorSet::single(0);
        self.undo.clear();
        self.dirty = false;
        debug!(len = self.table.len(), newline = ?self.newline, "document loaded");
        self.sink.notify(EditorEvent::DocumentReplaced);
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &PieceTable {
        &self.table
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn cursors(&self) -> &CursorSet {
        &self.cursors
    }

    pub fn get_range(&self, pos: usize, count: usize) -> Result<Vec<u8>> {
        self.table.get_range(pos, count)
    }

    /// Region-tagged content slices for streaming serialization
    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'_>> {
        self.table.chunks()
    }

    /// The whole document, lossily decoded; meant for small documents
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.all_bytes()).into_owned()
    }

    pub(crate) fn all_bytes(&self) -> Vec<u8> {
        self.table
            .get_range(0, self.table.len())
            .unwrap_or_default()
    }

    pub fn is_modified(&self) -> bool {
        self.dirty
    }

    /// Mark the current state as the on-disk state
    pub fn mark_saved(&mut self) {
        self.undo.mark_saved();
        self.refresh_dirty();
    }

    // =========================================================================
    // CURSOR PLACEMENT
    // =========================================================================

    pub fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.table.len());
        let x = self.x_at(pos);
        let mut c = Cursor::at(pos);
        c.desired_x = x;
        c.anchor_x = x;
        self.cursors.set_single(c);
    }

    pub fn select(&mut self, anchor: usize, head: usize) {
        let len = self.table.len();
        let mut c = Cursor::selecting(anchor.min(len), head.min(len));
        c.desired_x = self.x_at(c.head);
        c.anchor_x = self.x_at(c.anchor);
        self.cursors.set_single(c);
    }

    /// Add a cursor, folding it into an existing one if they touch
    pub fn add_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.table.len());
        let x = self.x_at(pos);
        let mut c = Cursor::at(pos);
        c.desired_x = x;
        c.anchor_x = x;
        self.cursors.push(c);
        self.cursors.merge();
    }

    // =========================================================================
    // LINE GEOMETRY
    // =========================================================================

    /// Byte range of line `li` with the terminator stripped
    pub(crate) fn line_content_range(&self, li: usize) -> (usize, usize) {
        let (start, mut end) = self.lines.line_range(li);
        if end > start && self.table.byte_at(end - 1) == b'\n' {
            end -= 1;
        }
        if end > start && self.table.byte_at(end - 1) == b'\r' {
            end -= 1;
        }
        (start, end)
    }

    /// Line `li` without its terminator, lossily decoded for measurement
    pub(crate) fn line_text(&self, li: usize) -> String {
        let (start, end) = self.line_content_range(li);
        let bytes = self.table.get_range(start, end - start).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Horizontal position of `pos` on its line
    pub(crate) fn x_at(&self, pos: usize) -> f32 {
        let li = self.lines.line_of(pos);
        let (start, _) = self.line_content_range(li);
        let line = self.line_text(li);
        let offset = pos.saturating_sub(start).min(line.len());
        self.metrics.offset_to_x(&line, offset)
    }

    /// Byte position on line `li` nearest to horizontal position `x`
    pub(crate) fn pos_from_line_x(&self, li: usize, x: f32) -> usize {
        let (start, _) = self.line_content_range(li);
        let line = self.line_text(li);
        start + self.metrics.hit_test(&line, x)
    }

    /// Recompute preferred columns from current positions
    ///
    /// Virtual carets keep their column; that is the whole point of the flag.
    pub(crate) fn refresh_cursor_x(&mut self) {
        let xs: Vec<Option<(f32, f32)>> = self
            .cursors
            .iter()
            .map(|c| {
                if c.is_virtual {
                    None
                } else {
                    Some((self.x_at(c.head), self.x_at(c.anchor)))
                }
            })
            .collect();
        for (c, x) in self.cursors.iter_mut().zip(xs) {
            if let Some((hx, ax)) = x {
                c.desired_x = hx;
                c.anchor_x = ax;
            }
        }
    }

    // =========================================================================
    // PRIMITIVE APPLY
    // =========================================================================

    pub(crate) fn begin_batch(&self) -> EditBatch {
        EditBatch::starting_from(self.cursors.snapshot())
    }

    /// Insert and shift every cursor by the uniform rule
    pub(crate) fn apply_insert(&mut self, pos: usize, bytes: &[u8], batch: &mut EditBatch) {
        if bytes.is_empty() {
            return;
        }
        let pos = pos.min(self.table.len());
        self.table.insert(pos, bytes);
        self.cursors.shift_for_insert(pos, bytes.len());
        batch.ops.push(EditOp::Insert {
            pos,
            bytes: bytes.to_vec(),
        });
    }

    /// Erase and shift every cursor by the uniform rule; returns the number
    /// of bytes actually erased after clamping
    pub(crate) fn apply_erase(&mut self, pos: usize, count: usize, batch: &mut EditBatch) -> usize {
        if count == 0 || pos >= self.table.len() {
            return 0;
        }
        let count = count.min(self.table.len() - pos);
        let bytes = self.table.get_range(pos, count).unwrap_or_default();
        self.table.erase(pos, count);
        self.cursors.shift_for_erase(pos, count);
        batch.ops.push(EditOp::Erase { pos, bytes });
        count
    }

    /// Insert without cursor shifting; callers remap cursors themselves
    pub(crate) fn raw_insert(&mut self, pos: usize, bytes: &[u8], batch: &mut EditBatch) {
        if bytes.is_empty() {
            return;
        }
        let pos = pos.min(self.table.len());
        self.table.insert(pos, bytes);
        batch.ops.push(EditOp::Insert {
            pos,
            bytes: bytes.to_vec(),
        });
    }

    /// Erase without cursor shifting; callers remap cursors themselves
    pub(crate) fn raw_erase(&mut self, pos: usize, count: usize, batch: &mut EditBatch) -> usize {
        if count == 0 || pos >= self.table.len() {
            return 0;
        }
        let count = count.min(self.table.len() - pos);
        let bytes = self.table.get_range(pos, count).unwrap_or_default();
        self.table.erase(pos, count);
        batch.ops.push(EditOp::Erase { pos, bytes });
        count
    }

    pub(crate) fn rebuild_lines(&mut self) {
        self.lines.rebuild(&self.table);
    }

    /// Seal a batch: snapshot cursors, push to history, refresh derived state
    ///
    /// An empty batch (no net effect) is dropped without touching history.
    pub(crate) fn commit(&mut self, mut batch: EditBatch) {
        if batch.is_empty() {
            return;
        }
        batch.after = self.cursors.snapshot();
        debug!(ops = batch.ops.len(), "commit");
        self.undo.push(batch);
        self.finish_content_change();
    }

    pub(crate) fn finish_content_change(&mut self) {
        self.lines.rebuild(&self.table);
        self.refresh_dirty();
    }

    fn refresh_dirty(&mut self) {
        let now = self.undo.is_modified();
        if now != self.dirty {
            self.dirty = now;
            self.sink.notify(EditorEvent::DirtyChanged(now));
        }
    }

    // =========================================================================
    // MULTI-CURSOR EDITS
    // =========================================================================

    pub fn insert_at_cursors(&mut self, text: &str) {
        self.insert_bytes_at_cursors(text.as_bytes());
    }

    /// Insert at every cursor, back-to-front
    ///
    /// A selection is replaced; a virtual caret first materializes its
    /// column as spaces, recorded in the same batch so one undo removes
    /// padding and text together.
    pub fn insert_bytes_at_cursors(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || self.cursors.is_empty() {
            return;
        }
        let mut batch = self.begin_batch();
        for idx in self.cursors.indices_by_start_desc() {
            let (start, sel_len) = {
                let c = self.cursors.get(idx);
                (c.start(), c.len())
            };
            if sel_len > 0 {
                self.apply_erase(start, sel_len, &mut batch);
                let c = self.cursors.get_mut(idx);
                c.head = start;
                c.anchor = start;
            }
            let snapshot = *self.cursors.get(idx);
            if snapshot.is_virtual {
                self.rebuild_lines();
                self.pad_virtual_column(idx, &mut batch);
            }
            let target = self.cursors.get(idx).head;
            self.apply_insert(target, bytes, &mut batch);
            let c = self.cursors.get_mut(idx);
            c.anchor = c.head;
            c.is_virtual = false;
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Materialize a virtual caret's column as trailing spaces
    fn pad_virtual_column(&mut self, idx: usize, batch: &mut EditBatch) {
        let c = *self.cursors.get(idx);
        let li = self.lines.line_of(c.head);
        let (_, line_end) = self.line_content_range(li);
        let line = self.line_text(li);
        let end_x = self.metrics.line_width(&line);
        let space_w = self.metrics.space_width();
        if c.desired_x <= end_x + space_w * 0.5 {
            return;
        }
        let needed = ((c.desired_x - end_x) / space_w + 0.5) as usize;
        if needed == 0 {
            return;
        }
        let pad = vec![b' '; needed];
        self.apply_insert(line_end, &pad, batch);
        // The caret sat at the physical line end, so the uniform shift has
        // already moved it past the padding.
    }

    /// Delete one unit (or the selection) before every cursor
    pub fn backspace_at_cursors(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        let mut batch = self.begin_batch();
        let space_w = self.metrics.space_width();
        for idx in self.cursors.indices_by_start_desc() {
            let c = *self.cursors.get(idx);
            if c.has_selection() {
                let start = c.start();
                self.apply_erase(start, c.len(), &mut batch);
                let c = self.cursors.get_mut(idx);
                c.head = start;
                c.anchor = start;
                c.is_virtual = false;
            } else if c.is_virtual {
                // A virtual caret retreats one column without touching bytes.
                let c = self.cursors.get_mut(idx);
                c.desired_x = (c.desired_x - space_w).max(0.0);
            } else if c.head > 0 {
                let from = c.head.saturating_sub(utf8::UNIT_WINDOW);
                let window = self.table.get_range(from, c.head - from).unwrap_or_default();
                let step = utf8::prev_unit(&window);
                if step > 0 {
                    self.apply_erase(c.head - step, step, &mut batch);
                }
            }
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Delete one unit (or the selection) after every cursor
    pub fn delete_forward_at_cursors(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        let mut batch = self.begin_batch();
        for idx in self.cursors.indices_by_start_desc() {
            let c = *self.cursors.get(idx);
            if c.has_selection() {
                let start = c.start();
                self.apply_erase(start, c.len(), &mut batch);
                let c = self.cursors.get_mut(idx);
                c.head = start;
                c.anchor = start;
                c.is_virtual = false;
            } else if c.head < self.table.len() {
                let end = (c.head + utf8::UNIT_WINDOW).min(self.table.len());
                let window = self.table.get_range(c.head, end - c.head).unwrap_or_default();
                let step = utf8::next_unit(&window);
                if step > 0 {
                    self.apply_erase(c.head, step, &mut batch);
                }
            }
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Insert a newline at every cursor, copying the current line's leading
    /// whitespace up to the caret
    pub fn insert_newline_auto_indent(&mut self) {
        if self.cursors.is_empty() {
            return;
        }
        let nl = self.newline.as_str().as_bytes().to_vec();
        let mut batch = self.begin_batch();
        for idx in self.cursors.indices_by_start_desc() {
            let (start, sel_len) = {
                let c = self.cursors.get(idx);
                (c.start(), c.len())
            };
            if sel_len > 0 {
                self.apply_erase(start, sel_len, &mut batch);
                let c = self.cursors.get_mut(idx);
                c.head = start;
                c.anchor = start;
            }
            self.rebuild_lines();
            let head = self.cursors.get(idx).head;
            let li = self.lines.line_of(head);
            let (line_start, _) = self.line_content_range(li);
            let mut text = nl.clone();
            let mut p = line_start;
            while p < head {
                let b = self.table.byte_at(p);
                if b == b' ' || b == b'\t' {
                    text.push(b);
                    p += 1;
                } else {
                    break;
                }
            }
            self.apply_insert(head, &text, &mut batch);
            let c = self.cursors.get_mut(idx);
            c.anchor = c.head;
            c.is_virtual = false;
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.cursors.merge();
        self.commit(batch);
    }

    /// Upper- or lowercase every selection, keeping its direction
    pub fn convert_selected_case(&mut self, upper: bool) {
        let mut batch = self.begin_batch();
        for idx in self.cursors.indices_by_start_desc() {
            let c = *self.cursors.get(idx);
            if !c.has_selection() {
                continue;
            }
            let start = c.start();
            let bytes = self.table.get_range(start, c.len()).unwrap_or_default();
            let converted = convert_case(&bytes, upper);
            if converted == bytes {
                continue;
            }
            let backward = c.is_backward();
            self.apply_erase(start, bytes.len(), &mut batch);
            self.apply_insert(start, &converted, &mut batch);
            let c = self.cursors.get_mut(idx);
            if backward {
                c.head = start;
                c.anchor = start + converted.len();
            } else {
                c.anchor = start;
                c.head = start + converted.len();
            }
        }
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.commit(batch);
    }

    /// Move the primary selection's bytes to `dest` as one undoable step
    ///
    /// Dropping inside the selection itself is a no-op.
    pub fn move_range_to(&mut self, dest: usize) {
        let c = *self.cursors.primary();
        if !c.has_selection() {
            return;
        }
        let start = c.start();
        let end = c.end();
        let dest = dest.min(self.table.len());
        if dest >= start && dest <= end {
            return;
        }
        let bytes = self.table.get_range(start, end - start).unwrap_or_default();
        let insert_pos = if dest > end { dest - bytes.len() } else { dest };
        let mut batch = self.begin_batch();
        self.raw_erase(start, bytes.len(), &mut batch);
        self.raw_insert(insert_pos, &bytes, &mut batch);
        self.cursors
            .set_single(Cursor::selecting(insert_pos, insert_pos + bytes.len()));
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.commit(batch);
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Revert the newest batch: ops replayed inverted in reverse order,
    /// cursors restored to the pre-edit snapshot
    pub fn undo(&mut self) {
        let Some(batch) = self.undo.pop_undo() else {
            return;
        };
        for op in batch.ops.iter().rev() {
            self.replay(op.inverted());
        }
        self.cursors.restore(batch.before.clone());
        self.finish_content_change();
        debug!("undo");
    }

    /// Re-apply the most recently undone batch
    pub fn redo(&mut self) {
        let Some(batch) = self.undo.pop_redo() else {
            return;
        };
        for op in &batch.ops {
            self.replay(op.clone());
        }
        self.cursors.restore(batch.after.clone());
        self.finish_content_change();
        debug!("redo");
    }

    fn replay(&mut self, op: EditOp) {
        match op {
            EditOp::Insert { pos, bytes } => self.table.insert(pos, &bytes),
            EditOp::Erase { pos, bytes } => self.table.erase(pos, bytes.len()),
        }
    }
}

/// Case-fold bytes, via `str` conversion when the slice is valid UTF-8
fn convert_case(bytes: &[u8], upper: bool) -> Vec<u8> {
    match std::str::from_utf8(bytes) {
        Ok(s) => {
            let converted = if upper {
                s.to_uppercase()
            } else {
                s.to_lowercase()
            };
            converted.into_bytes()
        }
        Err(_) => bytes
            .iter()
            .map(|b| {
                if upper {
                    b.to_ascii_uppercase()
                } else {
                    b.to_ascii_lowercase()
                }
            })
            .collect(),
    }
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
    fn newline_detection() {
        assert_eq!(Newline::detect(b"a\nb"), Newline::Lf);
        assert_eq!(Newline::detect(b"a\r\nb"), Newline::CrLf);
        assert_eq!(Newline::detect(b"a\rb"), Newline::Cr);
        assert_eq!(Newline::detect(b"no terminator"), Newline::Lf);
    }

    #[test]
    fn typing_at_single_cursor() {
        let mut ed = editor_with("");
        ed.insert_at_cursors("hi");
        assert_eq!(ed.to_text(), "hi");
        assert_eq!(ed.cursors().primary().head, 2);
        assert!(ed.is_modified());
    }

    #[test]
    fn three_cursor_insert_shifts() {
        let mut ed = editor_with("aaaaabbbbbccccc");
        ed.set_cursor(0);
        ed.add_cursor(5);
        ed.add_cursor(10);
        ed.insert_at_cursors("x");
        let heads: Vec<usize> = ed.cursors().iter().map(|c| c.head).collect();
        assert_eq!(heads, vec![1, 7, 13]);
        assert_eq!(ed.to_text(), "xaaaaaxbbbbbxccccc");
        // One user action, one undo step.
        ed.undo();
        assert_eq!(ed.to_text(), "aaaaabbbbbccccc");
    }

    #[test]
    fn insert_replaces_selection() {
        let mut ed = editor_with("hello world");
        ed.select(0, 5);
        ed.insert_at_cursors("bye");
        assert_eq!(ed.to_text(), "bye world");
        assert_eq!(ed.cursors().primary().head, 3);
    }

    #[test]
    fn backspace_deletes_crlf_as_one_unit() {
        let mut ed = editor_with("ab\r\ncd");
        ed.set_cursor(4);
        ed.backspace_at_cursors();
        assert_eq!(ed.to_text(), "abcd");
    }

    #[test]
    fn backspace_deletes_multibyte_as_one_unit() {
        let mut ed = editor_with("aé");
        ed.set_cursor(3);
        ed.backspace_at_cursors();
        assert_eq!(ed.to_text(), "a");
    }

    #[test]
    fn delete_forward_unit() {
        let mut ed = editor_with("é!");
        ed.set_cursor(0);
        ed.delete_forward_at_cursors();
        assert_eq!(ed.to_text(), "!");
    }

    #[test]
    fn backspace_at_document_start_is_noop() {
        let mut ed = editor_with("ab");
        ed.set_cursor(0);
        ed.backspace_at_cursors();
        assert_eq!(ed.to_text(), "ab");
        assert!(!ed.can_undo());
        assert!(!ed.is_modified());
    }

    #[test]
    fn undo_restores_cursor_snapshots() {
        let mut ed = editor_with("one two");
        ed.set_cursor(3);
        ed.insert_at_cursors("!");
        assert_eq!(ed.cursors().primary().head, 4);
        ed.undo();
        assert_eq!(ed.cursors().primary().head, 3);
        ed.redo();
        assert_eq!(ed.to_text(), "one! two");
        assert_eq!(ed.cursors().primary().head, 4);
    }

    #[test]
    fn undo_redo_chain_round_trips() {
        let mut ed = editor_with("");
        for word in ["alpha ", "beta ", "gamma"] {
            ed.insert_at_cursors(word);
        }
        let full = ed.to_text();
        ed.undo();
        ed.undo();
        ed.undo();
        assert_eq!(ed.to_text(), "");
        assert!(!ed.is_modified());
        ed.redo();
        ed.redo();
        ed.redo();
        assert_eq!(ed.to_text(), full);
    }

    #[test]
    fn undo_on_empty_history_is_silent() {
        let mut ed = editor_with("abc");
        ed.undo();
        ed.redo();
        assert_eq!(ed.to_text(), "abc");
    }

    #[test]
    fn auto_indent_copies_leading_whitespace() {
        let mut ed = editor_with("    code");
        ed.set_cursor(8);
        ed.insert_newline_auto_indent();
        assert_eq!(ed.to_text(), "    code\n    ");
        assert_eq!(ed.cursors().primary().head, 13);
        ed.undo();
        assert_eq!(ed.to_text(), "    code");
    }

    #[test]
    fn auto_indent_respects_crlf() {
        let mut ed = editor_with("\tx\r\n");
        ed.set_cursor(2);
        ed.insert_newline_auto_indent();
        assert_eq!(ed.to_text(), "\tx\r\n\t\r\n");
    }

    #[test]
    fn case_conversion_keeps_direction() {
        let mut ed = editor_with("hello");
        ed.select(5, 0); // backward
        ed.convert_selected_case(true);
        assert_eq!(ed.to_text(), "HELLO");
        let c = *ed.cursors().primary();
        assert!(c.is_backward());
        assert_eq!(c.end(), 5);
        ed.undo();
        assert_eq!(ed.to_text(), "hello");
    }

    #[test]
    fn drag_move_forward_and_back() {
        let mut ed = editor_with("abcdef");
        ed.select(0, 2); // "ab"
        ed.move_range_to(5);
        assert_eq!(ed.to_text(), "cdeabf");
        ed.select(3, 5);
        ed.move_range_to(0);
        assert_eq!(ed.to_text(), "abcdef");
        // Drop inside the selection does nothing.
        ed.select(1, 4);
        ed.move_range_to(2);
        assert_eq!(ed.to_text(), "abcdef");
    }

    #[test]
    fn save_point_tracks_dirty() {
        let mut ed = editor_with("x");
        ed.insert_at_cursors("y");
        assert!(ed.is_modified());
        ed.mark_saved();
        assert!(!ed.is_modified());
        ed.undo();
        assert!(ed.is_modified());
        ed.redo();
        assert!(!ed.is_modified());
    }

    #[test]
    fn dirty_events_fire_on_flips() {
        use std::cell::RefCell;
        use std::rc::Rc;
        let seen: Rc<RefCell<Vec<EditorEvent>>> = Rc::default();
        let mut ed = editor_with("x");
        let tap = seen.clone();
        ed.set_event_sink(Box::new(move |e| tap.borrow_mut().push(e)));
        ed.insert_at_cursors("y");
        ed.insert_at_cursors("z"); // still dirty, no second event
        ed.undo();
        ed.undo();
        let flips: Vec<EditorEvent> = seen.borrow().clone();
        assert_eq!(
            flips,
            vec![
                EditorEvent::DirtyChanged(true),
                EditorEvent::DirtyChanged(false)
            ]
        );
    }

    #[test]
    fn load_original_resets_state() {
        let mut ed = editor_with("first");
        ed.insert_at_cursors("!");
        ed.load_original(Arc::new(b"second\r\n".to_vec()));
        assert_eq!(ed.to_text(), "second\r\n");
        assert_eq!(ed.newline(), Newline::CrLf);
        assert!(!ed.is_modified());
        assert!(!ed.can_undo());
        assert_eq!(ed.cursors().primary().head, 0);
    }
}
