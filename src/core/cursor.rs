//! Cursor and Selection Set
//!
//! Every cursor is a head/anchor pair of byte offsets; head == anchor means
//! a bare caret. A cursor also carries its preferred horizontal position so
//! vertical movement through short lines remembers the column, and a
//! `is_virtual` flag marking a caret that logically sits past the physical
//! end of its line (column selection). Virtual carets keep `head` clamped to
//! the line end and never mutate the buffer until text is actually inserted.

use std::cmp::{max, min};

// =============================================================================
// CURSOR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Moving end of the selection (the caret)
    pub head: usize,
    /// Fixed end of the selection
    pub anchor: usize,
    /// Preferred horizontal position of the head, in metric units
    pub desired_x: f32,
    /// Horizontal position of the anchor, for rectangular selections
    pub anchor_x: f32,
    /// Caret logically past the physical end of its line
    pub is_virtual: bool,
}

impl Cursor {
    /// A bare caret at `pos`
    pub fn at(pos: usize) -> Self {
        Self {
            head: pos,
            anchor: pos,
            desired_x: 0.0,
            anchor_x: 0.0,
            is_virtual: false,
        }
    }

    /// A selection from `anchor` to `head`, in either order
    pub fn selecting(anchor: usize, head: usize) -> Self {
        Self {
            head,
            anchor,
            desired_x: 0.0,
            anchor_x: 0.0,
            is_virtual: false,
        }
    }

    pub fn start(&self) -> usize {
        min(self.head, self.anchor)
    }

    pub fn end(&self) -> usize {
        max(self.head, self.anchor)
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn has_selection(&self) -> bool {
        self.head != self.anchor
    }

    pub fn is_backward(&self) -> bool {
        self.head < self.anchor
    }

    /// Collapse to a bare caret at `pos`
    pub fn collapse_to(&mut self, pos: usize) {
        self.head = pos;
        self.anchor = pos;
        self.is_virtual = false;
    }
}

// =============================================================================
// CURSOR SET
// =============================================================================

/// The ordered set of active cursors
///
/// There is always at least one cursor while a document is open; the last
/// one in the list is the primary cursor (most recently placed).
#[derive(Debug, Clone)]
pub struct CursorSet {
    cursors: Vec<Cursor>,
}

impl Default for CursorSet {
    fn default() -> Self {
        Self::single(0)
    }
}

impl CursorSet {
    pub fn single(pos: usize) -> Self {
        Self {
            cursors: vec![Cursor::at(pos)],
        }
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cursor> {
        self.cursors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cursor> {
        self.cursors.iter_mut()
    }

    pub fn get(&self, idx: usize) -> &Cursor {
        &self.cursors[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Cursor {
        &mut self.cursors[idx]
    }

    /// The primary (most recently placed) cursor
    pub fn primary(&self) -> &Cursor {
        self.cursors.last().unwrap_or(&EMPTY_PRIMARY)
    }

    pub fn push(&mut self, cursor: Cursor) {
        self.cursors.push(cursor);
    }

    /// Replace all cursors with a single one
    pub fn set_single(&mut self, cursor: Cursor) {
        self.cursors.clear();
        self.cursors.push(cursor);
    }

    pub fn snapshot(&self) -> Vec<Cursor> {
        self.cursors.clone()
    }

    pub fn restore(&mut self, saved: Vec<Cursor>) {
        self.cursors = saved;
    }

    /// Drop virtual flags without touching positions
    ///
    /// Cancelling a column selection needs no buffer rollback because
    /// virtual carets never wrote anything.
    pub fn clear_virtual(&mut self) {
        for c in &mut self.cursors {
            if c.is_virtual {
                c.is_virtual = false;
            }
        }
    }

    /// Cursor indices ordered by selection start, descending
    ///
    /// Multi-cursor edits apply back-to-front so earlier positions stay
    /// valid while later ones are rewritten.
    pub fn indices_by_start_desc(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.cursors.len()).collect();
        order.sort_by(|&a, &b| self.cursors[b].start().cmp(&self.cursors[a].start()));
        order
    }

    /// Fold overlapping or touching cursors into one
    ///
    /// The surviving cursor covers the union of the merged ranges and keeps
    /// the directional sense (and preferred column) of the most recently
    /// placed of them, since that is the one the user was extending.
    pub fn merge(&mut self) {
        if self.cursors.len() < 2 {
            return;
        }
        let mut order: Vec<usize> = (0..self.cursors.len()).collect();
        order.sort_by_key(|&i| self.cursors[i].start());
        // Each entry carries the highest original index folded into it;
        // later pushes outrank earlier ones.
        let mut merged: Vec<(Cursor, usize)> = Vec::with_capacity(order.len());
        for i in order {
            let c = self.cursors[i];
            match merged.last_mut() {
                Some((prev, placed)) if c.start() <= prev.end() => {
                    let start = prev.start().min(c.start());
                    let end = prev.end().max(c.end());
                    let mut survivor = if i > *placed { c } else { *prev };
                    if survivor.is_backward() {
                        survivor.head = start;
                        survivor.anchor = end;
                    } else {
                        survivor.anchor = start;
                        survivor.head = end;
                    }
                    *placed = (*placed).max(i);
                    *prev = survivor;
                }
                _ => merged.push((c, i)),
            }
        }
        self.cursors = merged.into_iter().map(|(c, _)| c).collect();
    }

    // =========================================================================
    // POSITIONAL SHIFT
    // =========================================================================

    /// Shift every position at or after `pos` right by `len`
    pub fn shift_for_insert(&mut self, pos: usize, len: usize) {
        for c in &mut self.cursors {
            if c.head >= pos {
                c.head += len;
            }
            if c.anchor >= pos {
                c.anchor += len;
            }
        }
    }

    /// Shift positions past an erased range left, clamping positions
    /// inside the range to its start
    pub fn shift_for_erase(&mut self, pos: usize, len: usize) {
        let end = pos + len;
        let remap = |p: usize| {
            if p >= end {
                p - len
            } else if p > pos {
                pos
            } else {
                p
            }
        };
        for c in &mut self.cursors {
            c.head = remap(c.head);
            c.anchor = remap(c.anchor);
        }
    }
}

static EMPTY_PRIMARY: Cursor = Cursor {
    head: 0,
    anchor: 0,
    desired_x: 0.0,
    anchor_x: 0.0,
    is_virtual: false,
};

// =============================================================================
// TESTS
// =============================================================================
