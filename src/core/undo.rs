//! Undo/Redo Log
//!
//! History is a stack of batches. A batch bundles the primitive ops of one
//! user-visible action (a multi-cursor insert is one batch, however many
//! cursors it touched) together with cursor snapshots from before and after,
//! so undo restores both content and selection in a single step.

use std::collections::VecDeque;

use crate::core::cursor::Cursor;

/// History depth cap; oldest batches fall off the front
const MAX_UNDO_DEPTH: usize = 10_000;

// =============================================================================
// EDIT OPS
// =============================================================================

/// One reversible primitive edit
///
/// Both variants carry the exact affected bytes, so replaying in either
/// direction never needs to consult the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Insert { pos: usize, bytes: Vec<u8> },
    Erase { pos: usize, bytes: Vec<u8> },
}

impl EditOp {
    pub fn pos(&self) -> usize {
        match self {
            EditOp::Insert { pos, .. } | EditOp::Erase { pos, .. } => *pos,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EditOp::Insert { bytes, .. } | EditOp::Erase { bytes, .. } => bytes.len(),
        }
    }

    /// The op that exactly undoes this one
    pub fn inverted(&self) -> EditOp {
        match self {
            EditOp::Insert { pos, bytes } => EditOp::Erase {
                pos: *pos,
                bytes: bytes.clone(),
            },
            EditOp::Erase { pos, bytes } => EditOp::Insert {
                pos: *pos,
                bytes: bytes.clone(),
            },
        }
    }
}

/// The ops and cursor snapshots of one undoable action
#[derive(Debug, Clone)]
pub struct EditBatch {
    pub ops: Vec<EditOp>,
    pub before: Vec<Cursor>,
    pub after: Vec<Cursor>,
}

impl EditBatch {
    pub fn starting_from(before: Vec<Cursor>) -> Self {
        Self {
            ops: Vec::new(),
            before,
            after: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// =============================================================================
// UNDO LOG
// =============================================================================

#[derive(Debug, Default)]
pub struct UndoLog {
    undo: VecDeque<EditBatch>,
    redo: Vec<EditBatch>,
    /// Undo depth at the last save, None once that state became unreachable
    save_point: Option<usize>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            save_point: Some(0),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    /// Record a completed batch
    ///
    /// Any redo history is discarded; if the saved state lived in that
    /// discarded future, no amount of undo/redo can reach it again.
    pub fn push(&mut self, batch: EditBatch) {
        self.redo.clear();
        if let Some(sp) = self.save_point
            && sp > self.undo.len()
        {
            self.save_point = None;
        }
        self.undo.push_back(batch);
        if self.undo.len() > MAX_UNDO_DEPTH {
            self.undo.pop_front();
            self.save_point = match self.save_point {
                Some(0) | None => None,
                Some(sp) => Some(sp - 1),
            };
        }
    }

    /// Pop the newest batch for replay-in-reverse; it moves to the redo side
    pub fn pop_undo(&mut self) -> Option<EditBatch> {
        let batch = self.undo.pop_back()?;
        self.redo.push(batch.clone());
        Some(batch)
    }

    /// Pop the next redoable batch; it moves back to the undo side
    pub fn pop_redo(&mut self) -> Option<EditBatch> {
        let batch = self.redo.pop()?;
        self.undo.push_back(batch.clone());
        Some(batch)
    }

    /// Mark the current depth as the on-disk state
    pub fn mark_saved(&mut self) {
        self.save_point = Some(self.undo.len());
    }

    /// Whether the document differs from the last marked save
    pub fn is_modified(&self) -> bool {
        self.save_point != Some(self.undo.len())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.save_point = Some(0);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(pos: usize) -> EditBatch {
        EditBatch {
            ops: vec![EditOp::Insert {
                pos,
                bytes: b"x".to_vec(),
            }],
            before: vec![Cursor::at(pos)],
            after: vec![Cursor::at(pos + 1)],
        }
    }

    #[test]
    fn invert_round_trip() {
        let op = EditOp::Insert {
            pos: 3,
            bytes: b"abc".to_vec(),
        };
        assert_eq!(op.inverted().inverted(), op);
        assert_eq!(op.inverted().pos(), 3);
        assert_eq!(op.inverted().len(), 3);
    }

    #[test]
    fn fresh_log_is_unmodified() {
        let log = UndoLog::new();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert!(!log.is_modified());
    }

    #[test]
    fn push_marks_modified() {
        let mut log = UndoLog::new();
        log.push(batch(0));
        assert!(log.is_modified());
        assert!(log.can_undo());
    }

    #[test]
    fn undo_back_to_save_point_is_clean() {
        let mut log = UndoLog::new();
        log.push(batch(0));
        log.push(batch(1));
        log.mark_saved();
        log.push(batch(2));
        assert!(log.is_modified());
        log.pop_undo();
        assert!(!log.is_modified());
        log.pop_undo();
        assert!(log.is_modified());
        log.pop_redo();
        assert!(!log.is_modified());
    }

    #[test]
    fn divergent_history_invalidates_save_point() {
        let mut log = UndoLog::new();
        log.push(batch(0));
        log.push(batch(1));
        log.mark_saved(); // saved at depth 2
        log.pop_undo();
        log.push(batch(9)); // depth back to 2 on a different branch
        assert!(log.is_modified());
        log.pop_undo();
        assert!(log.is_modified());
    }

    #[test]
    fn push_clears_redo() {
        let mut log = UndoLog::new();
        log.push(batch(0));
        log.pop_undo();
        assert!(log.can_redo());
        log.push(batch(1));
        assert!(!log.can_redo());
    }
}
