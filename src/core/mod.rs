//! This module constitutes the core, headless, and backend-agnostic editing
//! engine of quill. It manages the fundamental editor components: the piece
//! table backing store, the line index, the cursor set, batched undo/redo,
//! caret motion, line-level operations, and search and replace.

pub mod cursor;
pub mod editor;
pub mod error;
pub mod event;
pub mod line_index;
pub mod line_ops;
pub mod metrics;
pub mod motion;
pub mod piece_table;
pub mod search;
pub mod undo;
pub mod utf8;
