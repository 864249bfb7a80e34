//! Headless multi-cursor text editing engine
//!
//! quill keeps document bytes in a piece table over an immutable origin
//! plus an append-only edit log, tracks lines and cursors on top of it,
//! and exposes batched, fully undoable editing operations. Rendering,
//! input handling and file IO live in the embedding application; the
//! engine only asks for a [`core::metrics::TextMetrics`] to convert
//! between byte offsets and horizontal pixel positions.

pub mod core;

pub use crate::core::cursor::{Cursor, CursorSet};
pub use crate::core::editor::{Editor, Newline};
pub use crate::core::error::{Error, Result};
pub use crate::core::event::{EditorEvent, EventSink, NullSink};
pub use crate::core::metrics::{MonospaceMetrics, TextMetrics};
pub use crate::core::piece_table::{OriginSource, PieceTable};
pub use crate::core::search::SearchState;
