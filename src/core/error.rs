//! Error Taxonomy
//!
//! The buffer core has exactly two failure shapes: a raw accessor asked for
//! a position past the end of the document, or a search pattern failed to
//! compile. Everything else in the engine is a clamped or silently dropped
//! no-op rather than an error.

use thiserror::Error;

/// Errors surfaced by the buffer core
#[derive(Debug, Error)]
pub enum Error {
    /// A checked accessor was handed a position beyond the document end
    #[error("position {pos} is beyond document length {len}")]
    OutOfRange { pos: usize, len: usize },

    /// A search pattern failed to compile
    ///
    /// Engine-level search paths catch this and report zero matches;
    /// it only escapes through APIs that hand back the compiled pattern.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Convenience alias used throughout the core
pub type Result<T> = std::result::Result<T, Error>;
