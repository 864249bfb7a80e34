//! Line Index
//!
//! A flat table of line-start byte offsets, rebuilt after every
//! content-changing batch by scanning the piece chunks. Entry 0 is always 0,
//! so an empty document still has one (empty) line. Position-to-line lookup
//! is an upper-bound binary search.

use crate::core::piece_table::PieceTable;

#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    doc_len: usize,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self {
            starts: vec![0],
            doc_len: 0,
        }
    }
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan the document for line starts
    ///
    /// Walks the piece chunks directly so the document is never materialized.
    pub fn rebuild(&mut self, table: &PieceTable) {
        self.starts.clear();
        self.starts.push(0);
        let mut pos = 0usize;
        for chunk in table.chunks() {
            for (i, b) in chunk.bytes.iter().enumerate() {
                if *b == b'\n' {
                    self.starts.push(pos + i + 1);
                }
            }
            pos += chunk.bytes.len();
        }
        self.doc_len = table.len();
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Start offset of line `idx` (clamped to the last line)
    pub fn start(&self, idx: usize) -> usize {
        let idx = idx.min(self.starts.len() - 1);
        self.starts[idx]
    }

    /// The line containing byte offset `pos`
    pub fn line_of(&self, pos: usize) -> usize {
        // upper_bound: first start strictly greater than pos, minus one
        self.starts.partition_point(|&s| s <= pos).saturating_sub(1)
    }

    /// Byte range `[start, end)` of line `idx`, terminator included
    pub fn line_range(&self, idx: usize) -> (usize, usize) {
        let idx = idx.min(self.starts.len() - 1);
        let start = self.starts[idx];
        let end = if idx + 1 < self.starts.len() {
            self.starts[idx + 1]
        } else {
            self.doc_len
        };
        (start, end)
    }
}

// =============================================================================
// TESTS
// =============================================================================
