//! Piece Table
//!
//! The document is described as an ordered list of pieces, each pointing
//! into one of two backing stores: the immutable original region (whatever
//! the caller loaded, typically a memory map) and an append-only edit log.
//! Insert and erase splice pieces; neither ever copies the original region
//! or rewinds the edit log, so a multi-gigabyte file costs only the pieces
//! actually touched.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::core::error::{Error, Result};

/// Which backing store a piece points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The immutable original region supplied at load time
    Original,
    /// The append-only edit log
    Append,
}

/// A contiguous run of bytes in one backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub region: Region,
    pub start: usize,
    pub len: usize,
}

/// A borrowed, region-tagged slice of document content
///
/// Produced by [`PieceTable::chunks`]; streaming these in order serializes
/// the document without ever materializing it.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub region: Region,
    pub bytes: &'a [u8],
}

/// Shared read-only view over the original file content
pub type OriginSource = Arc<dyn AsRef<[u8]> + Send + Sync>;

pub struct PieceTable {
    origin: OriginSource,
    edit_log: Vec<u8>,
    pieces: Vec<Piece>,
    length: usize,
}

impl fmt::Debug for PieceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceTable")
            .field("origin_len", &self.origin_bytes().len())
            .field("edit_log_len", &self.edit_log.len())
            .field("pieces", &self.pieces)
            .field("length", &self.length)
            .finish()
    }
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl PieceTable {
    /// An empty document with no original region
    pub fn empty() -> Self {
        Self {
            origin: Arc::new(Vec::new()),
            edit_log: Vec::new(),
            pieces: Vec::new(),
            length: 0,
        }
    }

    /// A document whose initial content is the given read-only region
    pub fn from_origin(origin: OriginSource) -> Self {
        let len = (*origin).as_ref().len();
        let pieces = if len == 0 {
            Vec::new()
        } else {
            vec![Piece {
                region: Region::Original,
                start: 0,
                len,
            }]
        };
        Self {
            origin,
            edit_log: Vec::new(),
            pieces,
            length: len,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    fn origin_bytes(&self) -> &[u8] {
        (*self.origin).as_ref()
    }

    fn piece_bytes(&self, piece: &Piece) -> &[u8] {
        let store = match piece.region {
            Region::Original => self.origin_bytes(),
            Region::Append => &self.edit_log,
        };
        &store[piece.start..piece.start + piece.len]
    }

    /// Region-tagged content slices, in document order
    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'_>> {
        self.pieces.iter().map(|p| Chunk {
            region: p.region,
            bytes: self.piece_bytes(p),
        })
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// Copy out up to `count` bytes starting at `pos`
    ///
    /// The read is clamped at the end of the document; asking for a start
    /// position past the end is the only error.
    pub fn get_range(&self, pos: usize, count: usize) -> Result<Vec<u8>> {
        if pos > self.length {
            return Err(Error::OutOfRange {
                pos,
                len: self.length,
            });
        }
        let count = count.min(self.length - pos);
        let mut out = Vec::with_capacity(count);
        let mut cur = 0usize;
        for piece in &self.pieces {
            if out.len() == count {
                break;
            }
            let piece_end = cur + piece.len;
            if piece_end > pos {
                let from = pos.max(cur) - cur;
                let want = count - out.len();
                let take = (piece.len - from).min(want);
                out.extend_from_slice(&self.piece_bytes(piece)[from..from + take]);
            }
            cur = piece_end;
        }
        Ok(out)
    }

    /// The byte at `pos`, or `b' '` when `pos` is past the end
    ///
    /// The space fallback keeps caret-math callers branch-free; use
    /// [`get_range`](Self::get_range) when out-of-range must be an error.
    pub fn byte_at(&self, pos: usize) -> u8 {
        let mut cur = 0usize;
        for piece in &self.pieces {
            if pos < cur + piece.len {
                return self.piece_bytes(piece)[pos - cur];
            }
            cur += piece.len;
        }
        b' '
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Insert `bytes` at `pos` (clamped to the end of the document)
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        trace!(pos, len = bytes.len(), "piece_table insert");
        let new_piece = Piece {
            region: Region::Append,
            start: self.edit_log.len(),
            len: bytes.len(),
        };
        self.edit_log.extend_from_slice(bytes);

        let mut idx = 0usize;
        let mut cur = 0usize;
        while idx < self.pieces.len() && cur + self.pieces[idx].len < pos {
            cur += self.pieces[idx].len;
            idx += 1;
        }

        if idx == self.pieces.len() {
            self.pieces.push(new_piece);
        } else {
            let offset = pos - cur;
            if offset == 0 {
                self.pieces.insert(idx, new_piece);
            } else if offset == self.pieces[idx].len {
                idx += 1;
                self.pieces.insert(idx, new_piece);
            } else {
                let existing = self.pieces[idx];
                let right = Piece {
                    region: existing.region,
                    start: existing.start + offset,
                    len: existing.len - offset,
                };
                self.pieces[idx].len = offset;
                self.pieces.insert(idx + 1, new_piece);
                self.pieces.insert(idx + 2, right);
                idx += 1;
            }
        }

        self.length += bytes.len();
        self.coalesce_around(idx);
    }

    /// Erase `count` bytes starting at `pos` (truncated at the end)
    pub fn erase(&mut self, pos: usize, count: usize) {
        if count == 0 || pos >= self.length {
            return;
        }
        let count = count.min(self.length - pos);
        trace!(pos, count, "piece_table erase");

        let mut idx = 0usize;
        let mut cur = 0usize;
        while idx < self.pieces.len() && cur + self.pieces[idx].len <= pos {
            cur += self.pieces[idx].len;
            idx += 1;
        }

        let mut remaining = count;
        while remaining > 0 && idx < self.pieces.len() {
            let offset = pos.saturating_sub(cur);
            let piece = self.pieces[idx];
            let take = (piece.len - offset).min(remaining);

            if offset == 0 && take == piece.len {
                // Whole piece consumed; successor slides into `idx`.
                self.pieces.remove(idx);
            } else if offset == 0 {
                let p = &mut self.pieces[idx];
                p.start += take;
                p.len -= take;
            } else if offset + take == piece.len {
                self.pieces[idx].len = offset;
                cur += offset;
                idx += 1;
            } else {
                // Erase strictly inside one piece: keep head, split off tail.
                let tail = Piece {
                    region: piece.region,
                    start: piece.start + offset + take,
                    len: piece.len - offset - take,
                };
                self.pieces[idx].len = offset;
                self.pieces.insert(idx + 1, tail);
            }
            remaining -= take;
        }

        self.length -= count;
        self.coalesce_around(idx.min(self.pieces.len().saturating_sub(1)));
    }

    /// Merge byte-contiguous edit-log pieces near `idx`
    ///
    /// Sequential typing appends contiguous runs to the edit log; without
    /// this, every keystroke would grow the piece list by one.
    fn coalesce_around(&mut self, idx: usize) {
        if self.pieces.is_empty() {
            return;
        }
        let mut j = idx.saturating_sub(1);
        let stop = (idx + 1).min(self.pieces.len());
        while j < stop && j + 1 < self.pieces.len() {
            let (a, b) = (self.pieces[j], self.pieces[j + 1]);
            if a.region == Region::Append
                && b.region == Region::Append
                && a.start + a.len == b.start
            {
                self.pieces[j].len += b.len;
                self.pieces.remove(j + 1);
            } else {
                j += 1;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(text: &str) -> PieceTable {
        PieceTable::from_origin(Arc::new(text.as_bytes().to_vec()))
    }

    fn content(pt: &PieceTable) -> String {
        String::from_utf8(pt.get_range(0, pt.len()).unwrap()).unwrap()
    }

    #[test]
    fn empty_table() {
        let pt = PieceTable::empty();
        assert_eq!(pt.len(), 0);
        assert!(pt.is_empty());
        assert_eq!(pt.piece_count(), 0);
    }

    #[test]
    fn origin_is_single_piece() {
        let pt = table_with("hello world");
        assert_eq!(pt.piece_count(), 1);
        assert_eq!(content(&pt), "hello world");
    }

    #[test]
    fn insert_at_start_middle_end() {
        let mut pt = table_with("bd");
        pt.insert(1, b"c");
        pt.insert(0, b"a");
        pt.insert(pt.len(), b"e");
        assert_eq!(content(&pt), "abcde");
    }

    #[test]
    fn insert_into_empty() {
        let mut pt = PieceTable::empty();
        pt.insert(0, b"hi");
        assert_eq!(content(&pt), "hi");
        assert_eq!(pt.piece_count(), 1);
    }

    #[test]
    fn insert_past_end_clamps() {
        let mut pt = table_with("ab");
        pt.insert(99, b"c");
        assert_eq!(content(&pt), "abc");
    }

    #[test]
    fn erase_within_one_piece() {
        let mut pt = table_with("hello world");
        pt.erase(5, 6);
        assert_eq!(content(&pt), "hello");
    }

    #[test]
    fn erase_spanning_pieces() {
        let mut pt = table_with("hello");
        pt.insert(5, b" world");
        pt.erase(3, 5);
        assert_eq!(content(&pt), "helrld");
    }

    #[test]
    fn erase_everything() {
        let mut pt = table_with("abc");
        pt.erase(0, 3);
        assert_eq!(pt.len(), 0);
        assert_eq!(pt.piece_count(), 0);
    }

    #[test]
    fn erase_past_end_truncates() {
        let mut pt = table_with("abc");
        pt.erase(2, 100);
        assert_eq!(content(&pt), "ab");
    }

    #[test]
    fn sequential_typing_coalesces() {
        let mut pt = PieceTable::empty();
        for (i, b) in b"typing test".iter().enumerate() {
            pt.insert(i, &[*b]);
        }
        assert_eq!(content(&pt), "typing test");
        assert_eq!(pt.piece_count(), 1);
    }

    #[test]
    fn typing_after_origin_stays_bounded() {
        let mut pt = table_with("base");
        for i in 0..50 {
            pt.insert(4 + i, b"x");
        }
        assert_eq!(pt.len(), 54);
        assert!(pt.piece_count() <= 2);
    }

    #[test]
    fn get_range_clamps_count() {
        let pt = table_with("abc");
        assert_eq!(pt.get_range(1, 100).unwrap(), b"bc");
        assert_eq!(pt.get_range(3, 1).unwrap(), b"");
        assert!(pt.get_range(4, 1).is_err());
    }

    #[test]
    fn byte_at_fallback() {
        let pt = table_with("xy");
        assert_eq!(pt.byte_at(0), b'x');
        assert_eq!(pt.byte_at(2), b' ');
    }

    #[test]
    fn chunks_tag_regions() {
        let mut pt = table_with("orig");
        pt.insert(4, b"+new");
        let tags: Vec<Region> = pt.chunks().map(|c| c.region).collect();
        assert_eq!(tags, vec![Region::Original, Region::Append]);
        let joined: Vec<u8> = pt.chunks().flat_map(|c| c.bytes.to_vec()).collect();
        assert_eq!(joined, b"orig+new");
    }
}
