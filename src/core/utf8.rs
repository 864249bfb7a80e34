//! Byte-Level Text Units
//!
//! The buffer is plain bytes and may contain invalid UTF-8, but editing
//! operations still need to treat a CRLF pair, a multi-byte sequence, or a
//! full grapheme cluster as a single unit. These helpers size that unit from
//! a small byte window around the caret without ever materializing the
//! whole document.

use unicode_segmentation::UnicodeSegmentation;

/// How many bytes around the caret the unit helpers inspect
///
/// A grapheme cluster longer than this would be split; in practice even long
/// emoji ZWJ sequences fit comfortably.
pub const UNIT_WINDOW: usize = 64;

/// Word-constituent byte: ASCII alphanumeric, underscore, or any
/// non-ASCII byte (multi-byte text counts as word content)
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Size of the deletion unit starting at the front of `window`
///
/// `window` holds the bytes at and after the caret, at most
/// [`UNIT_WINDOW`] of them. Returns 0 only for an empty window.
pub fn next_unit(window: &[u8]) -> usize {
    if window.is_empty() {
        return 0;
    }
    if window.starts_with(b"\r\n") {
        return 2;
    }
    match std::str::from_utf8(window) {
        Ok(s) => first_grapheme_len(s),
        Err(e) if e.valid_up_to() > 0 => {
            // The window may clip a trailing sequence; the valid prefix is
            // enough to size the first grapheme.
            match std::str::from_utf8(&window[..e.valid_up_to()]) {
                Ok(s) => first_grapheme_len(s),
                Err(_) => 1,
            }
        }
        Err(_) => 1,
    }
}

/// Size of the deletion unit ending at the back of `window`
///
/// `window` holds the bytes immediately before the caret, at most
/// [`UNIT_WINDOW`] of them. Returns 0 only for an empty window.
pub fn prev_unit(window: &[u8]) -> usize {
    if window.is_empty() {
        return 0;
    }
    if window.ends_with(b"\r\n") {
        return 2;
    }
    // Longest valid UTF-8 suffix wins; its final grapheme is the unit.
    for i in 0..window.len() {
        if let Ok(s) = std::str::from_utf8(&window[i..]) {
            return last_grapheme_len(s);
        }
    }
    1
}

fn first_grapheme_len(s: &str) -> usize {
    s.graphemes(true).next().map(|g| g.len()).unwrap_or(1)
}

fn last_grapheme_len(s: &str) -> usize {
    s.graphemes(true).next_back().map(|g| g.len()).unwrap_or(1)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_units_are_one_byte() {
        assert_eq!(next_unit(b"abc"), 1);
        assert_eq!(prev_unit(b"abc"), 1);
    }

    #[test]
    fn crlf_is_one_unit() {
        assert_eq!(next_unit(b"\r\nx"), 2);
        assert_eq!(prev_unit(b"x\r\n"), 2);
        // Lone CR or LF stays a single unit.
        assert_eq!(next_unit(b"\rx"), 1);
        assert_eq!(prev_unit(b"x\n"), 1);
    }

    #[test]
    fn multibyte_sequence_is_one_unit() {
        let s = "aé".as_bytes();
        assert_eq!(prev_unit(s), 2);
        assert_eq!(next_unit(&s[1..]), 2);
        let emoji = "🎉".as_bytes();
        assert_eq!(next_unit(emoji), 4);
        assert_eq!(prev_unit(emoji), 4);
    }

    #[test]
    fn combining_mark_stays_attached() {
        let s = "e\u{0301}".as_bytes(); // e + combining acute
        assert_eq!(next_unit(s), 3);
        assert_eq!(prev_unit(s), 3);
    }

    #[test]
    fn zwj_sequence_is_one_unit() {
        let family = "👨‍👩‍👦".as_bytes();
        assert_eq!(next_unit(family), family.len());
        assert_eq!(prev_unit(family), family.len());
    }

    #[test]
    fn invalid_byte_is_one_unit() {
        assert_eq!(next_unit(&[0xFF, b'a']), 1);
        assert_eq!(prev_unit(&[b'a', 0xFF]), 1);
        assert_eq!(next_unit(&[0xFF]), 1);
    }

    #[test]
    fn empty_window() {
        assert_eq!(next_unit(b""), 0);
        assert_eq!(prev_unit(b""), 0);
    }

    #[test]
    fn word_bytes() {
        assert!(is_word_byte(b'a'));
        assert!(is_word_byte(b'9'));
        assert!(is_word_byte(b'_'));
        assert!(is_word_byte(0xC3));
        assert!(!is_word_byte(b' '));
        assert!(!is_word_byte(b'-'));
    }
}
