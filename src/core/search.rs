//! Search and Replace
//!
//! Two engines share one state: a literal scanner (ASCII case folding,
//! whole-word filtering, wrapping around the document exactly once) and a
//! regex engine over the raw bytes. Regex queries get a newline-widening
//! preprocessing pass so `^` and the `\n` escape work across LF, CRLF and
//! lone-CR documents, with caret matches trimmed back off the terminator
//! they consumed. A pattern that fails to compile reports zero matches and
//! never panics.

use regex::bytes::{Regex, RegexBuilder};
use tracing::debug;

use crate::core::cursor::Cursor;
use crate::core::editor::{Editor, Newline};
use crate::core::error::Result;
use crate::core::event::EditorEvent;
use crate::core::utf8::is_word_byte;

/// Query, replacement template and match flags
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub replacement: String,
    pub match_case: bool,
    pub whole_word: bool,
    pub use_regex: bool,
}

impl Editor {
    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search.query = query.to_string();
    }

    pub fn set_replacement(&mut self, replacement: &str) {
        self.search.replacement = replacement.to_string();
    }

    pub fn set_match_case(&mut self, on: bool) {
        self.search.match_case = on;
    }

    pub fn set_whole_word(&mut self, on: bool) {
        self.search.whole_word = on;
    }

    pub fn set_use_regex(&mut self, on: bool) {
        self.search.use_regex = on;
    }

    // =========================================================================
    // FIND
    // =========================================================================

    /// Find and select the next match, wrapping around once
    ///
    /// Forward search starts at the primary selection's end, backward at its
    /// start. No match reports [`EditorEvent::NoMatch`].
    pub fn find_next(&mut self, forward: bool) -> Option<(usize, usize)> {
        let c = *self.cursors.primary();
        let from = if forward { c.end() } else { c.start() };
        match self.find_match(from, forward) {
            Some((s, e)) => {
                self.select(s, e);
                debug!(start = s, end = e, "search hit");
                Some((s, e))
            }
            None => {
                self.sink.notify(EditorEvent::NoMatch);
                None
            }
        }
    }

    /// All non-overlapping matches in document order, for highlighting
    pub fn find_all(&self) -> Vec<(usize, usize)> {
        if self.search.query.is_empty() {
            return Vec::new();
        }
        let text = self.all_bytes();
        let mut out = Vec::new();
        if self.search.use_regex {
            let Ok(re) = self.compile_search_regex() else {
                return out;
            };
            let caret = self.search.query.starts_with('^');
            for m in re.find_iter(&text) {
                let (s, e) = trim_caret_terminator(&text, m.start(), m.end(), caret);
                if e > s {
                    out.push((s, e));
                }
            }
        } else {
            let mut pos = 0usize;
            while let Some((s, e)) = self.literal_find(&text, pos, true) {
                if s < pos {
                    break; // wrapped
                }
                out.push((s, e));
                pos = e.max(s + 1);
            }
        }
        out
    }

    /// The bytes a renderer should highlight: the single-line primary
    /// selection, or the word under the caret (flagged whole-word)
    pub fn highlight_target(&self) -> Option<(Vec<u8>, bool)> {
        let c = *self.cursors.primary();
        if c.has_selection() {
            let bytes = self.table.get_range(c.start(), c.len()).unwrap_or_default();
            if bytes.iter().any(|b| *b == b'\n' || *b == b'\r') {
                return None;
            }
            return Some((bytes, false));
        }
        let pos = self.step_left_into_word(c.head);
        if pos >= self.table.len() || !is_word_byte(self.table.byte_at(pos)) {
            return None;
        }
        let (s, e) = self.word_boundaries(pos);
        let bytes = self.table.get_range(s, e - s).unwrap_or_default();
        Some((bytes, true))
    }

    /// Select the word under the caret, or add a cursor on the next exact
    /// occurrence of the current selection
    pub fn select_next_occurrence(&mut self) {
        let c = *self.cursors.primary();
        if !c.has_selection() {
            let pos = self.step_left_into_word(c.head);
            let (s, e) = self.word_boundaries(pos);
            if e > s {
                let i = self.cursors.len() - 1;
                let cur = self.cursors.get_mut(i);
                cur.anchor = s;
                cur.head = e;
                self.refresh_cursor_x();
            }
            return;
        }
        let needle = self.table.get_range(c.start(), c.len()).unwrap_or_default();
        let text = self.all_bytes();
        let n = text.len();
        let m = needle.len();
        if m == 0 || m > n {
            return;
        }
        let from = c.end();
        for step in 0..n {
            let pos = (from + step) % n;
            if pos + m > n || text[pos..pos + m] != needle[..] {
                continue;
            }
            // An occurrence touching any existing cursor is already covered;
            // pushing it would only merge away and stall the walk.
            let covered = self.cursors.iter().any(|cc| {
                cc.start() == pos || (pos < cc.end() && pos + m > cc.start())
            });
            if covered {
                continue;
            }
            self.cursors.push(Cursor::selecting(pos, pos + m));
            self.cursors.merge();
            self.refresh_cursor_x();
            return;
        }
        self.sink.notify(EditorEvent::NoMatch);
    }

    /// A caret sitting just past a word slides onto its last byte
    fn step_left_into_word(&self, pos: usize) -> usize {
        let len = self.table.len();
        let at_word = pos < len && is_word_byte(self.table.byte_at(pos));
        if !at_word && pos > 0 && is_word_byte(self.table.byte_at(pos - 1)) {
            pos - 1
        } else {
            pos
        }
    }

    // =========================================================================
    // REPLACE
    // =========================================================================

    /// Replace the primary selection if it is a match; returns whether it
    /// replaced
    ///
    /// The selection is re-validated against the query first, so a stale or
    /// hand-made selection is never clobbered.
    pub fn replace_current(&mut self) -> bool {
        if self.search.query.is_empty() {
            return false;
        }
        let c = *self.cursors.primary();
        if !c.has_selection() {
            return false;
        }
        let start = c.start();
        let replacement = match self.validated_replacement(start, c.end()) {
            Some(r) => r,
            None => return false,
        };
        let mut batch = self.begin_batch();
        self.apply_erase(start, c.len(), &mut batch);
        self.apply_insert(start, &replacement, &mut batch);
        self.cursors
            .set_single(Cursor::selecting(start, start + replacement.len()));
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.commit(batch);
        true
    }

    /// Replace the current match if the selection is one, then move to the
    /// next match either way
    pub fn replace_next(&mut self) -> bool {
        let replaced = self.replace_current();
        self.find_next(true);
        replaced
    }

    /// Replace every match in one undoable batch; returns the count
    ///
    /// Matches are enumerated first over a stable view, then applied in
    /// descending order so earlier offsets never move. Zero matches (or a
    /// bad pattern) reports [`EditorEvent::NoMatch`] and leaves the document
    /// alone.
    pub fn replace_all(&mut self) -> usize {
        if self.search.query.is_empty() {
            self.sink.notify(EditorEvent::NoMatch);
            return 0;
        }
        let text = self.all_bytes();
        let template = unescape_replacement(&self.search.replacement, self.newline);
        let mut matches: Vec<(usize, usize, Vec<u8>)> = Vec::new();

        if self.search.use_regex {
            let Ok(re) = self.compile_search_regex() else {
                self.sink.notify(EditorEvent::NoMatch);
                return 0;
            };
            let caret = self.search.query.starts_with('^');
            for caps in re.captures_iter(&text) {
                let Some(m) = caps.get(0) else { continue };
                let (s, e) = trim_caret_terminator(&text, m.start(), m.end(), caret);
                if e <= s {
                    continue;
                }
                let mut out = Vec::new();
                caps.expand(&template, &mut out);
                matches.push((s, e, out));
            }
        } else {
            let mut pos = 0usize;
            while let Some((s, e)) = self.literal_find(&text, pos, true) {
                if s < pos {
                    break; // wrapped
                }
                matches.push((s, e, template.clone()));
                pos = e.max(s + 1);
            }
        }

        if matches.is_empty() {
            self.sink.notify(EditorEvent::NoMatch);
            return 0;
        }
        let count = matches.len();
        let mut batch = self.begin_batch();
        for (s, e, r) in matches.iter().rev() {
            self.raw_erase(*s, e - s, &mut batch);
            self.raw_insert(*s, r, &mut batch);
        }
        // Land the cursor on the final replacement, shifted by everything
        // before it.
        let mut offset = 0isize;
        for (s, e, r) in matches.iter().take(count - 1) {
            offset += r.len() as isize - (*e - *s) as isize;
        }
        let (last_start, _, last_repl) = &matches[count - 1];
        let sel_start = (*last_start as isize + offset).max(0) as usize;
        self.cursors
            .set_single(Cursor::selecting(sel_start, sel_start + last_repl.len()));
        self.rebuild_lines();
        self.refresh_cursor_x();
        self.commit(batch);
        debug!(count, "replace all");
        self.sink.notify(EditorEvent::ReplaceAllFinished(count));
        count
    }

    /// Validate `[start, end)` as a match and produce its replacement bytes
    fn validated_replacement(&self, start: usize, end: usize) -> Option<Vec<u8>> {
        let template = unescape_replacement(&self.search.replacement, self.newline);
        if self.search.use_regex {
            let re = self.compile_search_regex().ok()?;
            let caret = self.search.query.starts_with('^');
            let text = self.all_bytes();
            let search_start = back_over_terminator(&text, start);
            let caps = re.captures_at(&text, search_start)?;
            let m = caps.get(0)?;
            let (s, e) = trim_caret_terminator(&text, m.start(), m.end(), caret);
            if (s, e) != (start, end) {
                return None;
            }
            let mut out = Vec::new();
            caps.expand(&template, &mut out);
            Some(out)
        } else {
            let sel = self.table.get_range(start, end - start).unwrap_or_default();
            let needle = self.search.query.as_bytes();
            if sel.len() != needle.len() {
                return None;
            }
            let fold = !self.search.match_case;
            let eq = sel.iter().zip(needle).all(|(a, b)| {
                if fold {
                    a.eq_ignore_ascii_case(b)
                } else {
                    a == b
                }
            });
            if eq { Some(template) } else { None }
        }
    }

    // =========================================================================
    // MATCH ENGINES
    // =========================================================================

    fn find_match(&self, from: usize, forward: bool) -> Option<(usize, usize)> {
        if self.search.query.is_empty() {
            return None;
        }
        let text = self.all_bytes();
        if self.search.use_regex {
            self.regex_find(&text, from, forward)
        } else {
            self.literal_find(&text, from, forward)
        }
    }

    /// Byte-wise scan with single wrap-around
    fn literal_find(&self, text: &[u8], from: usize, forward: bool) -> Option<(usize, usize)> {
        let n = text.len();
        let m = self.search.query.len();
        if m == 0 || m > n {
            return None;
        }
        let from = from.min(n);
        for step in 0..n {
            let pos = if forward {
                (from + step) % n
            } else {
                (from + n - 1 - step) % n
            };
            if self.literal_match_at(text, pos) {
                return Some((pos, pos + m));
            }
        }
        None
    }

    fn literal_match_at(&self, text: &[u8], pos: usize) -> bool {
        let needle = self.search.query.as_bytes();
        let m = needle.len();
        let n = text.len();
        if pos + m > n {
            return false;
        }
        let fold = !self.search.match_case;
        let eq = text[pos..pos + m].iter().zip(needle).all(|(a, b)| {
            if fold {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        });
        if !eq {
            return false;
        }
        if self.search.whole_word {
            if pos > 0 && is_word_byte(text[pos - 1]) {
                return false;
            }
            if pos + m < n && is_word_byte(text[pos + m]) {
                return false;
            }
        }
        true
    }

    fn regex_find(&self, text: &[u8], from: usize, forward: bool) -> Option<(usize, usize)> {
        let re = self.compile_search_regex().ok()?;
        let caret = self.search.query.starts_with('^');
        let n = text.len();
        let from = from.min(n);
        if forward {
            // Re-include a just-passed terminator so line anchors see it.
            let search_start = back_over_terminator(text, from);
            if let Some(m) = re.find_at(text, search_start) {
                return Some(trim_caret_terminator(text, m.start(), m.end(), caret));
            }
            if search_start > 0 {
                let m = re.find(text)?;
                return Some(trim_caret_terminator(text, m.start(), m.end(), caret));
            }
            None
        } else {
            // Last match before the limit; wrapping falls back to the last
            // match in the document.
            let limit = if from == 0 { n } else { from };
            let mut before = None;
            let mut last = None;
            for m in re.find_iter(text) {
                let span = trim_caret_terminator(text, m.start(), m.end(), caret);
                if span.0 < limit {
                    before = Some(span);
                }
                last = Some(span);
            }
            before.or(last)
        }
    }

    fn compile_search_regex(&self) -> Result<Regex> {
        let processed = preprocess_regex_query(&self.search.query);
        let re = RegexBuilder::new(&processed)
            .case_insensitive(!self.search.match_case)
            .build()?;
        Ok(re)
    }
}

// =============================================================================
// QUERY / TEMPLATE REWRITING
// =============================================================================

/// Widen line anchors for mixed newline styles
///
/// Outside character classes, `^` becomes "document start or any
/// terminator" and the two-character escape `\n` matches any terminator.
fn preprocess_regex_query(query: &str) -> String {
    const ANY_BREAK: &str = r"(?:\r\n|[\r\n])";
    let mut out = String::with_capacity(query.len() + 16);
    let mut chars = query.chars().peekable();
    let mut in_class = false;
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if !in_class && chars.peek() == Some(&'n') {
                    chars.next();
                    out.push_str(ANY_BREAK);
                } else {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '^' if !in_class => {
                out.push_str(r"(?:^|(?:\r\n|[\r\n]))");
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Strip the terminator a widened `^` swallowed into the match
fn trim_caret_terminator(
    text: &[u8],
    start: usize,
    end: usize,
    caret: bool,
) -> (usize, usize) {
    if !caret || start >= end {
        return (start, end);
    }
    if text[start..end].starts_with(b"\r\n") && end - start >= 2 {
        (start + 2, end)
    } else if text[start] == b'\n' || text[start] == b'\r' {
        ((start + 1).min(end), end)
    } else {
        (start, end)
    }
}

/// Start a forward search just before a directly preceding terminator
fn back_over_terminator(text: &[u8], from: usize) -> usize {
    if from == 0 || from > text.len() {
        return from.min(text.len());
    }
    match text[from - 1] {
        b'\n' => {
            if from >= 2 && text[from - 2] == b'\r' {
                from - 2
            } else {
                from - 1
            }
        }
        b'\r' => from - 1,
        _ => from,
    }
}

/// Expand `\n` (to the document's newline style), `\t`, `\r` and `\\` in a
/// replacement template; `$` capture references are left for the regex
/// engine
fn unescape_replacement(template: &str, newline: Newline) -> Vec<u8> {
    let mut out = Vec::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.extend_from_slice(newline.as_str().as_bytes()),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
