// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line-level lexical conventions shared by the tokenizer, the label tracker
//! and the folding parser.
//!
//! All offsets are byte offsets into the line and always fall on character
//! boundaries.

/// Characters inspected on each side of a cursor by [`keyword_window`].
pub const KEYWORD_WINDOW: usize = 100;

const BASE_SEPARATORS: &[char] = &[',', '[', ']', '(', ')', '+', '-', '*', '{', '}', ':'];
const SPLIT_CHARS: &[char] = &[',', '+', '*', '[', ']'];
const DEFAULT_REMARK_MARKERS: &[char] = &['#', ';'];
const EXTERN_DIRECTIVES: &[&str] = &["EXTRN", "EXTERN"];

/// Remark markers and separator set in effect for one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    remark_markers: Vec<char>,
    extra_separators: Vec<char>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            remark_markers: DEFAULT_REMARK_MARKERS.to_vec(),
            extra_separators: Vec::new(),
        }
    }
}

impl Conventions {
    /// Conventions using `markers` as the remark set. An empty set keeps the
    /// default `#` and `;`.
    pub fn with_remark_markers(markers: impl IntoIterator<Item = char>) -> Self {
        let mut remark_markers: Vec<char> = markers
            .into_iter()
            .filter(|c| !c.is_whitespace())
            .collect();
        remark_markers.sort_unstable();
        remark_markers.dedup();
        if remark_markers.is_empty() {
            return Self::default();
        }
        Self {
            remark_markers,
            extra_separators: Vec::new(),
        }
    }

    pub fn with_extra_separators(mut self, separators: impl IntoIterator<Item = char>) -> Self {
        self.extra_separators.extend(separators);
        self
    }

    pub fn remark_markers(&self) -> &[char] {
        &self.remark_markers
    }

    pub fn is_separator(&self, c: char) -> bool {
        c.is_whitespace() || BASE_SEPARATORS.contains(&c) || self.extra_separators.contains(&c)
    }

    pub fn is_remark_start(&self, c: char) -> bool {
        self.remark_markers.contains(&c)
    }

    fn is_keyword_boundary(&self, c: char) -> bool {
        self.is_separator(c) || c.is_control() || self.is_remark_start(c)
    }

    /// Span of the label defined on `line`, if any.
    ///
    /// The first keyword is a label when it is terminated by `:`. A remark
    /// before the colon, a quote inside the keyword, or any other terminator
    /// means the line defines nothing. The MASM forms `EXTRN name:type` and
    /// `EXTERN name:type` define `name`.
    pub fn find_label_span(&self, line: &str) -> Option<(usize, usize)> {
        let start = self.first_keyword_start(line, 0)?;
        match self.label_ending_at_colon(line, start) {
            LabelScan::Label(span) => Some(span),
            LabelScan::NoLabel => None,
            LabelScan::Keyword(end) => {
                let keyword = &line[start..end];
                let is_extern = EXTERN_DIRECTIVES
                    .iter()
                    .any(|directive| keyword.eq_ignore_ascii_case(directive));
                let followed_by_space = line[end..].starts_with(char::is_whitespace);
                if !is_extern || !followed_by_space {
                    return None;
                }
                let name_start = self.first_keyword_start(line, end)?;
                match self.label_ending_at_colon(line, name_start) {
                    LabelScan::Label(span) => Some(span),
                    _ => None,
                }
            }
        }
    }

    fn first_keyword_start(&self, line: &str, from: usize) -> Option<usize> {
        for (idx, c) in line[from..].char_indices() {
            if self.is_remark_start(c) {
                return None;
            }
            if !c.is_whitespace() {
                return Some(from + idx);
            }
        }
        None
    }

    fn label_ending_at_colon(&self, line: &str, start: usize) -> LabelScan {
        for (idx, c) in line[start..].char_indices() {
            let pos = start + idx;
            if c == '"' || self.is_remark_start(c) {
                return LabelScan::NoLabel;
            }
            if self.is_separator(c) {
                return match c {
                    ':' if pos > start => LabelScan::Label((start, pos)),
                    _ if c.is_whitespace() && pos > start => LabelScan::Keyword(pos),
                    _ => LabelScan::NoLabel,
                };
            }
        }
        LabelScan::NoLabel
    }

    /// Bounds of the keyword around `cursor`. The cursor is clamped to the
    /// line; the result is empty when it sits on a boundary character.
    pub fn find_keyword_bounds(&self, text: &str, cursor: usize) -> (usize, usize) {
        let cursor = floor_char_boundary(text, cursor);
        let start = text[..cursor]
            .char_indices()
            .rev()
            .find(|&(_, c)| self.is_keyword_boundary(c))
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        let end = text[cursor..]
            .char_indices()
            .find(|&(_, c)| self.is_keyword_boundary(c))
            .map_or(text.len(), |(idx, _)| cursor + idx);
        (start, end)
    }

    /// The keyword text under `pos`, or `None` on a boundary.
    pub fn keyword_at<'a>(&self, pos: usize, line: &'a str) -> Option<&'a str> {
        let (start, end) = self.find_keyword_bounds(line, pos);
        (end > start).then(|| &line[start..end])
    }

    /// Offset of the first remark marker on `line`.
    pub fn remark_pos(&self, line: &str) -> Option<usize> {
        line.char_indices()
            .find(|&(_, c)| self.is_remark_start(c))
            .map(|(idx, _)| idx)
    }

    /// True when the first non-whitespace character starts a remark.
    pub fn is_remark_only(&self, line: &str) -> bool {
        line.chars()
            .find(|c| !c.is_whitespace())
            .is_some_and(|c| self.is_remark_start(c))
    }

    /// True when a remark marker occurs at or before `pos`.
    pub fn is_in_remark(&self, pos: usize, line: &str) -> bool {
        self.remark_pos(line).is_some_and(|marker| marker <= pos)
    }

    /// Span of the keyword preceding the one that contains `end`, searching
    /// no further left than `begin`.
    pub fn previous_keyword(&self, begin: usize, end: usize, line: &str) -> Option<(usize, usize)> {
        let end = floor_char_boundary(line, end);
        let begin = floor_char_boundary(line, begin.min(end));
        if begin >= end {
            return None;
        }
        // The character at `end` belongs to the current keyword when present.
        let scan_end = line[end..].chars().next().map_or(end, |c| end + c.len_utf8());
        let mut chars = line[begin..scan_end]
            .char_indices()
            .rev()
            .map(|(idx, c)| (begin + idx, c));

        // Skip the current keyword up to and including its separator.
        chars.by_ref().find(|&(_, c)| self.is_separator(c))?;
        let (last_idx, last) = chars.by_ref().find(|&(_, c)| !self.is_separator(c))?;
        let kw_end = last_idx + last.len_utf8();
        let mut kw_start = last_idx;
        for (idx, c) in chars {
            if self.is_separator(c) {
                break;
            }
            kw_start = idx;
        }
        Some((kw_start, kw_end))
    }
}

enum LabelScan {
    Label((usize, usize)),
    Keyword(usize),
    NoLabel,
}

/// Characters the tokenizer splits a line on.
pub fn is_split_char(c: char) -> bool {
    c.is_whitespace() || SPLIT_CHARS.contains(&c)
}

/// A slice of at most [`KEYWORD_WINDOW`] characters either side of `cursor`,
/// with the byte offset of its first character in `text`.
pub fn keyword_window(text: &str, cursor: usize) -> (usize, &str) {
    let cursor = floor_char_boundary(text, cursor);
    let start = text[..cursor]
        .char_indices()
        .rev()
        .take(KEYWORD_WINDOW)
        .last()
        .map_or(cursor, |(idx, _)| idx);
    let end = text[cursor..]
        .char_indices()
        .nth(KEYWORD_WINDOW)
        .map_or(text.len(), |(idx, _)| cursor + idx);
    (start, &text[start..end])
}

pub(crate) fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
