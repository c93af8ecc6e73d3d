// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Immutable text snapshots and the edit notifications that carry them.

use std::ops::Range;
use std::sync::Arc;

use crate::core::lexical::floor_char_boundary;

/// Read access to one immutable version of a buffer.
pub trait TextSnapshot: Send + Sync {
    fn line_count(&self) -> usize;

    /// Text of line `n` without its terminator; empty past the end.
    fn line(&self, n: usize) -> &str;

    /// Bytes `[start, end)` of line `n`, clamped to the line.
    fn slice(&self, n: usize, start: usize, end: usize) -> &str {
        let line = self.line(n);
        let end = floor_char_boundary(line, end);
        let start = floor_char_boundary(line, start.min(end));
        &line[start..end]
    }
}

/// Line-split owned text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceText {
    lines: Vec<String>,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        Self {
            lines: split_lines(text),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// A copy with `line` replaced by `text`.
    pub fn with_line(&self, line: usize, text: &str) -> Self {
        let mut lines = self.lines.clone();
        if let Some(slot) = lines.get_mut(line) {
            *slot = text.to_string();
        }
        Self { lines }
    }

    /// A copy with `range` replaced by `replacement` lines.
    pub fn with_lines_replaced<S: AsRef<str>>(
        &self,
        range: Range<usize>,
        replacement: &[S],
    ) -> Self {
        let start = range.start.min(self.lines.len());
        let end = range.end.clamp(start, self.lines.len());
        let mut lines = self.lines.clone();
        lines.splice(start..end, replacement.iter().map(|text| text.as_ref().to_string()));
        Self { lines }
    }
}

impl TextSnapshot for SourceText {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, n: usize) -> &str {
        self.lines.get(n).map(String::as_str).unwrap_or_default()
    }
}

pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// One edit batch: the lines it touched in the new snapshot and the change in
/// line count.
#[derive(Clone)]
pub struct EditNotification {
    pub changed_lines: Range<usize>,
    pub line_count_delta: isize,
    pub snapshot: Arc<dyn TextSnapshot>,
}

impl EditNotification {
    pub fn new(
        changed_lines: Range<usize>,
        line_count_delta: isize,
        snapshot: Arc<dyn TextSnapshot>,
    ) -> Self {
        Self {
            changed_lines,
            line_count_delta,
            snapshot,
        }
    }

    /// Notification for in-place edits of `changed_lines`.
    pub fn lines_changed(changed_lines: Range<usize>, snapshot: Arc<dyn TextSnapshot>) -> Self {
        Self::new(changed_lines, 0, snapshot)
    }
}

impl std::fmt::Debug for EditNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditNotification")
            .field("changed_lines", &self.changed_lines)
            .field("line_count_delta", &self.line_count_delta)
            .field("line_count", &self.snapshot.line_count())
            .finish()
    }
}
