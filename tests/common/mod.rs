// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use asmlens::analysis::document::{AnalysisMode, DocumentAnalysis};
use asmlens::config::AnalysisConfig;
use asmlens::core::keywords::KeywordTable;
use asmlens::core::snapshot::{EditNotification, SourceText, TextSnapshot};

pub fn builtin_table() -> Arc<KeywordTable> {
    Arc::new(KeywordTable::builtin().expect("builtin keyword table"))
}

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("asmlens-{prefix}-{}-{now}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// An open document plus the text it was last told about.
pub struct Buffer {
    pub text: SourceText,
    pub analysis: DocumentAnalysis,
}

impl Buffer {
    pub fn open(text: &str) -> Self {
        Self::open_with(text, AnalysisConfig::default(), AnalysisMode::Immediate)
    }

    pub fn open_with(text: &str, config: AnalysisConfig, mode: AnalysisMode) -> Self {
        Self::open_with_table(text, builtin_table(), config, mode)
    }

    pub fn open_with_table(
        text: &str,
        table: Arc<KeywordTable>,
        config: AnalysisConfig,
        mode: AnalysisMode,
    ) -> Self {
        let text = SourceText::new(text);
        let snapshot: Arc<dyn TextSnapshot> = Arc::new(text.clone());
        let analysis = DocumentAnalysis::new(table, config, snapshot, mode);
        Self { text, analysis }
    }

    /// Overwrite one line in place.
    pub fn set_line(&mut self, line: usize, content: &str) {
        self.text = self.text.with_line(line, content);
        let snapshot: Arc<dyn TextSnapshot> = Arc::new(self.text.clone());
        self.analysis
            .apply_edit(EditNotification::lines_changed(line..line + 1, snapshot));
    }

    /// Replace `range` with `lines`, reporting the new span and line delta.
    pub fn replace_lines(&mut self, range: std::ops::Range<usize>, lines: &[&str]) {
        let before = self.text.line_count() as isize;
        self.text = self.text.with_lines_replaced(range.clone(), lines);
        let delta = self.text.line_count() as isize - before;
        let snapshot: Arc<dyn TextSnapshot> = Arc::new(self.text.clone());
        let changed = range.start..range.start + lines.len();
        self.analysis
            .apply_edit(EditNotification::new(changed, delta, snapshot));
    }

    /// Poll until background work settles or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            self.analysis.poll();
            if self.analysis.is_settled() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}
