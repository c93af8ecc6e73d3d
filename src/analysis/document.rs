// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-document owner of the tokenizer, label tracker and folding tracker.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::analysis::diagnostics::{
    dedup_diagnostics, Component, DiagnosticKind, LabelDiagnostic, Notice, NoticeKind,
};
use crate::analysis::folding::{
    FoldingStatus, FoldingTracker, RegionDelta, RegionDescriptor, RegionSet,
};
use crate::analysis::labels::{LabelIndex, LabelTracker, TrackerStatus};
use crate::analysis::scheduler::{DebouncedWorker, Published};
use crate::analysis::SpeedLimits;
use crate::config::AnalysisConfig;
use crate::core::keywords::KeywordTable;
use crate::core::snapshot::{EditNotification, TextSnapshot};
use crate::core::tokenizer::{LineTokenizer, Token};

/// How heavier recomputations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Everything runs on the calling thread before `apply_edit` returns.
    Immediate,
    /// Rebuilds and folding run on a debounced background worker; results
    /// are picked up by `poll` or forced with `flush`.
    Debounced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub line: usize,
    pub tokens: Vec<Token>,
}

pub struct DocumentAnalysis {
    config: AnalysisConfig,
    mode: AnalysisMode,
    limits: SpeedLimits,
    snapshot: Arc<dyn TextSnapshot>,
    tokenizer: LineTokenizer,
    labels: LabelTracker,
    folding: FoldingTracker,
    label_worker: DebouncedWorker<LabelIndex>,
    fold_worker: DebouncedWorker<RegionSet>,
    notices: Vec<Notice>,
}

impl DocumentAnalysis {
    /// Open a document: the label index and regions are computed before this
    /// returns, whatever the mode.
    pub fn new(
        table: Arc<KeywordTable>,
        config: AnalysisConfig,
        snapshot: Arc<dyn TextSnapshot>,
        mode: AnalysisMode,
    ) -> Self {
        let mut notices = Vec::new();
        if let Some(reason) = table.degraded_reason() {
            notices.push(Notice::new(
                NoticeKind::DataUnavailable,
                Component::Keywords,
                format!("keyword data unavailable, highlighting is limited: {reason}"),
            ));
        }
        let limits = config.speed_limits();
        let tokenizer = LineTokenizer::new(table, config.conventions());
        let mut labels = LabelTracker::new(tokenizer.clone(), limits);
        if config.labels_enabled {
            labels.rebuild(snapshot.as_ref());
        }
        let mut folding = FoldingTracker::new(
            tokenizer.clone(),
            config.folding_rules(),
            limits,
            config.folding.enabled,
        );
        folding.recompute(snapshot.as_ref());
        info!(
            lines = snapshot.line_count(),
            dialect = config.dialect.as_str(),
            mode = ?mode,
            "document opened"
        );

        let debounce = config.debounce();
        Self {
            config,
            mode,
            limits,
            snapshot,
            tokenizer,
            labels,
            folding,
            label_worker: DebouncedWorker::new("labels", debounce),
            fold_worker: DebouncedWorker::new("folding", debounce),
            notices,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn snapshot(&self) -> Arc<dyn TextSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn tokenizer(&self) -> &LineTokenizer {
        &self.tokenizer
    }

    pub fn apply_edit(&mut self, edit: EditNotification) {
        debug!(
            changed = ?edit.changed_lines,
            delta = edit.line_count_delta,
            lines = edit.snapshot.line_count(),
            "edit"
        );
        self.snapshot = Arc::clone(&edit.snapshot);

        if self.config.labels_enabled && self.labels.is_enabled() {
            match self.mode {
                AnalysisMode::Immediate => self.labels.on_edit(&edit),
                AnalysisMode::Debounced => {
                    // While a rebuild is queued the installed index is stale,
                    // so in-place updates would land on shifted lines.
                    if edit.line_count_delta != 0 || self.label_worker.is_pending() {
                        self.schedule_label_rebuild();
                    } else {
                        self.labels.on_edit(&edit);
                    }
                }
            }
        }

        match self.mode {
            AnalysisMode::Immediate => self.folding.recompute(self.snapshot.as_ref()),
            AnalysisMode::Debounced => self.schedule_folding(),
        }
    }

    fn schedule_label_rebuild(&mut self) {
        let snapshot = Arc::clone(&self.snapshot);
        let tokenizer = self.tokenizer.clone();
        self.label_worker
            .submit(move |cancel| LabelIndex::build(snapshot.as_ref(), &tokenizer, cancel));
    }

    fn schedule_folding(&mut self) {
        if !self.folding.admit(self.snapshot.as_ref()) {
            self.fold_worker.cancel();
            return;
        }
        let snapshot = Arc::clone(&self.snapshot);
        let job = self.folding.job();
        self.fold_worker
            .submit(move |cancel| job.run(snapshot.as_ref(), cancel));
    }

    /// Install any finished background results. Returns true when a new
    /// generation was swapped in.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        if let Some(result) = self.label_worker.drain() {
            self.labels.install(result.value, result.elapsed);
            changed = true;
        }
        if let Some(result) = self.fold_worker.drain() {
            self.folding.install(result.value, result.elapsed);
            changed = true;
        }
        changed
    }

    /// Finish pending work on the calling thread.
    pub fn flush(&mut self) {
        self.poll();
        if self.label_worker.is_pending() {
            self.label_worker.cancel();
            self.labels.rebuild(self.snapshot.as_ref());
        }
        if self.fold_worker.is_pending() {
            self.fold_worker.cancel();
            self.folding.recompute(self.snapshot.as_ref());
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.label_worker.is_pending() && !self.fold_worker.is_pending()
    }

    /// Tokens for `lines`, clamped to the snapshot.
    pub fn tokens_for_range(&self, lines: Range<usize>) -> Vec<LineTokens> {
        let started = Instant::now();
        let end = lines.end.min(self.snapshot.line_count());
        let out: Vec<LineTokens> = (lines.start.min(end)..end)
            .map(|line| LineTokens {
                line,
                tokens: self.tokenizer.tokenize(self.snapshot.line(line)),
            })
            .collect();
        let elapsed = started.elapsed();
        if elapsed > self.limits.slow_warning {
            warn!(lines = out.len(), elapsed_ms = elapsed.as_millis() as u64, "slow tokenization");
        }
        out
    }

    /// Tokens of one line intersecting the byte range `[start, end)`.
    pub fn tokens_for_line(&self, line: usize, start: usize, end: usize) -> Vec<Token> {
        if line >= self.snapshot.line_count() {
            return Vec::new();
        }
        self.tokenizer
            .tokenize_range(self.snapshot.line(line), start, end)
    }

    /// Verdict for a label token on `line`.
    pub fn query(&self, line: usize, token: &Token) -> DiagnosticKind {
        if !self.config.labels_enabled || line >= self.snapshot.line_count() {
            return DiagnosticKind::Ok;
        }
        self.labels.query(line, token, self.snapshot.line(line))
    }

    pub fn label_diagnostics(&self) -> Vec<LabelDiagnostic> {
        if !self.config.labels_enabled {
            return Vec::new();
        }
        dedup_diagnostics(self.labels.diagnostics(self.snapshot.line_count()))
    }

    pub fn label_index(&self) -> Arc<LabelIndex> {
        self.labels.index()
    }

    pub fn label_descriptions(&self) -> std::collections::BTreeMap<String, String> {
        self.labels.index().label_descriptions(self.snapshot.as_ref())
    }

    pub fn regions(&self) -> Arc<RegionSet> {
        self.folding.regions()
    }

    pub fn region_descriptors(&self) -> Vec<RegionDescriptor> {
        self.folding.regions().descriptors.clone()
    }

    /// Handle for readers on other threads.
    pub fn published_regions(&self) -> Published<RegionSet> {
        self.folding.published()
    }

    pub fn published_labels(&self) -> Published<LabelIndex> {
        self.labels.published()
    }

    pub fn region_delta(&self) -> Option<RegionDelta> {
        self.folding.last_delta()
    }

    pub fn label_status(&self) -> TrackerStatus {
        self.labels.status()
    }

    pub fn folding_status(&self) -> FoldingStatus {
        self.folding.status()
    }

    /// Notices raised since the last call; each condition is reported once.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        let mut out = std::mem::take(&mut self.notices);
        out.extend(self.labels.take_notices());
        out.extend(self.folding.take_notices());
        out
    }

    /// Re-enable analyses switched off by a breaker and recompute.
    pub fn reset(&mut self) {
        info!("document analysis reset");
        self.label_worker.cancel();
        self.fold_worker.cancel();
        if self.config.labels_enabled {
            self.labels.reset(self.snapshot.as_ref());
        }
        self.folding
            .reset(self.snapshot.as_ref(), self.config.folding.enabled);
    }
}
