// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Label definition/use index and the tracker keeping it current under edits.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::analysis::diagnostics::{
    Component, DiagnosticKind, LabelDiagnostic, Notice, NoticeKind,
};
use crate::analysis::scheduler::{CancellationToken, Published};
use crate::analysis::SpeedLimits;
use crate::core::snapshot::{EditNotification, TextSnapshot};
use crate::core::tokenizer::{LineTokenizer, Token, TokenKind};

/// A label definition or use within one line. `name` is the key the index
/// files it under: a local label `.x` below `parent:` is keyed `parent.x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSite {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineLabels {
    defs: Vec<LabelSite>,
    uses: Vec<LabelSite>,
    /// Last non-local label defined on the line; parent of the local labels
    /// that follow it.
    opens: Option<String>,
}

impl LineLabels {
    fn scan(tokenizer: &LineTokenizer, line: &str, parent: &mut Option<String>) -> Self {
        let mut record = Self::default();
        for token in tokenizer.label_tokens(line) {
            let text = token.text(line);
            let name = match parent.as_deref() {
                Some(parent) if is_local_label(text) => format!("{parent}{text}"),
                _ => text.to_string(),
            };
            let site = LabelSite {
                name,
                start: token.start,
                end: token.end,
            };
            match token.kind {
                TokenKind::LabelDef => {
                    if !is_local_label(text) {
                        *parent = Some(text.to_string());
                        record.opens = Some(text.to_string());
                    }
                    record.defs.push(site);
                }
                _ => record.uses.push(site),
            }
        }
        record
    }

    fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.uses.is_empty()
    }

    fn site_at(&self, start: usize) -> Option<&LabelSite> {
        self.defs
            .iter()
            .chain(self.uses.iter())
            .find(|site| site.start == start)
    }
}

/// NASM local label: scoped to the closest non-local label above it.
fn is_local_label(name: &str) -> bool {
    name.len() > 1 && name.starts_with('.')
}

/// Immutable generation of the label index for one buffer.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    defs: HashMap<String, BTreeSet<usize>>,
    uses: HashMap<String, BTreeSet<usize>>,
    lines: BTreeMap<usize, LineLabels>,
    line_count: usize,
}

impl LabelIndex {
    /// Scan every line of `snapshot`. Returns `None` when `cancel` fires.
    pub fn build(
        snapshot: &dyn TextSnapshot,
        tokenizer: &LineTokenizer,
        cancel: &CancellationToken,
    ) -> Option<Self> {
        let line_count = snapshot.line_count();
        let mut index = Self {
            line_count,
            ..Self::default()
        };
        let mut parent = None;
        for line in 0..line_count {
            if cancel.cancelled_at(line) {
                return None;
            }
            let record = LineLabels::scan(tokenizer, snapshot.line(line), &mut parent);
            index.insert_line(line, record);
        }
        Some(index)
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    fn insert_line(&mut self, line: usize, record: LineLabels) {
        if record.is_empty() {
            return;
        }
        for site in &record.defs {
            self.defs.entry(site.name.clone()).or_default().insert(line);
        }
        for site in &record.uses {
            self.uses.entry(site.name.clone()).or_default().insert(line);
        }
        self.lines.insert(line, record);
    }

    fn remove_line(&mut self, line: usize) -> Option<LineLabels> {
        let record = self.lines.remove(&line)?;
        for site in &record.defs {
            remove_site(&mut self.defs, &site.name, line);
        }
        for site in &record.uses {
            remove_site(&mut self.uses, &site.name, line);
        }
        Some(record)
    }

    /// The label local labels on `line` are scoped to.
    fn parent_before(&self, line: usize) -> Option<String> {
        self.lines
            .range(..line)
            .rev()
            .find_map(|(_, record)| record.opens.clone())
    }

    /// Re-scan `lines` in place against `snapshot`, whose line count must
    /// match the indexed one. A changed parent label re-keys every local
    /// label below it, so that case rescans the whole snapshot.
    fn update_lines(
        &mut self,
        lines: std::ops::Range<usize>,
        snapshot: &dyn TextSnapshot,
        tokenizer: &LineTokenizer,
    ) {
        let end = lines.end.min(self.line_count);
        for line in lines.start.min(end)..end {
            let mut parent = self.parent_before(line);
            let record = LineLabels::scan(tokenizer, snapshot.line(line), &mut parent);
            let old = self.remove_line(line).unwrap_or_default();
            if old.opens != record.opens {
                debug!(line, "parent label changed; rescanning");
                if let Some(index) = Self::build(snapshot, tokenizer, &CancellationToken::never()) {
                    *self = index;
                }
                return;
            }
            self.insert_line(line, record);
        }
    }

    pub fn def_lines(&self, name: &str) -> Option<&BTreeSet<usize>> {
        self.defs.get(name)
    }

    pub fn used_at(&self, name: &str) -> Option<&BTreeSet<usize>> {
        self.uses.get(name)
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn has_clash(&self, name: &str) -> bool {
        self.defs.get(name).is_some_and(|lines| lines.len() > 1)
    }

    pub fn query(&self, kind: TokenKind, name: &str) -> DiagnosticKind {
        match kind {
            TokenKind::LabelUse if !self.has_label(name) => DiagnosticKind::Undefined,
            TokenKind::LabelDef if self.has_clash(name) => DiagnosticKind::Clash,
            _ => DiagnosticKind::Ok,
        }
    }

    /// Verdict for the label `token` on `line`, resolving local labels
    /// against the parent they were indexed under.
    pub fn query_token(&self, line: usize, token: &Token, text: &str) -> DiagnosticKind {
        let name = self
            .lines
            .get(&line)
            .and_then(|record| record.site_at(token.start))
            .map_or(token.text(text), |site| site.name.as_str());
        self.query(token.kind, name)
    }

    /// Names defined on more than one line.
    pub fn clashes(&self) -> BTreeMap<&str, &BTreeSet<usize>> {
        self.defs
            .iter()
            .filter(|(_, lines)| lines.len() > 1)
            .map(|(name, lines)| (name.as_str(), lines))
            .collect()
    }

    /// Names used but never defined, with their use lines.
    pub fn undefined(&self) -> BTreeMap<&str, &BTreeSet<usize>> {
        self.uses
            .iter()
            .filter(|(name, _)| !self.defs.contains_key(name.as_str()))
            .map(|(name, lines)| (name.as_str(), lines))
            .collect()
    }

    /// Every line carrying a label definition or use.
    pub fn related_lines(&self) -> BTreeSet<usize> {
        self.lines.keys().copied().collect()
    }

    /// Per defined name, its defining lines rendered as `LINE n: text`
    /// (1-based), one per line.
    pub fn label_descriptions(&self, snapshot: &dyn TextSnapshot) -> BTreeMap<String, String> {
        self.defs
            .iter()
            .map(|(name, lines)| {
                let description = lines
                    .iter()
                    .map(|&line| format!("LINE {}: {}", line + 1, snapshot.line(line).trim()))
                    .collect::<Vec<_>>()
                    .join("\n");
                (name.clone(), description)
            })
            .collect()
    }

    /// Clash and undefined-use diagnostics for lines below `line_limit`,
    /// ordered by line.
    pub fn diagnostics(&self, line_limit: usize) -> Vec<LabelDiagnostic> {
        let mut out = Vec::new();
        for (&line, record) in self.lines.range(..line_limit) {
            let sites = record
                .defs
                .iter()
                .map(|site| (site, TokenKind::LabelDef))
                .chain(record.uses.iter().map(|site| (site, TokenKind::LabelUse)));
            for (site, kind) in sites {
                let verdict = self.query(kind, &site.name);
                if verdict != DiagnosticKind::Ok {
                    out.push(LabelDiagnostic {
                        line,
                        name: site.name.clone(),
                        kind: verdict,
                        start: site.start,
                        end: site.end,
                    });
                }
            }
        }
        out.sort_by_key(|diag| (diag.line, diag.start));
        out
    }
}

fn remove_site(map: &mut HashMap<String, BTreeSet<usize>>, name: &str, line: usize) {
    if let Some(lines) = map.get_mut(name) {
        lines.remove(&line);
        if lines.is_empty() {
            map.remove(name);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    Enabled,
    /// Switched off after a slow rebuild; only a reset re-enables it.
    Disabled,
}

pub struct LabelTracker {
    tokenizer: LineTokenizer,
    limits: SpeedLimits,
    index: Published<LabelIndex>,
    status: TrackerStatus,
    notices: Vec<Notice>,
}

impl LabelTracker {
    pub fn new(tokenizer: LineTokenizer, limits: SpeedLimits) -> Self {
        Self {
            tokenizer,
            limits,
            index: Published::new(LabelIndex::default()),
            status: TrackerStatus::Enabled,
            notices: Vec::new(),
        }
    }

    pub fn with_snapshot(
        tokenizer: LineTokenizer,
        limits: SpeedLimits,
        snapshot: &dyn TextSnapshot,
    ) -> Self {
        let mut tracker = Self::new(tokenizer, limits);
        tracker.rebuild(snapshot);
        tracker
    }

    pub fn tokenizer(&self) -> &LineTokenizer {
        &self.tokenizer
    }

    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status == TrackerStatus::Enabled
    }

    /// The current index generation.
    pub fn index(&self) -> Arc<LabelIndex> {
        self.index.load()
    }

    /// A handle readers on other threads can load the index from.
    pub fn published(&self) -> Published<LabelIndex> {
        self.index.clone()
    }

    /// Full scan of `snapshot`, replacing the index.
    pub fn rebuild(&mut self, snapshot: &dyn TextSnapshot) {
        if !self.is_enabled() {
            return;
        }
        let started = Instant::now();
        let cancel = CancellationToken::never();
        let Some(index) = LabelIndex::build(snapshot, &self.tokenizer, &cancel) else {
            return;
        };
        self.install(index, started.elapsed());
    }

    /// Swap in an index built elsewhere, applying the speed limits to the
    /// time it took.
    pub fn install(&mut self, index: LabelIndex, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        debug!(
            lines = index.line_count(),
            labels = index.defs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "label index rebuilt"
        );
        self.index.store(Arc::new(index));
        self.check_elapsed(elapsed);
    }

    pub fn on_edit(&mut self, edit: &EditNotification) {
        if !self.is_enabled() {
            return;
        }
        let snapshot = edit.snapshot.as_ref();
        let current = self.index.load();
        if edit.line_count_delta != 0 || current.line_count() != snapshot.line_count() {
            self.rebuild(snapshot);
            return;
        }
        let started = Instant::now();
        let mut next = LabelIndex::clone(&current);
        next.update_lines(edit.changed_lines.clone(), snapshot, &self.tokenizer);
        self.index.store(Arc::new(next));
        self.check_elapsed(started.elapsed());
    }

    /// Verdict for a label token on line `line` with content `text`; `Ok`
    /// while disabled.
    pub fn query(&self, line: usize, token: &Token, text: &str) -> DiagnosticKind {
        if !self.is_enabled() {
            return DiagnosticKind::Ok;
        }
        self.index.load().query_token(line, token, text)
    }

    pub fn diagnostics(&self, line_count: usize) -> Vec<LabelDiagnostic> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.index.load().diagnostics(line_count)
    }

    /// Re-enable after a trip and rebuild from `snapshot`.
    pub fn reset(&mut self, snapshot: &dyn TextSnapshot) {
        info!("label tracker reset");
        self.status = TrackerStatus::Enabled;
        self.index.store(Arc::new(LabelIndex::default()));
        self.rebuild(snapshot);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn check_elapsed(&mut self, elapsed: Duration) {
        if elapsed > self.limits.slow_threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.limits.slow_threshold.as_millis() as u64,
                "label analysis too slow; disabling for this document"
            );
            self.status = TrackerStatus::Disabled;
            self.index.store(Arc::new(LabelIndex::default()));
            self.notices.push(Notice::new(
                NoticeKind::PerformanceExceeded,
                Component::Labels,
                format!(
                    "label analysis took {:.1}s and was switched off for this document",
                    elapsed.as_secs_f64()
                ),
            ));
        } else if elapsed > self.limits.slow_warning {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "slow label analysis");
        }
    }
}
