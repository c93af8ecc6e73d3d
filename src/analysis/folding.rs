// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Nested foldable regions.
//!
//! Each line is tested against three rules in order: the literal begin/end
//! tags, the dialect's structural directives, and runs of remark-only lines.
//! Open regions live on a plain stack while scanning; anything still open at
//! the end of the buffer is dropped without producing a region.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::analysis::diagnostics::{Component, Notice, NoticeKind};
use crate::analysis::scheduler::{CancellationToken, Published};
use crate::analysis::SpeedLimits;
use crate::core::dialect::Dialect;
use crate::core::snapshot::TextSnapshot;
use crate::core::tokenizer::{LineTokenizer, TokenKind};

pub const MAX_PREVIEW_LINES: usize = 40;

/// Largest level a tag may request; larger or zero hints are ignored.
pub const MAX_LEVEL_HINT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingRules {
    pub begin_tag: String,
    pub end_tag: String,
    pub dialect: Dialect,
    pub max_fold_lines: usize,
    pub default_collapsed: bool,
}

impl Default for FoldingRules {
    fn default() -> Self {
        Self {
            begin_tag: "#region".to_string(),
            end_tag: "#endregion".to_string(),
            dialect: Dialect::Masm,
            max_fold_lines: 100_000,
            default_collapsed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub level: usize,
    pub start_line: usize,
    pub start_offset: usize,
    pub start_offset_for_preview: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub level: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub start_offset_for_preview: usize,
    pub description: String,
    pub preview: String,
    pub default_collapsed: bool,
}

impl RegionDescriptor {
    pub fn describe(region: &Region, snapshot: &dyn TextSnapshot, default_collapsed: bool) -> Self {
        let first = snapshot.line(region.start_line);
        let remainder = first
            .get(region.start_offset_for_preview..)
            .map(str::trim)
            .unwrap_or_default();
        let description = if remainder.is_empty() {
            first.trim().to_string()
        } else {
            remainder.to_string()
        };
        let preview_end = region.end_line.min(snapshot.line_count().saturating_sub(1));
        let preview = (region.start_line + 1..=preview_end)
            .take(MAX_PREVIEW_LINES)
            .map(|line| snapshot.line(line))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            level: region.level,
            start_line: region.start_line,
            end_line: region.end_line,
            start_offset: region.start_offset,
            start_offset_for_preview: region.start_offset_for_preview,
            description,
            preview,
            default_collapsed,
        }
    }
}

/// One published generation of regions.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    pub regions: Vec<Region>,
    pub descriptors: Vec<RegionDescriptor>,
}

impl RegionSet {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

/// Lines touched between two region generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDelta {
    pub start_line: usize,
    pub end_line: usize,
}

/// Span covering every region present in only one of `old` and `new`.
pub fn changed_span(old: &[Region], new: &[Region]) -> Option<RegionDelta> {
    let removed = old.iter().filter(|region| !new.contains(region));
    let added = new.iter().filter(|region| !old.contains(region));
    removed.chain(added).fold(None, |span, region| {
        Some(match span {
            None => RegionDelta {
                start_line: region.start_line,
                end_line: region.end_line,
            },
            Some(RegionDelta { start_line, end_line }) => RegionDelta {
                start_line: start_line.min(region.start_line),
                end_line: end_line.max(region.end_line),
            },
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEvent {
    Open {
        level: Option<usize>,
        offset: usize,
        preview_offset: usize,
    },
    Close {
        level: Option<usize>,
    },
    Remark {
        offset: usize,
    },
    Plain,
}

#[derive(Debug, Clone, Copy)]
struct PartialRegion {
    level: usize,
    start_line: usize,
    start_offset: usize,
    start_offset_for_preview: usize,
}

#[derive(Debug, Clone, Copy)]
struct RemarkRun {
    start_line: usize,
    end_line: usize,
    offset: usize,
}

#[derive(Default)]
struct RegionBuilder {
    stack: Vec<PartialRegion>,
    run: Option<RemarkRun>,
    regions: Vec<Region>,
}

impl RegionBuilder {
    fn current_level(&self) -> usize {
        self.stack.last().map_or(0, |open| open.level)
    }

    fn open(&mut self, line: usize, hint: Option<usize>, offset: usize, preview_offset: usize) {
        let level = hint.unwrap_or(self.current_level().saturating_add(1));
        if self.stack.last().is_some_and(|open| open.level == level) {
            // Same level: the open region ends here and a sibling starts.
            self.pop_into_region(line);
        }
        self.stack.push(PartialRegion {
            level,
            start_line: line,
            start_offset: offset,
            start_offset_for_preview: preview_offset,
        });
    }

    fn close(&mut self, line: usize, hint: Option<usize>) {
        let Some(top) = self.stack.last() else {
            return;
        };
        if hint.unwrap_or(top.level) == top.level {
            self.pop_into_region(line);
        }
    }

    fn pop_into_region(&mut self, end_line: usize) {
        if let Some(open) = self.stack.pop() {
            self.regions.push(Region {
                level: open.level,
                start_line: open.start_line,
                start_offset: open.start_offset,
                start_offset_for_preview: open.start_offset_for_preview,
                end_line,
            });
        }
    }

    fn remark(&mut self, line: usize, offset: usize) {
        match &mut self.run {
            Some(run) => run.end_line = line,
            None => {
                self.run = Some(RemarkRun {
                    start_line: line,
                    end_line: line,
                    offset,
                })
            }
        }
    }

    fn end_remark_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        if run.end_line > run.start_line {
            self.regions.push(Region {
                level: self.current_level().saturating_add(1),
                start_line: run.start_line,
                start_offset: run.offset,
                start_offset_for_preview: run.offset,
                end_line: run.end_line,
            });
        }
    }

    fn finish(mut self) -> Vec<Region> {
        self.end_remark_run();
        // Unterminated regions produce no fold.
        self.stack.clear();
        self.regions
            .sort_by_key(|region| (region.start_line, region.level, region.end_line));
        self.regions
    }
}

/// Everything a background thread needs to scan one snapshot.
#[derive(Debug, Clone)]
pub struct FoldingJob {
    tokenizer: LineTokenizer,
    rules: FoldingRules,
}

impl FoldingJob {
    pub fn new(tokenizer: LineTokenizer, rules: FoldingRules) -> Self {
        Self { tokenizer, rules }
    }

    /// Scan `snapshot` into regions; `None` when cancelled.
    pub fn parse_regions(
        &self,
        snapshot: &dyn TextSnapshot,
        cancel: &CancellationToken,
    ) -> Option<Vec<Region>> {
        let mut builder = RegionBuilder::default();
        for line in 0..snapshot.line_count() {
            if cancel.cancelled_at(line) {
                return None;
            }
            let event = self.classify_line(snapshot.line(line));
            if !matches!(event, LineEvent::Remark { .. }) {
                builder.end_remark_run();
            }
            match event {
                LineEvent::Open {
                    level,
                    offset,
                    preview_offset,
                } => builder.open(line, level, offset, preview_offset),
                LineEvent::Close { level } => builder.close(line, level),
                LineEvent::Remark { offset } => builder.remark(line, offset),
                LineEvent::Plain => {}
            }
        }
        Some(builder.finish())
    }

    /// Parse and describe `snapshot` as one region generation.
    pub fn run(
        &self,
        snapshot: &dyn TextSnapshot,
        cancel: &CancellationToken,
    ) -> Option<RegionSet> {
        let regions = self.parse_regions(snapshot, cancel)?;
        let descriptors = regions
            .iter()
            .map(|region| {
                RegionDescriptor::describe(region, snapshot, self.rules.default_collapsed)
            })
            .collect();
        Some(RegionSet { regions, descriptors })
    }

    fn classify_line(&self, text: &str) -> LineEvent {
        if let Some(event) = self.match_tags(text) {
            return event;
        }
        let conventions = self.tokenizer.conventions();
        if conventions.is_remark_only(text) {
            let offset = conventions.remark_pos(text).unwrap_or_default();
            return LineEvent::Remark { offset };
        }
        let dialect = self.rules.dialect;
        for token in self.tokenizer.tokenize(text) {
            if token.kind != TokenKind::Directive {
                continue;
            }
            let keyword = token.text(text);
            if dialect.opens_region(keyword) {
                return LineEvent::Open {
                    level: None,
                    offset: token.start,
                    preview_offset: token.end,
                };
            }
            if dialect.closes_region(keyword) {
                return LineEvent::Close { level: None };
            }
        }
        LineEvent::Plain
    }

    fn match_tags(&self, text: &str) -> Option<LineEvent> {
        let lowered = text.to_ascii_lowercase();
        let begin = self.rules.begin_tag.to_ascii_lowercase();
        let end = self.rules.end_tag.to_ascii_lowercase();
        // Longer tag first: with tags like `region`/`endregion` one contains
        // the other.
        let begin_first = begin.len() >= end.len();
        let order: [(bool, &str); 2] = if begin_first {
            [(true, begin.as_str()), (false, end.as_str())]
        } else {
            [(false, end.as_str()), (true, begin.as_str())]
        };
        for (is_begin, tag) in order {
            if tag.is_empty() {
                continue;
            }
            let Some(offset) = lowered.find(tag) else {
                continue;
            };
            let after_tag = offset + tag.len();
            let digits = text[after_tag..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            let level = text[after_tag..after_tag + digits]
                .parse::<usize>()
                .ok()
                .filter(|level| (1..=MAX_LEVEL_HINT).contains(level));
            return Some(if is_begin {
                LineEvent::Open {
                    level,
                    offset,
                    preview_offset: after_tag + digits,
                }
            } else {
                LineEvent::Close { level }
            });
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldingStatus {
    Enabled,
    /// Disabled by configuration.
    Off,
    /// The buffer exceeded the line ceiling.
    TooLarge,
    /// A recomputation exceeded the slow threshold.
    TooSlow,
}

pub struct FoldingTracker {
    job: FoldingJob,
    limits: SpeedLimits,
    regions: Published<RegionSet>,
    status: FoldingStatus,
    last_delta: Option<RegionDelta>,
    notices: Vec<Notice>,
}

impl FoldingTracker {
    pub fn new(
        tokenizer: LineTokenizer,
        rules: FoldingRules,
        limits: SpeedLimits,
        enabled: bool,
    ) -> Self {
        Self {
            job: FoldingJob::new(tokenizer, rules),
            limits,
            regions: Published::new(RegionSet::default()),
            status: if enabled {
                FoldingStatus::Enabled
            } else {
                FoldingStatus::Off
            },
            last_delta: None,
            notices: Vec::new(),
        }
    }

    pub fn status(&self) -> FoldingStatus {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status == FoldingStatus::Enabled
    }

    pub fn rules(&self) -> &FoldingRules {
        &self.job.rules
    }

    pub fn job(&self) -> FoldingJob {
        self.job.clone()
    }

    pub fn regions(&self) -> Arc<RegionSet> {
        self.regions.load()
    }

    pub fn published(&self) -> Published<RegionSet> {
        self.regions.clone()
    }

    /// Changed span between the last two generations.
    pub fn last_delta(&self) -> Option<RegionDelta> {
        self.last_delta
    }

    /// Apply the size ceiling to `snapshot`. Returns whether a parse should
    /// run.
    pub fn admit(&mut self, snapshot: &dyn TextSnapshot) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let line_count = snapshot.line_count();
        let ceiling = self.job.rules.max_fold_lines;
        if line_count > ceiling {
            warn!(line_count, ceiling, "document too large; folding disabled");
            self.disable(
                FoldingStatus::TooLarge,
                Notice::new(
                    NoticeKind::FoldingDisabled,
                    Component::Folding,
                    format!("folding disabled: {line_count} lines exceeds the limit of {ceiling}"),
                ),
            );
            return false;
        }
        true
    }

    /// Parse on the calling thread.
    pub fn recompute(&mut self, snapshot: &dyn TextSnapshot) {
        if !self.admit(snapshot) {
            return;
        }
        let started = Instant::now();
        if let Some(set) = self.job.run(snapshot, &CancellationToken::never()) {
            self.install(set, started.elapsed());
        }
    }

    /// Swap in a generation computed elsewhere.
    pub fn install(&mut self, set: RegionSet, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        if self.check_elapsed(elapsed) {
            return;
        }
        let previous = self.regions.store(Arc::new(set));
        let current = self.regions.load();
        self.last_delta = changed_span(&previous.regions, &current.regions);
        debug!(
            regions = current.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            delta = ?self.last_delta,
            "regions updated"
        );
    }

    pub fn reset(&mut self, snapshot: &dyn TextSnapshot, enabled: bool) {
        info!("folding reset");
        self.status = if enabled {
            FoldingStatus::Enabled
        } else {
            FoldingStatus::Off
        };
        self.regions.store(Arc::new(RegionSet::default()));
        self.last_delta = None;
        self.recompute(snapshot);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // Returns true when the breaker tripped.
    pub(crate) fn check_elapsed(&mut self, elapsed: Duration) -> bool {
        if elapsed > self.limits.slow_threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "folding too slow; disabling for this document"
            );
            self.disable(
                FoldingStatus::TooSlow,
                Notice::new(
                    NoticeKind::PerformanceExceeded,
                    Component::Folding,
                    format!(
                        "folding took {:.1}s and was switched off for this document",
                        elapsed.as_secs_f64()
                    ),
                ),
            );
            return true;
        }
        if elapsed > self.limits.slow_warning {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "slow folding");
        }
        false
    }

    fn disable(&mut self, status: FoldingStatus, notice: Notice) {
        self.status = status;
        self.regions.store(Arc::new(RegionSet::default()));
        self.last_delta = None;
        self.notices.push(notice);
    }
}
