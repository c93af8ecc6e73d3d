// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Buffer-wide analyses built on the line tokenizer.

use std::time::Duration;

pub mod diagnostics;
pub mod document;
pub mod folding;
pub mod labels;
pub mod scheduler;

/// Wall-clock limits applied to a single recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLimits {
    /// Above this the analysis switches itself off for the buffer.
    pub slow_threshold: Duration,
    /// Above this a warning is logged.
    pub slow_warning: Duration,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            slow_threshold: Duration::from_secs(10),
            slow_warning: Duration::from_millis(200),
        }
    }
}
