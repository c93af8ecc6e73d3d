// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Incremental analysis of x86 assembly sources: line tokens, label
//! consistency and foldable regions.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
