// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Lexical layer: conventions, keyword table and the line tokenizer.

pub mod constant;
pub mod dialect;
pub mod keywords;
pub mod lexical;
pub mod register;
pub mod snapshot;
pub mod tokenizer;
