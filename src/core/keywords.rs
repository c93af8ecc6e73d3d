// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Read-only keyword table mapping upper-cased names to their token kind.
//!
//! The table is built once from a JSON document of the form
//!
//! ```json
//! { "keywords": [
//!     { "name": "jmp", "kind": "jump", "arch": "x86", "description": "Jump" },
//!     { "name": "segment", "kind": "directive", "assembler": "masm" }
//! ] }
//! ```
//!
//! and shared between documents behind an `Arc`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::dialect::Dialect;
use crate::core::tokenizer::TokenKind;
use crate::error::KeywordTableError;

const BUILTIN_KEYWORDS: &str = include_str!("../../data/keywords.json");

/// Instruction-set extension a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X64,
    I686,
    Mmx,
    Sse,
    Sse2,
    Sse3,
    Ssse3,
    Sse41,
    Sse42,
    Avx,
    Avx2,
    Avx512,
}

impl Arch {
    pub fn parse(text: &str) -> Option<Self> {
        let arch = match text.trim().to_ascii_uppercase().as_str() {
            "X86" | "8086" | "386" => Arch::X86,
            "X64" | "X86_64" | "AMD64" => Arch::X64,
            "I686" | "P6" => Arch::I686,
            "MMX" => Arch::Mmx,
            "SSE" => Arch::Sse,
            "SSE2" => Arch::Sse2,
            "SSE3" => Arch::Sse3,
            "SSSE3" => Arch::Ssse3,
            "SSE41" | "SSE4.1" => Arch::Sse41,
            "SSE42" | "SSE4.2" => Arch::Sse42,
            "AVX" => Arch::Avx,
            "AVX2" => Arch::Avx2,
            "AVX512" | "AVX512F" => Arch::Avx512,
            _ => return None,
        };
        Some(arch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::I686 => "i686",
            Arch::Mmx => "mmx",
            Arch::Sse => "sse",
            Arch::Sse2 => "sse2",
            Arch::Sse3 => "sse3",
            Arch::Ssse3 => "ssse3",
            Arch::Sse41 => "sse41",
            Arch::Sse42 => "sse42",
            Arch::Avx => "avx",
            Arch::Avx2 => "avx2",
            Arch::Avx512 => "avx512",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub name: String,
    pub kind: TokenKind,
    pub architecture: Option<Arch>,
    pub assembler: Option<Dialect>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordEntry>,
    degraded_reason: Option<String>,
}

impl KeywordTable {
    /// A table with no keywords, as used when no data source was given.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The empty table standing in for one that failed to load.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            degraded_reason: Some(reason.into()),
        }
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, KeywordTableError> {
        Self::from_json_str(BUILTIN_KEYWORDS)
    }

    pub fn load(path: &Path) -> Result<Self, KeywordTableError> {
        let text = fs::read_to_string(path).map_err(|source| KeywordTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&text)?;
        debug!(path = %path.display(), keywords = table.len(), "loaded keyword table");
        Ok(table)
    }

    /// Load `path` (or the builtin table when `None`), falling back to a
    /// degraded empty table on failure.
    pub fn load_or_degraded(path: Option<&Path>) -> Self {
        let result = match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        };
        match result {
            Ok(table) => table,
            Err(err) => {
                warn!(error = %err, "keyword table unavailable; continuing without keywords");
                Self::degraded(err.to_string())
            }
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, KeywordTableError> {
        let root: Value = serde_json::from_str(text)?;
        let list = match &root {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("keywords") {
                Some(Value::Array(items)) => items,
                _ => return Err(KeywordTableError::schema(0, "missing 'keywords' array")),
            },
            _ => return Err(KeywordTableError::schema(0, "expected an object or array")),
        };

        let mut entries = HashMap::with_capacity(list.len());
        for (index, item) in list.iter().enumerate() {
            let entry = parse_entry(index, item)?;
            entries.insert(entry.name.clone(), entry);
        }
        Ok(Self {
            entries,
            degraded_reason: None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded_reason.as_deref()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&KeywordEntry> {
        if name.bytes().any(|b| b.is_ascii_lowercase()) {
            self.entries.get(&name.to_ascii_uppercase())
        } else {
            self.entries.get(name)
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<TokenKind> {
        self.get(name).map(|entry| entry.kind)
    }

    /// Entries whose name starts with `prefix`, sorted by name. Entries bound
    /// to another assembler than `dialect` are skipped.
    pub fn keywords_with_prefix(
        &self,
        prefix: &str,
        dialect: Option<Dialect>,
    ) -> Vec<&KeywordEntry> {
        let prefix = prefix.to_ascii_uppercase();
        let mut matches: Vec<&KeywordEntry> = self
            .entries
            .values()
            .filter(|entry| entry.name.starts_with(&prefix))
            .filter(|entry| match (dialect, entry.assembler) {
                (Some(want), Some(have)) => want == have,
                _ => true,
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordEntry> {
        self.entries.values()
    }
}

fn parse_entry(index: usize, item: &Value) -> Result<KeywordEntry, KeywordTableError> {
    let Some(obj) = item.as_object() else {
        return Err(KeywordTableError::schema(index, "entry is not an object"));
    };
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| KeywordTableError::schema(index, "missing 'name'"))?;
    let kind_text = obj
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| KeywordTableError::schema(index, format!("'{name}' has no 'kind'")))?;
    let kind = TokenKind::from_keyword_kind(kind_text).ok_or_else(|| {
        KeywordTableError::schema(index, format!("'{name}' has unknown kind '{kind_text}'"))
    })?;
    let assembler = match obj.get("assembler").and_then(Value::as_str) {
        Some(text) => Some(Dialect::parse(text).ok_or_else(|| {
            KeywordTableError::schema(index, format!("'{name}' has unknown assembler '{text}'"))
        })?),
        None => None,
    };
    // Unknown architectures are tolerated; newer data files may list more.
    let architecture = obj.get("arch").and_then(Value::as_str).and_then(Arch::parse);
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(KeywordEntry {
        name: name.to_ascii_uppercase(),
        kind,
        architecture,
        assembler,
        description,
    })
}
