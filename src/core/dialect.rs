// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use clap::ValueEnum;

/// Structural-keyword family governing which directives open and close folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Dialect {
    /// Block oriented: `SEGMENT`/`ENDS`, `PROC`/`ENDP`, `.IF`/`.ENDIF`.
    #[default]
    Masm,
    /// Structure and macro oriented: `STRUC`/`ENDSTRUC`, `%MACRO`/`%ENDMACRO`.
    Nasm,
}

const MASM_OPEN: &[&str] = &[
    "SEGMENT", "MACRO", "STRUCT", "STRUC", "IF", "WHILE", "PROC", ".IF", ".WHILE",
];
const MASM_CLOSE: &[&str] = &["ENDS", "ENDP", "ENDM", ".ENDIF", ".ENDW", "ENDIF"];
const NASM_OPEN: &[&str] = &["STRUC", "ISTRUC", "%MACRO"];
const NASM_CLOSE: &[&str] = &["ENDSTRUC", "IEND", "%ENDMACRO"];

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Masm => "masm",
            Dialect::Nasm => "nasm",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "masm" => Some(Dialect::Masm),
            "nasm" => Some(Dialect::Nasm),
            _ => None,
        }
    }

    pub fn open_keywords(self) -> &'static [&'static str] {
        match self {
            Dialect::Masm => MASM_OPEN,
            Dialect::Nasm => NASM_OPEN,
        }
    }

    pub fn close_keywords(self) -> &'static [&'static str] {
        match self {
            Dialect::Masm => MASM_CLOSE,
            Dialect::Nasm => NASM_CLOSE,
        }
    }

    pub fn opens_region(self, keyword: &str) -> bool {
        self.open_keywords()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(keyword))
    }

    pub fn closes_region(self, keyword: &str) -> bool {
        self.close_keywords()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(keyword))
    }
}
