// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Numeric constant recognition.

use std::fmt;

/// Smallest unsigned storage width able to hold a parsed constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitWidth {
    W8,
    W16,
    W32,
    W64,
}

impl BitWidth {
    pub fn for_value(value: u64) -> Self {
        if value <= u64::from(u8::MAX) {
            BitWidth::W8
        } else if value <= u64::from(u16::MAX) {
            BitWidth::W16
        } else if value <= u64::from(u32::MAX) {
            BitWidth::W32
        } else {
            BitWidth::W64
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            BitWidth::W8 => 8,
            BitWidth::W16 => 16,
            BitWidth::W32 => 32,
            BitWidth::W64 => 64,
        }
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Parse `token` as an unsigned constant.
///
/// Accepted forms are `0x`/`0X` prefixed hexadecimal, `h`/`H` suffixed
/// hexadecimal and plain decimal. Digit-group separators `_` and `.` are
/// dropped before conversion. Values wider than 64 bits and tokens with any
/// other content yield `None`.
pub fn parse_constant(token: &str) -> Option<(u64, BitWidth)> {
    let text: String = token
        .trim()
        .chars()
        .filter(|&c| c != '_' && c != '.')
        .collect();
    let text = text.as_str();

    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        parse_digits(hex, 16)?
    } else if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        parse_digits(hex, 16)?
    } else {
        parse_digits(text, 10)?
    };

    Some((value, BitWidth::for_value(value)))
}

// `from_str_radix` tolerates a leading `+`, which is not a constant here.
fn parse_digits(digits: &str, radix: u32) -> Option<u64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
