// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! x86 register-name recognition.
//!
//! `is_register_name` runs once per keyword while tokenizing every line, so it
//! is written as a fixed-arity character match instead of a set lookup. The
//! canonical spelling list below is the reference it is tested against.

/// Every register spelling accepted by [`is_register_name`], upper case.
pub const REGISTER_NAMES: &[&str] = &[
    "RAX", "EAX", "AX", "AL", "AH", //
    "RBX", "EBX", "BX", "BL", "BH", //
    "RCX", "ECX", "CX", "CL", "CH", //
    "RDX", "EDX", "DX", "DL", "DH", //
    "RSI", "ESI", "SI", "SIL", //
    "RDI", "EDI", "DI", "DIL", //
    "RBP", "EBP", "BP", "BPL", //
    "RSP", "ESP", "SP", "SPL", //
    "R8", "R8D", "R8W", "R8B", //
    "R9", "R9D", "R9W", "R9B", //
    "R10", "R10D", "R10W", "R10B", //
    "R11", "R11D", "R11W", "R11B", //
    "R12", "R12D", "R12W", "R12B", //
    "R13", "R13D", "R13W", "R13B", //
    "R14", "R14D", "R14W", "R14B", //
    "R15", "R15D", "R15W", "R15B", //
    "MM0", "MM1", "MM2", "MM3", "MM4", "MM5", "MM6", "MM7", //
    "XMM0", "XMM1", "XMM2", "XMM3", "XMM4", "XMM5", "XMM6", "XMM7", //
    "XMM8", "XMM9", "XMM10", "XMM11", "XMM12", "XMM13", "XMM14", "XMM15", //
    "YMM0", "YMM1", "YMM2", "YMM3", "YMM4", "YMM5", "YMM6", "YMM7", //
    "YMM8", "YMM9", "YMM10", "YMM11", "YMM12", "YMM13", "YMM14", "YMM15", //
    "ZMM0", "ZMM1", "ZMM2", "ZMM3", "ZMM4", "ZMM5", "ZMM6", "ZMM7", //
    "ZMM8", "ZMM9", "ZMM10", "ZMM11", "ZMM12", "ZMM13", "ZMM14", "ZMM15", //
    "ZMM16", "ZMM17", "ZMM18", "ZMM19", "ZMM20", "ZMM21", "ZMM22", "ZMM23", //
    "ZMM24", "ZMM25", "ZMM26", "ZMM27", "ZMM28", "ZMM29", "ZMM30", "ZMM31",
];

/// Returns true when `token` spells a general-purpose, MMX, XMM, YMM or ZMM
/// register. Case-insensitive; tokens outside 2..=5 bytes are rejected
/// without inspection.
pub fn is_register_name(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() < 2 || bytes.len() > 5 {
        return false;
    }
    let at = |idx: usize| bytes.get(idx).map_or(b' ', u8::to_ascii_uppercase);
    let (c1, c2, c3, c4, c5) = (at(0), at(1), at(2), at(3), at(4));

    match bytes.len() {
        2 => match c1 {
            b'A' | b'C' => matches!(c2, b'X' | b'H' | b'L'),
            b'B' => matches!(c2, b'X' | b'H' | b'L' | b'P'),
            b'D' => matches!(c2, b'X' | b'H' | b'L' | b'I'),
            b'S' => matches!(c2, b'I' | b'P'),
            b'R' => matches!(c2, b'8' | b'9'),
            _ => false,
        },
        3 => match c1 {
            b'R' => match c2 {
                b'A' | b'C' => c3 == b'X',
                b'B' => matches!(c3, b'X' | b'P'),
                b'D' => matches!(c3, b'X' | b'I'),
                b'S' => matches!(c3, b'I' | b'P'),
                b'8' | b'9' => matches!(c3, b'D' | b'W' | b'B'),
                b'1' => matches!(c3, b'0'..=b'5'),
                _ => false,
            },
            b'E' => match c2 {
                b'A' | b'C' => c3 == b'X',
                b'B' => matches!(c3, b'X' | b'P'),
                b'D' => matches!(c3, b'X' | b'I'),
                b'S' => matches!(c3, b'I' | b'P'),
                _ => false,
            },
            b'B' => c2 == b'P' && c3 == b'L',
            b'S' => matches!(c2, b'P' | b'I') && c3 == b'L',
            b'D' => c2 == b'I' && c3 == b'L',
            b'M' => c2 == b'M' && matches!(c3, b'0'..=b'7'),
            _ => false,
        },
        4 => match c1 {
            b'R' => c2 == b'1' && matches!(c3, b'0'..=b'5') && matches!(c4, b'D' | b'W' | b'B'),
            b'X' | b'Y' | b'Z' => c2 == b'M' && c3 == b'M' && c4.is_ascii_digit(),
            _ => false,
        },
        5 => match c1 {
            b'X' | b'Y' => c2 == b'M' && c3 == b'M' && c4 == b'1' && matches!(c5, b'0'..=b'5'),
            b'Z' => {
                c2 == b'M'
                    && c3 == b'M'
                    && match c4 {
                        b'1' | b'2' => c5.is_ascii_digit(),
                        b'3' => matches!(c5, b'0' | b'1'),
                        _ => false,
                    }
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_register_name, REGISTER_NAMES};
    use std::collections::HashSet;

    #[test]
    fn accepts_every_canonical_spelling_in_any_case() {
        for name in REGISTER_NAMES {
            assert!(is_register_name(name), "{name}");
            assert!(is_register_name(&name.to_ascii_lowercase()), "{name}");
        }
        assert!(is_register_name("Xmm12"));
        assert!(is_register_name("r15d"));
    }

    #[test]
    fn matches_canonical_list_exhaustively_over_candidate_alphabet() {
        // Every string of length 2..=5 over the characters that occur in any
        // register spelling; the matcher must agree with the canonical list.
        let canonical: HashSet<&str> = REGISTER_NAMES.iter().copied().collect();
        let alphabet: Vec<u8> = {
            let mut set: Vec<u8> = REGISTER_NAMES
                .iter()
                .flat_map(|name| name.bytes())
                .collect::<HashSet<u8>>()
                .into_iter()
                .collect();
            set.sort_unstable();
            set
        };

        let mut checked = 0usize;
        let mut buf = Vec::with_capacity(5);
        for len in 2..=4usize {
            enumerate(&alphabet, len, &mut buf, &mut |candidate| {
                let text = std::str::from_utf8(candidate).unwrap_or_default();
                assert_eq!(
                    is_register_name(text),
                    canonical.contains(text),
                    "mismatch for {text}"
                );
                checked += 1;
            });
        }
        // Length five only occurs with an XMM/YMM/ZMM prefix.
        for prefix in ["XMM", "YMM", "ZMM", "RAX", "R1D"] {
            for a in &alphabet {
                for b in &alphabet {
                    let text = format!("{prefix}{}{}", *a as char, *b as char);
                    assert_eq!(
                        is_register_name(&text),
                        canonical.contains(text.as_str()),
                        "mismatch for {text}"
                    );
                    checked += 1;
                }
            }
        }
        assert!(checked > 10_000);
    }

    fn enumerate(alphabet: &[u8], len: usize, buf: &mut Vec<u8>, visit: &mut dyn FnMut(&[u8])) {
        if buf.len() == len {
            visit(buf);
            return;
        }
        for ch in alphabet {
            buf.push(*ch);
            enumerate(alphabet, len, buf, visit);
            buf.pop();
        }
    }

    #[test]
    fn rejects_near_misses() {
        for text in [
            "", "A", "AXX", "R16", "R16D", "XMM16", "YMM16", "ZMM32", "MM8", "EIP", "RAXES",
        ] {
            assert!(!is_register_name(text), "{text}");
        }
    }
}
