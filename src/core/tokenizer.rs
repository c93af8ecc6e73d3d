// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Single-line tokenizer and classifier.
//!
//! A line is split on whitespace, `,`, `+`, `*`, `[` and `]`; each fragment is
//! classified against the keyword table. A leading label definition is
//! emitted first. A remark absorbs the rest of the line, a jump mnemonic
//! claims the following fragment as a label use, and the first numeric
//! fragment that is not a keyword ends the scan of the line.
//!
//! MASM also defines labels without a colon: `name PROC`, `name EQU` and
//! `name LABEL`. The anonymous label `@@` and the targets `$`, `@B` and `@F`
//! never take part in label tracking.

use std::sync::Arc;

use crate::core::constant::parse_constant;
use crate::core::keywords::KeywordTable;
use crate::core::lexical::{is_split_char, Conventions};
use crate::core::register::is_register_name;

/// Directives that make the fragment before them a label definition.
const DEFINING_DIRECTIVES: [&str; 3] = ["PROC", "EQU", "LABEL"];

/// Size and distance qualifiers that may sit between a jump and its target.
const JUMP_QUALIFIERS: [&str; 7] = ["SHORT", "NEAR", "FAR", "WORD", "DWORD", "QWORD", "PTR"];

/// Jump targets that are not names.
const ANONYMOUS_TARGETS: [&str; 3] = ["$", "@B", "@F"];

const ANONYMOUS_LABEL: &str = "@@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Mnemonic,
    Jump,
    Register,
    Directive,
    LabelDef,
    LabelUse,
    Constant,
    Remark,
    Misc,
    Unknown,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Mnemonic => "mnemonic",
            TokenKind::Jump => "jump",
            TokenKind::Register => "register",
            TokenKind::Directive => "directive",
            TokenKind::LabelDef => "label-def",
            TokenKind::LabelUse => "label-use",
            TokenKind::Constant => "constant",
            TokenKind::Remark => "remark",
            TokenKind::Misc => "misc",
            TokenKind::Unknown => "unknown",
        }
    }

    /// Kinds a keyword table entry may carry.
    pub fn from_keyword_kind(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "mnemonic" => Some(TokenKind::Mnemonic),
            "jump" => Some(TokenKind::Jump),
            "register" => Some(TokenKind::Register),
            "directive" => Some(TokenKind::Directive),
            "misc" => Some(TokenKind::Misc),
            _ => None,
        }
    }

    pub fn is_label(self) -> bool {
        matches!(self, TokenKind::LabelDef | TokenKind::LabelUse)
    }
}

/// A classified span `[start, end)` of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(start: usize, end: usize, kind: TokenKind) -> Self {
        Self { start, end, kind }
    }

    /// The token's text within `line`; empty when the line no longer covers it.
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        line.get(self.start..self.end).unwrap_or_default()
    }

    pub fn intersects(&self, start: usize, end: usize) -> bool {
        self.start < end && self.end > start
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Scan {
    Continue,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct LineTokenizer {
    table: Arc<KeywordTable>,
    conventions: Conventions,
}

impl LineTokenizer {
    pub fn new(table: Arc<KeywordTable>, conventions: Conventions) -> Self {
        Self { table, conventions }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Tokens of `line`, ordered by start and non-overlapping.
    pub fn tokenize(&self, line: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut resume = 0;

        if let Some((start, end)) = self.conventions.find_label_span(line) {
            // Anything before the label is an `EXTRN`-style prefix.
            if self.scan(line, 0, start, &mut tokens) == Scan::Stopped {
                return tokens;
            }
            if &line[start..end] != ANONYMOUS_LABEL {
                tokens.push(Token::new(start, end, TokenKind::LabelDef));
            }
            resume = end + 1;
            if line[resume..].starts_with(':') {
                resume += 1;
            }
        }

        self.scan(line, resume, line.len(), &mut tokens);
        tokens
    }

    /// Tokens of `line` intersecting `[start, end)`.
    pub fn tokenize_range(&self, line: &str, start: usize, end: usize) -> Vec<Token> {
        let mut tokens = self.tokenize(line);
        tokens.retain(|token| token.intersects(start, end));
        tokens
    }

    /// Only the label definitions and uses of `line`.
    pub fn label_tokens(&self, line: &str) -> Vec<Token> {
        let mut tokens = self.tokenize(line);
        tokens.retain(|token| token.kind.is_label());
        tokens
    }

    fn scan(&self, line: &str, from: usize, to: usize, out: &mut Vec<Token>) -> Scan {
        let mut fragments = fragments(&line[from..to], from).peekable();
        while let Some((offset, fragment)) = fragments.next() {
            if let Some(remark) = self.remark_in(line, offset, fragment, out) {
                return remark;
            }
            let end = offset + fragment.len();
            match self.classify(fragment) {
                Some(TokenKind::Jump) => {
                    out.push(Token::new(offset, end, TokenKind::Jump));
                    if self.scan_jump_target(line, &mut fragments, out) == Scan::Stopped {
                        return Scan::Stopped;
                    }
                }
                Some(kind) => out.push(Token::new(offset, end, kind)),
                None => {
                    if parse_constant(fragment).is_some() {
                        out.push(Token::new(offset, end, TokenKind::Constant));
                        // Preserved behaviour: the first bare constant ends the line.
                        return Scan::Stopped;
                    }
                    let defines = fragments
                        .peek()
                        .is_some_and(|&(_, next)| matches_any(next, &DEFINING_DIRECTIVES));
                    if defines {
                        out.push(Token::new(offset, end, TokenKind::LabelDef));
                    } else if self.table.is_empty() {
                        out.push(Token::new(offset, end, TokenKind::Unknown));
                    }
                }
            }
        }
        Scan::Continue
    }

    /// Consume the destination of a jump: qualifiers become `Misc`, a register
    /// stays a register, anything else is a label use.
    fn scan_jump_target<'a>(
        &self,
        line: &str,
        fragments: &mut impl Iterator<Item = (usize, &'a str)>,
        out: &mut Vec<Token>,
    ) -> Scan {
        for (offset, target) in fragments {
            if let Some(remark) = self.remark_in(line, offset, target, out) {
                return remark;
            }
            let end = offset + target.len();
            if matches_any(target, &JUMP_QUALIFIERS) {
                out.push(Token::new(offset, end, TokenKind::Misc));
                continue;
            }
            if !matches_any(target, &ANONYMOUS_TARGETS) {
                let kind = match self.classify(target) {
                    Some(TokenKind::Register) => TokenKind::Register,
                    _ => TokenKind::LabelUse,
                };
                out.push(Token::new(offset, end, kind));
            }
            break;
        }
        Scan::Continue
    }

    fn remark_in(
        &self,
        line: &str,
        offset: usize,
        fragment: &str,
        out: &mut Vec<Token>,
    ) -> Option<Scan> {
        let marker = self.conventions.remark_pos(fragment)?;
        out.push(Token::new(offset + marker, line.len(), TokenKind::Remark));
        Some(Scan::Stopped)
    }

    fn classify(&self, fragment: &str) -> Option<TokenKind> {
        if let Some(kind) = self.table.kind_of(fragment) {
            return Some(kind);
        }
        if !self.table.is_empty() && is_register_name(fragment) {
            return Some(TokenKind::Register);
        }
        None
    }
}

fn matches_any(fragment: &str, words: &[&str]) -> bool {
    words.iter().any(|word| fragment.eq_ignore_ascii_case(word))
}

/// Non-empty fragments of `text` with their offsets, shifted by `base`.
fn fragments(text: &str, base: usize) -> impl Iterator<Item = (usize, &str)> {
    let mut start = 0;
    text.char_indices()
        .filter(|&(_, c)| is_split_char(c))
        .map(|(idx, c)| (idx, idx + c.len_utf8()))
        .chain(std::iter::once((text.len(), text.len())))
        .filter_map(move |(split_at, next)| {
            let fragment = &text[start..split_at];
            let offset = base + start;
            start = next;
            (!fragment.is_empty()).then_some((offset, fragment))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokenizer() -> LineTokenizer {
        let table = KeywordTable::from_json_str(
            r#"[
                {"name": "jmp", "kind": "jump"},
                {"name": "call", "kind": "jump"},
                {"name": "mov", "kind": "mnemonic"},
                {"name": "rax", "kind": "register"},
                {"name": "segment", "kind": "directive"},
                {"name": "extrn", "kind": "directive"},
                {"name": "proc", "kind": "directive"},
                {"name": "ptr", "kind": "misc"}
            ]"#,
        )
        .expect("table");
        LineTokenizer::new(Arc::new(table), Conventions::default())
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn jump_claims_the_next_fragment() {
        let tok = tokenizer();
        let tokens = tok.tokenize("JMP FOO");
        assert_eq!(
            tokens,
            vec![
                Token::new(0, 3, TokenKind::Jump),
                Token::new(4, 7, TokenKind::LabelUse)
            ]
        );
        let tokens = tok.tokenize("    jmp ;FOO");
        assert_eq!(kinds(&tokens), vec![TokenKind::Jump, TokenKind::Remark]);
        assert_eq!(tokens[1].text("    jmp ;FOO"), ";FOO");
    }

    #[test]
    fn label_definition_comes_first() {
        let tok = tokenizer();
        let line = "myLabel: mov rax, rbx";
        let tokens = tok.tokenize(line);
        assert_eq!(tokens[0], Token::new(0, 7, TokenKind::LabelDef));
        assert_eq!(
            kinds(&tokens[1..]),
            vec![TokenKind::Mnemonic, TokenKind::Register, TokenKind::Register]
        );
        assert!(tok
            .tokenize("    mov rax, rbx ; myLabel:")
            .iter()
            .all(|token| token.kind != TokenKind::LabelDef));
    }

    #[test]
    fn double_colon_label_resumes_after_both_colons() {
        let tok = tokenizer();
        let tokens = tok.tokenize("entry::mov rax, 1");
        assert_eq!(tokens[0], Token::new(0, 5, TokenKind::LabelDef));
        assert_eq!(tokens[1], Token::new(7, 10, TokenKind::Mnemonic));
    }

    #[test]
    fn extern_prefix_is_classified_before_the_label() {
        let tok = tokenizer();
        let line = "EXTRN printf:PROC";
        let tokens = tok.tokenize(line);
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Directive, TokenKind::LabelDef, TokenKind::Directive]
        );
        assert_eq!(tokens[1].text(line), "printf");
    }

    #[test]
    fn remark_absorbs_rest_of_line() {
        let tok = tokenizer();
        let line = "mov rax,1;set";
        let tokens = tok.tokenize(line);
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Mnemonic, TokenKind::Register, TokenKind::Remark]
        );
        assert_eq!(tokens[2].text(line), ";set");
    }

    #[test]
    fn first_constant_ends_the_line() {
        let tok = tokenizer();
        let tokens = tok.tokenize("mov 10, rax");
        assert_eq!(kinds(&tokens), vec![TokenKind::Mnemonic, TokenKind::Constant]);
        let tokens = tok.tokenize("mov rax, 0FFh ; remark");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Mnemonic, TokenKind::Register, TokenKind::Constant]
        );
    }

    #[test]
    fn register_fallback_needs_a_loaded_table() {
        let tok = tokenizer();
        assert_eq!(
            kinds(&tok.tokenize("mov xmm3, r15d")),
            vec![TokenKind::Mnemonic, TokenKind::Register, TokenKind::Register]
        );

        let degraded = LineTokenizer::new(
            Arc::new(KeywordTable::degraded("missing")),
            Conventions::default(),
        );
        let line = "start: mov rax, 5 ; go";
        assert_eq!(
            kinds(&degraded.tokenize(line)),
            vec![
                TokenKind::LabelDef,
                TokenKind::Unknown,
                TokenKind::Unknown,
                TokenKind::Constant
            ]
        );
        assert_eq!(
            kinds(&degraded.tokenize("jmp x ; go")),
            vec![TokenKind::Unknown, TokenKind::Unknown, TokenKind::Remark]
        );
    }

    #[test]
    fn unclassified_fragments_are_unknown_only_without_keywords() {
        let tok = tokenizer();
        assert_eq!(
            kinds(&tok.tokenize("mov foo, rax")),
            vec![TokenKind::Mnemonic, TokenKind::Register]
        );

        let degraded = LineTokenizer::new(
            Arc::new(KeywordTable::degraded("missing")),
            Conventions::default(),
        );
        let line = "main PROC";
        let tokens = degraded.tokenize(line);
        assert_eq!(kinds(&tokens), vec![TokenKind::LabelDef, TokenKind::Unknown]);
        assert_eq!(tokens[0].text(line), "main");
    }

    #[test]
    fn masm_directives_define_the_name_before_them() {
        let tok = tokenizer();
        let line = "main PROC";
        let tokens = tok.tokenize(line);
        assert_eq!(kinds(&tokens), vec![TokenKind::LabelDef, TokenKind::Directive]);
        assert_eq!(tokens[0].text(line), "main");

        for line in ["limit equ 10", "entry LABEL far"] {
            let tokens = tok.tokenize(line);
            assert_eq!(tokens[0].kind, TokenKind::LabelDef, "{line}");
        }
        // The name before ENDP is a closing marker, not a definition.
        assert!(tok.label_tokens("main ENDP").is_empty());
        // Keywords never become definitions.
        assert_eq!(
            kinds(&tok.tokenize("mov proc")),
            vec![TokenKind::Mnemonic, TokenKind::Directive]
        );
    }

    #[test]
    fn anonymous_labels_and_targets_are_skipped() {
        let tok = tokenizer();
        assert!(tok.label_tokens("@@: mov rax, 1").is_empty());
        assert_eq!(
            kinds(&tok.tokenize("@@:mov rax")),
            vec![TokenKind::Mnemonic, TokenKind::Register]
        );
        for line in ["jmp @B", "jmp @f", "jmp $", "jmp $+2"] {
            assert!(tok.label_tokens(line).is_empty(), "{line}");
        }
    }

    #[test]
    fn jump_qualifiers_and_registers_are_not_targets() {
        let tok = tokenizer();
        let line = "jmp short done";
        let tokens = tok.tokenize(line);
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Jump, TokenKind::Misc, TokenKind::LabelUse]
        );
        assert_eq!(tokens[2].text(line), "done");

        assert_eq!(
            kinds(&tok.tokenize("call qword ptr [rax]")),
            vec![TokenKind::Jump, TokenKind::Misc, TokenKind::Misc, TokenKind::Register]
        );
        assert_eq!(kinds(&tok.tokenize("jmp rax")), vec![TokenKind::Jump, TokenKind::Register]);
        assert_eq!(
            kinds(&tok.tokenize("jmp near ; later")),
            vec![TokenKind::Jump, TokenKind::Misc, TokenKind::Remark]
        );
    }

    #[test]
    fn range_and_label_modes() {
        let tok = tokenizer();
        let line = "top: call worker ; run";
        let ranged = tok.tokenize_range(line, 5, 9);
        assert_eq!(kinds(&ranged), vec![TokenKind::Jump]);
        assert_eq!(kinds(&tok.tokenize_range(line, 0, line.len())).len(), 4);
        assert!(tok.tokenize_range(line, 3, 3).is_empty());
        assert_eq!(
            kinds(&tok.label_tokens(line)),
            vec![TokenKind::LabelDef, TokenKind::LabelUse]
        );
    }

    #[test]
    fn custom_remark_markers() {
        let table = Arc::new(
            KeywordTable::from_json_str(r#"[{"name": "mov", "kind": "mnemonic"}]"#).expect("table"),
        );
        let tok = LineTokenizer::new(table, Conventions::with_remark_markers(['!']));
        let line = "mov rax ; not a remark ! but this is";
        let tokens = tok.tokenize(line);
        assert_eq!(tokens.last().map(|token| token.text(line)), Some("! but this is"));
    }

    proptest! {
        #[test]
        fn tokenize_is_idempotent_and_ordered(line in "[a-zA-Z0-9 ,+*\\[\\];#:_.\t\"-]{0,60}") {
            let tok = tokenizer();
            let first = tok.tokenize(&line);
            let second = tok.tokenize(&line);
            prop_assert_eq!(&first, &second);
            for token in &first {
                prop_assert!(token.start < token.end);
                prop_assert!(token.end <= line.len());
            }
            for pair in first.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }
        }
    }
}
