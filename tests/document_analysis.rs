// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

mod common;

use std::sync::Arc;
use std::time::Duration;

use asmlens::analysis::diagnostics::{DiagnosticKind, NoticeKind};
use asmlens::analysis::document::AnalysisMode;
use asmlens::analysis::labels::TrackerStatus;
use asmlens::config::AnalysisConfig;
use asmlens::core::keywords::KeywordTable;
use asmlens::core::tokenizer::TokenKind;

use common::Buffer;

const PROGRAM: &str = "\
start:
    mov eax, 1
loop_top:
    dec eax
    jnz loop_top
    jmp done
";

fn label_token(buffer: &Buffer, line: usize, kind: TokenKind) -> asmlens::core::tokenizer::Token {
    buffer
        .analysis
        .tokens_for_line(line, 0, usize::MAX)
        .into_iter()
        .find(|token| token.kind == kind)
        .expect("label token")
}

#[test]
fn undefined_use_is_reported_until_defined() {
    let mut buffer = Buffer::open(PROGRAM);
    let diagnostics = buffer.analysis.label_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].name, "done");
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Undefined);
    assert_eq!(diagnostics[0].line, 5);

    buffer.replace_lines(6..6, &["done:", "    ret"]);
    assert!(buffer.analysis.label_diagnostics().is_empty());
    let use_token = label_token(&buffer, 5, TokenKind::LabelUse);
    assert_eq!(buffer.analysis.query(5, &use_token), DiagnosticKind::Ok);
}

#[test]
fn duplicate_definitions_clash_on_every_site() {
    let mut buffer = Buffer::open(PROGRAM);
    buffer.set_line(2, "start:");
    let clashes: Vec<usize> = buffer
        .analysis
        .label_diagnostics()
        .into_iter()
        .filter(|diag| diag.kind == DiagnosticKind::Clash)
        .map(|diag| diag.line)
        .collect();
    assert_eq!(clashes, vec![0, 2]);

    let def = label_token(&buffer, 0, TokenKind::LabelDef);
    assert_eq!(buffer.analysis.query(0, &def), DiagnosticKind::Clash);

    // loop_top is gone, so the jnz target is now undefined.
    let jnz_target = label_token(&buffer, 4, TokenKind::LabelUse);
    assert_eq!(buffer.analysis.query(4, &jnz_target), DiagnosticKind::Undefined);

    buffer.set_line(2, "loop_top:");
    assert_eq!(buffer.analysis.query(0, &def), DiagnosticKind::Ok);
}

#[test]
fn in_place_edits_match_a_fresh_analysis() {
    let mut buffer = Buffer::open(PROGRAM);
    buffer.set_line(1, "    jmp start");
    buffer.set_line(3, "again:");
    buffer.set_line(4, "    jnz again");
    let fresh = Buffer::open(&buffer.text.lines().join("\n"));
    assert_eq!(buffer.analysis.label_diagnostics(), fresh.analysis.label_diagnostics());
    let descriptions = buffer.analysis.label_descriptions();
    assert_eq!(descriptions.get("again").map(String::as_str), Some("LINE 4: again:"));
}

#[test]
fn line_deletion_drops_stale_sites() {
    let mut buffer = Buffer::open(PROGRAM);
    buffer.replace_lines(4..6, &[]);
    assert!(buffer.analysis.label_diagnostics().is_empty());
    let index = buffer.analysis.label_index();
    assert!(index.has_label("loop_top"));
    assert!(index.used_at("done").is_none());
}

#[test]
fn tokens_for_range_clamps_to_the_buffer() {
    let buffer = Buffer::open(PROGRAM);
    let lines = buffer.analysis.tokens_for_range(4..100);
    assert_eq!(lines.len(), 2);
    let kinds: Vec<TokenKind> = lines[0].tokens.iter().map(|token| token.kind).collect();
    assert_eq!(kinds, vec![TokenKind::Jump, TokenKind::LabelUse]);
    assert!(buffer.analysis.tokens_for_range(50..60).is_empty());
}

#[test]
fn debounced_rebuild_reaches_the_same_state() {
    let mut config = AnalysisConfig::default();
    config.debounce_ms = 20;
    let mut buffer = Buffer::open_with(PROGRAM, config, AnalysisMode::Debounced);
    assert_eq!(buffer.analysis.label_diagnostics().len(), 1);

    buffer.replace_lines(6..6, &["done:"]);
    assert!(buffer.settle(Duration::from_secs(5)), "background work did not settle");
    assert!(buffer.analysis.label_diagnostics().is_empty());
}

#[test]
fn flush_finishes_pending_work_synchronously() {
    let mut config = AnalysisConfig::default();
    config.debounce_ms = 60_000;
    let mut buffer = Buffer::open_with(PROGRAM, config, AnalysisMode::Debounced);
    buffer.replace_lines(0..1, &["entry:", "start:"]);
    buffer.set_line(1, "done:");
    assert!(!buffer.analysis.is_settled());

    buffer.analysis.flush();
    assert!(buffer.analysis.is_settled());
    let names: Vec<String> = buffer
        .analysis
        .label_diagnostics()
        .into_iter()
        .map(|diag| diag.name)
        .collect();
    assert!(names.is_empty(), "unexpected diagnostics: {names:?}");
}

#[test]
fn published_labels_are_readable_from_another_thread() {
    let mut buffer = Buffer::open(PROGRAM);
    let published = buffer.analysis.published_labels();
    let reader = std::thread::spawn(move || published.load().has_label("start"));
    assert!(reader.join().expect("reader thread"));

    let handle = buffer.analysis.published_labels();
    let before = handle.load();
    buffer.set_line(0, "begin:");
    assert!(before.has_label("start"));
    assert!(handle.load().has_label("begin"));
}

#[test]
fn degraded_keyword_table_raises_one_notice() {
    let table = Arc::new(KeywordTable::degraded("missing keywords file"));
    let mut buffer = Buffer::open_with_table(
        PROGRAM,
        table,
        AnalysisConfig::default(),
        AnalysisMode::Immediate,
    );
    let notices = buffer.analysis.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::DataUnavailable);
    assert!(buffer.analysis.take_notices().is_empty());

    // Without keywords jumps are not recognized, but definitions still are.
    assert!(buffer.analysis.label_index().has_label("loop_top"));
    assert!(buffer.analysis.label_diagnostics().is_empty());
}

#[test]
fn slow_rebuild_trips_the_label_breaker() {
    let mut config = AnalysisConfig::default();
    config.slow_threshold_sec = 1e-9;
    let mut buffer = Buffer::open_with(PROGRAM, config, AnalysisMode::Immediate);
    assert_eq!(buffer.analysis.label_status(), TrackerStatus::Disabled);
    assert!(buffer.analysis.label_diagnostics().is_empty());
    let notices = buffer.analysis.take_notices();
    assert!(notices
        .iter()
        .any(|notice| notice.kind == NoticeKind::PerformanceExceeded));

    buffer.set_line(0, "start:");
    assert_eq!(buffer.analysis.label_status(), TrackerStatus::Disabled);
}

#[test]
fn disabled_labels_report_nothing() {
    let mut config = AnalysisConfig::default();
    config.labels_enabled = false;
    let buffer = Buffer::open_with(PROGRAM, config, AnalysisMode::Immediate);
    assert!(buffer.analysis.label_diagnostics().is_empty());
    let token = label_token(&buffer, 5, TokenKind::LabelUse);
    assert_eq!(buffer.analysis.query(5, &token), DiagnosticKind::Ok);
}

#[test]
fn masm_procedures_resolve_calls_in_either_order() {
    let buffer = Buffer::open(
        "main PROC\n    call helper\n    ret\nmain ENDP\nhelper PROC\n    ret\nhelper ENDP\n",
    );
    assert!(buffer.analysis.label_diagnostics().is_empty());
    let index = buffer.analysis.label_index();
    assert_eq!(
        index
            .def_lines("helper")
            .map(|lines| lines.iter().copied().collect::<Vec<_>>()),
        Some(vec![4])
    );
    assert_eq!(index.used_at("helper").map(|lines| lines.len()), Some(1));
}

#[test]
fn anonymous_labels_never_clash() {
    let buffer = Buffer::open(
        "@@:\n    dec ecx\n    jnz @B\n@@:\n    jmp @F\n    nop\n@@:\n    ret\n",
    );
    assert!(buffer.analysis.label_diagnostics().is_empty());
    assert!(buffer.analysis.label_index().related_lines().is_empty());
}

#[test]
fn local_labels_under_different_parents_do_not_clash() {
    let mut buffer = Buffer::open(
        "f1:\n.loop:\n    jnz .loop\n    ret\nf2:\n.loop:\n    jnz .loop\n    ret\n",
    );
    assert!(buffer.analysis.label_diagnostics().is_empty());

    // Moving the use under f2 below a new parent leaves it undefined there.
    buffer.set_line(4, "f3:");
    assert!(buffer.analysis.label_diagnostics().is_empty());
    buffer.set_line(5, "    nop");
    let diagnostics = buffer.analysis.label_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 6);
    assert_eq!(diagnostics[0].name, "f3.loop");
    let use_token = label_token(&buffer, 6, TokenKind::LabelUse);
    assert_eq!(buffer.analysis.query(6, &use_token), DiagnosticKind::Undefined);
    let use_token = label_token(&buffer, 2, TokenKind::LabelUse);
    assert_eq!(buffer.analysis.query(2, &use_token), DiagnosticKind::Ok);
}
