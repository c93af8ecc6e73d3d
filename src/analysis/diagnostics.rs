// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::collections::HashSet;

use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Ok,
    Undefined,
    Clash,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Ok => "ok",
            DiagnosticKind::Undefined => "undefined",
            DiagnosticKind::Clash => "clash",
        }
    }
}

/// A label problem on one line. Columns are byte offsets of the label text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelDiagnostic {
    pub line: usize,
    pub name: String,
    pub kind: DiagnosticKind,
    pub start: usize,
    pub end: usize,
}

impl LabelDiagnostic {
    pub fn message(&self) -> String {
        match self.kind {
            DiagnosticKind::Ok => format!("label '{}'", self.name),
            DiagnosticKind::Undefined => format!("undefined label '{}'", self.name),
            DiagnosticKind::Clash => format!("label '{}' is defined more than once", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    DataUnavailable,
    FoldingDisabled,
    PerformanceExceeded,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::DataUnavailable => "data-unavailable",
            NoticeKind::FoldingDisabled => "folding-disabled",
            NoticeKind::PerformanceExceeded => "performance-exceeded",
        }
    }
}

/// Component a notice originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Keywords,
    Labels,
    Folding,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Keywords => "keywords",
            Component::Labels => "labels",
            Component::Folding => "folding",
        }
    }
}

/// A one-time, user-visible message about degraded analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Notice {
    pub kind: NoticeKind,
    pub component: Component,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, component: Component, message: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            message: message.into(),
        }
    }
}

pub fn dedup_diagnostics(input: Vec<LabelDiagnostic>) -> Vec<LabelDiagnostic> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for diag in input {
        let key = (diag.line, diag.start, diag.end, diag.kind, diag.name.clone());
        if seen.insert(key) {
            out.push(diag);
        }
    }
    out
}

pub fn diagnostics_to_json(input: &[LabelDiagnostic]) -> Vec<Value> {
    input
        .iter()
        .filter(|diag| diag.kind != DiagnosticKind::Ok)
        .map(|diag| {
            json!({
                "range": {
                    "start": {"line": diag.line, "character": diag.start},
                    "end": {"line": diag.line, "character": diag.end.max(diag.start + 1)},
                },
                "severity": severity_for(diag.kind),
                "code": diag.kind.as_str(),
                "source": "asmlens",
                "label": diag.name,
                "message": diag.message(),
            })
        })
        .collect()
}

pub fn notice_to_json(notice: &Notice) -> Value {
    json!({
        "kind": notice.kind.as_str(),
        "component": notice.component.as_str(),
        "message": notice.message,
    })
}

fn severity_for(kind: DiagnosticKind) -> u32 {
    match kind {
        DiagnosticKind::Clash => 1,
        DiagnosticKind::Undefined => 2,
        DiagnosticKind::Ok => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: usize, kind: DiagnosticKind) -> LabelDiagnostic {
        LabelDiagnostic {
            line,
            name: "L1".to_string(),
            kind,
            start: 0,
            end: 2,
        }
    }

    #[test]
    fn dedup_uses_stable_tuple_key() {
        let out = dedup_diagnostics(vec![
            diag(3, DiagnosticKind::Clash),
            diag(3, DiagnosticKind::Clash),
            diag(7, DiagnosticKind::Clash),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn json_skips_ok_entries() {
        let out = diagnostics_to_json(&[
            diag(1, DiagnosticKind::Ok),
            diag(2, DiagnosticKind::Undefined),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["code"], "undefined");
        assert_eq!(out[0]["severity"], 2);
        assert_eq!(out[0]["range"]["start"]["line"], 2);
    }
}
