// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface: analyze one source file and report the results.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::{json, Value};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use crate::analysis::diagnostics::{diagnostics_to_json, notice_to_json, LabelDiagnostic, Notice};
use crate::analysis::document::{AnalysisMode, DocumentAnalysis, LineTokens};
use crate::analysis::folding::RegionDescriptor;
use crate::config::AnalysisConfig;
use crate::core::dialect::Dialect;
use crate::core::keywords::KeywordTable;
use crate::core::snapshot::{SourceText, TextSnapshot};
use crate::error::CliError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Incremental x86 assembly source analysis.

Tokenizes every line, checks label definitions against their uses and computes
foldable regions. Sections are opt-in: specify any of --tokens, --labels or
--folds. With none given, labels and folds are reported.
Line numbers in text output are 1-based; JSON output uses 0-based lines and
byte columns.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "asmlens",
    version = VERSION,
    about = "Tokens, label checks and folding regions for x86 assembly sources",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(value_name = "FILE", long_help = "Assembly source file to analyze.")]
    pub file: PathBuf,
    #[arg(
        long = "dialect",
        value_enum,
        long_help = "Structural keyword family used for directive folding. Overrides the config file."
    )]
    pub dialect: Option<Dialect>,
    #[arg(
        long = "keywords",
        value_name = "PATH",
        long_help = "Keyword table JSON to use instead of the builtin table. A table that cannot be loaded degrades to no keywords."
    )]
    pub keywords: Option<PathBuf>,
    #[arg(
        long = "config",
        value_name = "PATH",
        long_help = "JSON settings file, either bare or wrapped in an \"asmlens\" object."
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select output format. text is default; json emits a single machine-readable object."
    )]
    pub format: OutputFormat,
    #[arg(
        long = "tokens",
        action = ArgAction::SetTrue,
        long_help = "Report the classified tokens of every line."
    )]
    pub tokens: bool,
    #[arg(
        long = "labels",
        action = ArgAction::SetTrue,
        long_help = "Report label clashes and undefined label uses."
    )]
    pub labels: bool,
    #[arg(long = "folds", action = ArgAction::SetTrue, long_help = "Report foldable regions.")]
    pub folds: bool,
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::SetTrue,
        long_help = "Enable debug logging on stderr."
    )]
    pub verbose: bool,
}

impl Cli {
    /// Which sections to print as (tokens, labels, folds).
    pub fn sections(&self) -> (bool, bool, bool) {
        if !self.tokens && !self.labels && !self.folds {
            (false, true, true)
        } else {
            (self.tokens, self.labels, self.folds)
        }
    }

    pub fn analysis_config(&self) -> Result<AnalysisConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load_from_path(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        Ok(config)
    }
}

/// Log filter for the binary. `rust_log` directives apply when present,
/// INFO otherwise; `verbose` raises the global level to DEBUG on top.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let filter = match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => {
            EnvFilter::builder().parse_lossy(directives)
        }
        _ => EnvFilter::new(Level::INFO.as_str()),
    };
    if verbose {
        filter.add_directive(Level::DEBUG.into())
    } else {
        filter
    }
}

struct Report {
    tokens: Option<Vec<LineTokens>>,
    diagnostics: Option<Vec<LabelDiagnostic>>,
    regions: Option<Vec<RegionDescriptor>>,
    notices: Vec<Notice>,
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let config = cli.analysis_config()?;
    let text = fs::read_to_string(&cli.file).map_err(|source| CliError::Io {
        path: cli.file.clone(),
        source,
    })?;
    let table = Arc::new(KeywordTable::load_or_degraded(cli.keywords.as_deref()));
    let source = SourceText::new(&text);
    debug!(file = %cli.file.display(), lines = source.line_count(), "analyzing");

    let snapshot: Arc<dyn TextSnapshot> = Arc::new(source.clone());
    let mut analysis = DocumentAnalysis::new(table, config, snapshot, AnalysisMode::Immediate);
    let (tokens, labels, folds) = cli.sections();
    let report = Report {
        tokens: tokens.then(|| analysis.tokens_for_range(0..source.line_count())),
        diagnostics: labels.then(|| analysis.label_diagnostics()),
        regions: folds.then(|| analysis.region_descriptors()),
        notices: analysis.take_notices(),
    };

    match cli.format {
        OutputFormat::Text => write_text(&report, &source, out)?,
        OutputFormat::Json => {
            let value = report_json(&report, &source);
            writeln!(out, "{value}")?;
        }
    }
    Ok(())
}

fn write_text(report: &Report, source: &SourceText, out: &mut dyn Write) -> std::io::Result<()> {
    for notice in &report.notices {
        writeln!(
            out,
            "notice: {} ({}): {}",
            notice.kind.as_str(),
            notice.component.as_str(),
            notice.message
        )?;
    }
    if let Some(lines) = &report.tokens {
        writeln!(out, "tokens:")?;
        for entry in lines.iter().filter(|entry| !entry.tokens.is_empty()) {
            let line = source.line(entry.line);
            let rendered: Vec<String> = entry
                .tokens
                .iter()
                .map(|token| format!("{}:{:?}", token.kind.as_str(), token.text(line)))
                .collect();
            writeln!(out, "  {}: {}", entry.line + 1, rendered.join(" "))?;
        }
    }
    if let Some(diagnostics) = &report.diagnostics {
        writeln!(out, "labels: {} problem(s)", diagnostics.len())?;
        for diag in diagnostics {
            writeln!(
                out,
                "  {}:{}: {}: {}",
                diag.line + 1,
                diag.start + 1,
                diag.kind.as_str(),
                diag.message()
            )?;
        }
    }
    if let Some(regions) = &report.regions {
        writeln!(out, "regions: {}", regions.len())?;
        for region in regions {
            writeln!(
                out,
                "  {}{}-{}: {}",
                "  ".repeat(region.level.saturating_sub(1)),
                region.start_line + 1,
                region.end_line + 1,
                region.description
            )?;
        }
    }
    Ok(())
}

fn report_json(report: &Report, source: &SourceText) -> Value {
    let mut root = json!({
        "version": VERSION,
        "notices": report.notices.iter().map(notice_to_json).collect::<Vec<_>>(),
    });
    if let Some(lines) = &report.tokens {
        root["tokens"] = Value::Array(
            lines
                .iter()
                .map(|entry| {
                    let line = source.line(entry.line);
                    json!({
                        "line": entry.line,
                        "tokens": entry.tokens.iter().map(|token| json!({
                            "start": token.start,
                            "end": token.end,
                            "kind": token.kind.as_str(),
                            "text": token.text(line),
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect(),
        );
    }
    if let Some(diagnostics) = &report.diagnostics {
        root["diagnostics"] = Value::Array(diagnostics_to_json(diagnostics));
    }
    if let Some(regions) = &report.regions {
        root["regions"] = Value::Array(
            regions
                .iter()
                .map(|region| {
                    json!({
                        "level": region.level,
                        "startLine": region.start_line,
                        "endLine": region.end_line,
                        "description": region.description,
                        "collapsed": region.default_collapsed,
                    })
                })
                .collect(),
        );
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_source(name: &str, contents: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir()
            .join(format!("asmlens-cli-{}-{nanos}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(name);
        fs::write(&path, contents).expect("write source");
        path
    }

    fn run_to_string(cli: &Cli) -> String {
        let mut out = Vec::new();
        run(cli, &mut out).expect("run");
        String::from_utf8(out).expect("utf8")
    }

    const SOURCE: &str = "\
start:
    mov eax, 1
    jmp missing
start:
#region setup
    nop
#endregion
";

    #[test]
    fn sections_default_to_labels_and_folds() {
        let cli = Cli::parse_from(["asmlens", "a.asm"]);
        assert_eq!(cli.sections(), (false, true, true));
        let cli = Cli::parse_from(["asmlens", "a.asm", "--tokens"]);
        assert_eq!(cli.sections(), (true, false, false));
    }

    #[test]
    fn parses_dialect_and_format() {
        let cli = Cli::parse_from(["asmlens", "a.asm", "--dialect", "nasm", "--format", "json"]);
        assert_eq!(cli.dialect, Some(Dialect::Nasm));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.analysis_config().expect("config").dialect, Dialect::Nasm);
    }

    #[test]
    fn text_report_lists_problems_and_regions() {
        let path = temp_source("text.asm", SOURCE);
        let cli = Cli::parse_from(["asmlens".into(), path.into_os_string()]);
        let text = run_to_string(&cli);
        assert!(text.contains("labels: 3 problem(s)"), "{text}");
        assert!(text.contains("3:9: undefined: undefined label 'missing'"), "{text}");
        assert!(text.contains("1:1: clash:"), "{text}");
        assert!(text.contains("regions: 1"), "{text}");
        assert!(text.contains("5-7: setup"), "{text}");
    }

    #[test]
    fn json_report_carries_requested_sections() {
        let path = temp_source("json.asm", SOURCE);
        let cli = Cli::parse_from([
            "asmlens".into(),
            path.into_os_string(),
            "--format".into(),
            "json".into(),
            "--tokens".into(),
            "--labels".into(),
        ]);
        let value: Value = serde_json::from_str(&run_to_string(&cli)).expect("json");
        assert!(value.get("regions").is_none());
        assert_eq!(value["diagnostics"].as_array().map(Vec::len), Some(3));
        let first = &value["tokens"][0]["tokens"][0];
        assert_eq!(first["kind"], "label-def");
        assert_eq!(first["text"], "start");
    }

    #[test]
    fn missing_keyword_file_degrades_with_notice() {
        let path = temp_source("degraded.asm", "mov eax, 1\n");
        let cli = Cli::parse_from([
            "asmlens".into(),
            path.into_os_string(),
            "--keywords".into(),
            "/nonexistent/keywords.json".into(),
        ]);
        let text = run_to_string(&cli);
        assert!(text.contains("notice: data-unavailable (keywords)"), "{text}");
    }

    #[test]
    fn rust_log_sets_the_level_unless_verbose() {
        use tracing_subscriber::filter::LevelFilter;

        let level = |verbose, rust_log| log_filter(verbose, rust_log).max_level_hint();
        assert_eq!(level(false, None), Some(LevelFilter::INFO));
        assert_eq!(level(false, Some("  ")), Some(LevelFilter::INFO));
        assert_eq!(level(false, Some("warn")), Some(LevelFilter::WARN));
        assert_eq!(level(true, Some("warn")), Some(LevelFilter::DEBUG));
        assert_eq!(level(true, None), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let cli = Cli::parse_from(["asmlens", "/nonexistent/source.asm"]);
        let mut out = Vec::new();
        let err = run(&cli, &mut out).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
