// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::analysis::folding::FoldingRules;
use crate::analysis::SpeedLimits;
use crate::core::dialect::Dialect;
use crate::core::lexical::Conventions;
use crate::error::ConfigError;

const SETTINGS_ROOT: &str = "asmlens";
const MIN_DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct FoldingConfig {
    pub enabled: bool,
    pub max_lines: usize,
    pub begin_tag: String,
    pub end_tag: String,
    pub default_collapsed: bool,
}

impl Default for FoldingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_lines: 100_000,
            begin_tag: "#region".to_string(),
            end_tag: "#endregion".to_string(),
            default_collapsed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub dialect: Dialect,
    pub remark_markers: String,
    pub debounce_ms: u64,
    pub slow_threshold_sec: f64,
    pub slow_warning_sec: f64,
    pub labels_enabled: bool,
    pub folding: FoldingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Masm,
            remark_markers: "#;".to_string(),
            debounce_ms: 1000,
            slow_threshold_sec: 10.0,
            slow_warning_sec: 0.2,
            labels_enabled: true,
            folding: FoldingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Apply the `asmlens` section of an editor settings object. Missing or
    /// mistyped keys keep their current value.
    pub fn update_from_settings(&mut self, settings: Option<&Value>) {
        let Some(settings) = settings else {
            return;
        };
        let Some(root) = settings.get(SETTINGS_ROOT) else {
            return;
        };

        if let Some(dialect) = root
            .get("dialect")
            .and_then(Value::as_str)
            .and_then(Dialect::parse)
        {
            self.dialect = dialect;
        }
        if let Some(markers) = read_non_empty_string(root.get("remarkMarkers")) {
            self.remark_markers = markers;
        }
        if let Some(ms) = root.get("debounceMs").and_then(Value::as_u64) {
            self.debounce_ms = ms.max(MIN_DEBOUNCE_MS);
        }
        if let Some(sec) = read_positive_seconds(root.get("slowThresholdSec")) {
            self.slow_threshold_sec = sec;
        }
        if let Some(sec) = read_positive_seconds(root.get("slowWarningSec")) {
            self.slow_warning_sec = sec;
        }
        if let Some(enabled) = root
            .get("labels")
            .and_then(|labels| labels.get("enabled"))
            .and_then(Value::as_bool)
        {
            self.labels_enabled = enabled;
        }
        if let Some(folding) = root.get("folding") {
            if let Some(enabled) = folding.get("enabled").and_then(Value::as_bool) {
                self.folding.enabled = enabled;
            }
            if let Some(max) = folding.get("maxLines").and_then(Value::as_u64) {
                self.folding.max_lines = usize::try_from(max).unwrap_or(usize::MAX);
            }
            if let Some(tag) = read_non_empty_string(folding.get("beginTag")) {
                self.folding.begin_tag = tag;
            }
            if let Some(tag) = read_non_empty_string(folding.get("endTag")) {
                self.folding.end_tag = tag;
            }
            if let Some(collapsed) = folding.get("defaultCollapsed").and_then(Value::as_bool) {
                self.folding.default_collapsed = collapsed;
            }
        }
    }

    /// Read a JSON settings file, either wrapped in an `asmlens` object or
    /// holding the section directly.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|err| {
            ConfigError::new(format!("failed to read '{}': {err}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|err| ConfigError::new(format!("{}: invalid JSON: {err}", path.display())))?;
        if !value.is_object() {
            return Err(ConfigError::new(format!("{}: expected a JSON object", path.display())));
        }
        let settings = if value.get(SETTINGS_ROOT).is_some() {
            value
        } else {
            let mut wrapped = Map::new();
            wrapped.insert(SETTINGS_ROOT.to_string(), value);
            Value::Object(wrapped)
        };
        validate_section(&settings[SETTINGS_ROOT])
            .map_err(|message| ConfigError::new(format!("{}: {message}", path.display())))?;

        let mut config = Self::default();
        config.update_from_settings(Some(&settings));
        Ok(config)
    }

    pub fn conventions(&self) -> Conventions {
        Conventions::with_remark_markers(self.remark_markers.chars())
    }

    pub fn speed_limits(&self) -> SpeedLimits {
        SpeedLimits {
            slow_threshold: seconds(self.slow_threshold_sec),
            slow_warning: seconds(self.slow_warning_sec),
        }
    }

    pub fn folding_rules(&self) -> FoldingRules {
        FoldingRules {
            begin_tag: self.folding.begin_tag.clone(),
            end_tag: self.folding.end_tag.clone(),
            dialect: self.dialect,
            max_fold_lines: self.folding.max_lines,
            default_collapsed: self.folding.default_collapsed,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn seconds(sec: f64) -> Duration {
    Duration::try_from_secs_f64(sec).unwrap_or(if sec > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn validate_section(root: &Value) -> Result<(), String> {
    if let Some(dialect) = root.get("dialect") {
        let known = dialect.as_str().and_then(Dialect::parse).is_some();
        if !known {
            return Err(format!("unknown dialect {dialect}; expected \"masm\" or \"nasm\""));
        }
    }
    Ok(())
}

fn read_non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

fn read_positive_seconds(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|sec| sec.is_finite() && *sec > 0.0)
}
