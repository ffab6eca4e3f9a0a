//! Ruleset configuration.
//!
//! A ruleset is a YAML file that selects the dialect, sets recording
//! thresholds and configures individual sniffs. It is turned into an
//! [`AnalysisContext`] once per run.

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::augment::Encoding;
use crate::context::{AnalysisContext, IgnorePattern, PatternMode, SniffSettings};
use crate::diagnostics::{MessageKind, RecordMode, DEFAULT_SEVERITY, MAX_SEVERITY};
use crate::tokens::TokenTable;

/// Ruleset file names searched for when none is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["tokensniff.yaml", ".tokensniff.yaml"];

/// File extensions checked when the ruleset names none.
const DEFAULT_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "hpp", "cs", "java", "js", "php"];

/// Top-level ruleset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Built-in dialect name or path to a YAML token table.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_severity")]
    pub error_severity: u8,
    #[serde(default = "default_severity")]
    pub warning_severity: u8,
    #[serde(default)]
    pub report_mode: RecordMode,
    /// Honour inline `tokensniff:` directives.
    #[serde(default = "default_true")]
    pub annotations: bool,
    /// Glob patterns for paths never checked (e.g. "**/vendor/**").
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Extensions of files collected from directories.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub sniffs: BTreeMap<String, SniffConfig>,

    #[serde(skip)]
    excluded: OnceCell<GlobSet>,
}

/// Configuration for one sniff.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SniffConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub severity: Option<u8>,
    /// "error" or "warning"
    #[serde(default, rename = "type")]
    pub kind: Option<MessageKind>,
    /// Property values; scalars of any YAML type are accepted.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub ignore_patterns: Vec<IgnorePatternConfig>,
}

/// A per-sniff path pattern.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IgnorePatternConfig {
    pub pattern: String,
    #[serde(default)]
    pub mode: PatternMode,
}

fn default_dialect() -> String {
    "clike".to_string()
}

fn default_tab_width() -> usize {
    4
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_severity() -> u8 {
    DEFAULT_SEVERITY
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            tab_width: default_tab_width(),
            encoding: default_encoding(),
            error_severity: DEFAULT_SEVERITY,
            warning_severity: DEFAULT_SEVERITY,
            report_mode: RecordMode::Full,
            annotations: true,
            exclude_patterns: Vec::new(),
            extensions: Vec::new(),
            sniffs: BTreeMap::new(),
            excluded: OnceCell::new(),
        }
    }
}

impl Config {
    /// Parse a ruleset from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a ruleset from YAML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        // An empty file is a valid, all-defaults ruleset.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find a ruleset file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.error_severity > MAX_SEVERITY || self.warning_severity > MAX_SEVERITY {
            anyhow::bail!("severity thresholds must be between 0 and {}", MAX_SEVERITY);
        }
        self.encoding
            .parse::<Encoding>()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        for (code, sniff) in &self.sniffs {
            if code.split('.').count() != 3 {
                anyhow::bail!("sniff code {:?} must have the form Standard.Category.Name", code);
            }
            if let Some(severity) = sniff.severity {
                if severity > MAX_SEVERITY {
                    anyhow::bail!("severity of {} must be between 0 and {}", code, MAX_SEVERITY);
                }
            }
            for pattern in &sniff.ignore_patterns {
                IgnorePattern::new(&pattern.pattern, pattern.mode)
                    .map_err(|e| anyhow::anyhow!("invalid ignore pattern for {}: {}", code, e))?;
            }
        }
        for pattern in &self.exclude_patterns {
            Glob::new(pattern)?;
        }
        Ok(())
    }

    /// Load the token table named by `dialect`. Paths are resolved against
    /// `base_dir`.
    pub fn load_table(&self, base_dir: &Path) -> anyhow::Result<TokenTable> {
        if let Some(table) = TokenTable::builtin(&self.dialect) {
            return Ok(table);
        }
        let path = base_dir.join(&self.dialect);
        if !path.is_file() {
            anyhow::bail!("unknown dialect {:?} (not a built-in name or a table file)", self.dialect);
        }
        TokenTable::parse_file(&path)
    }

    /// Build the per-run analysis context.
    pub fn to_context(&self, base_dir: &Path) -> anyhow::Result<AnalysisContext> {
        let table = self.load_table(base_dir)?;
        let mut context = AnalysisContext::new(table);
        context.tab_width = self.tab_width;
        context.encoding = self.encoding.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
        context.error_severity = self.error_severity;
        context.warning_severity = self.warning_severity;
        context.record_mode = self.report_mode;
        context.annotations = self.annotations;
        context.base_dir = base_dir.to_path_buf();

        for (code, sniff) in &self.sniffs {
            let mut ignore_patterns = Vec::with_capacity(sniff.ignore_patterns.len());
            for pattern in &sniff.ignore_patterns {
                ignore_patterns.push(IgnorePattern::new(&pattern.pattern, pattern.mode)?);
            }
            let properties = sniff
                .properties
                .iter()
                .map(|(name, value)| Ok((name.clone(), scalar_to_string(name, value)?)))
                .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
            context.sniffs.insert(
                code.clone(),
                SniffSettings {
                    enabled: sniff.enabled,
                    severity: sniff.severity,
                    kind: sniff.kind,
                    properties,
                    ignore_patterns,
                },
            );
        }
        Ok(context)
    }

    /// Extensions of files to collect.
    pub fn extensions(&self) -> Vec<&str> {
        if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.to_vec()
        } else {
            self.extensions.iter().map(|e| e.trim_start_matches('.')).collect()
        }
    }

    /// Check if a path should be excluded based on `exclude_patterns`.
    /// Uses globset, so `**` matches across directories.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let set = self.excluded.get_or_init(|| {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.exclude_patterns {
                if let Ok(glob) = Glob::new(pattern) {
                    builder.add(glob);
                }
            }
            builder.build().unwrap_or_else(|_| GlobSet::empty())
        });
        set.is_match(path)
    }
}

fn scalar_to_string(name: &str, value: &serde_yaml::Value) -> anyhow::Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => anyhow::bail!("property {:?} must be a scalar value", name),
    }
}
