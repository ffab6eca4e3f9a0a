//! Per-run analysis settings.
//!
//! An [`AnalysisContext`] is built once (usually from a
//! [`Config`](crate::config::Config)) and shared read-only by every file
//! checked in the run. Nothing in the engine reads global state.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::augment::{Encoding, PositionOptions};
use crate::diagnostics::{MessageKind, RecordMode, DEFAULT_SEVERITY};
use crate::tokens::TokenTable;

/// How an ignore pattern is matched against a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Match against the full path.
    #[default]
    Absolute,
    /// Match against the path relative to the run's base directory.
    Relative,
}

/// A path pattern that turns a sniff off for matching files.
///
/// Patterns are regular expressions in which `*` stands for any run of
/// characters. Matching is case-insensitive and unanchored; paths are
/// matched with `/` separators.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    pub pattern: String,
    pub mode: PatternMode,
    regex: Regex,
}

impl IgnorePattern {
    pub fn new(pattern: &str, mode: PatternMode) -> Result<Self, regex::Error> {
        let mut expanded = String::with_capacity(pattern.len() + 4);
        let mut previous = None;
        for c in pattern.chars() {
            if c == '*' && previous != Some('.') {
                expanded.push('.');
            }
            expanded.push(c);
            previous = Some(c);
        }
        let regex = RegexBuilder::new(&expanded).case_insensitive(true).build()?;
        Ok(Self {
            pattern: pattern.to_string(),
            mode,
            regex,
        })
    }

    /// Whether `path` matches, resolving relative patterns against `base_dir`.
    pub fn matches(&self, path: &Path, base_dir: &Path) -> bool {
        let candidate = match self.mode {
            PatternMode::Absolute => path,
            PatternMode::Relative => match path.strip_prefix(base_dir) {
                Ok(relative) => relative,
                Err(_) => return false,
            },
        };
        let normalised = candidate.to_string_lossy().replace('\\', "/");
        self.regex.is_match(&normalised)
    }
}

/// Settings for one sniff.
#[derive(Debug, Clone)]
pub struct SniffSettings {
    pub enabled: bool,
    /// Severity replacing whatever the sniff reports.
    pub severity: Option<u8>,
    /// Report findings as this kind regardless of how the sniff raised them.
    pub kind: Option<MessageKind>,
    /// Property values applied when the sniff is registered.
    pub properties: BTreeMap<String, String>,
    pub ignore_patterns: Vec<IgnorePattern>,
}

impl Default for SniffSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            kind: None,
            properties: BTreeMap::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Everything a file check needs besides the source itself.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub table: TokenTable,
    /// Tab stop width; 0 disables tab expansion.
    pub tab_width: usize,
    pub encoding: Encoding,
    /// Minimum severity for errors to be recorded; 0 disables errors.
    pub error_severity: u8,
    /// Minimum severity for warnings to be recorded; 0 disables warnings.
    pub warning_severity: u8,
    pub record_mode: RecordMode,
    /// Honour inline directives.
    pub annotations: bool,
    /// Root for relative ignore patterns.
    pub base_dir: PathBuf,
    /// Settings keyed by sniff code.
    pub sniffs: BTreeMap<String, SniffSettings>,
}

impl AnalysisContext {
    /// A context for `table` with default settings.
    pub fn new(table: TokenTable) -> Self {
        Self {
            table,
            tab_width: 4,
            encoding: Encoding::Utf8,
            error_severity: DEFAULT_SEVERITY,
            warning_severity: DEFAULT_SEVERITY,
            record_mode: RecordMode::Full,
            annotations: true,
            base_dir: PathBuf::from("."),
            sniffs: BTreeMap::new(),
        }
    }

    /// Settings for a sniff, if any were configured.
    pub fn sniff(&self, code: &str) -> Option<&SniffSettings> {
        self.sniffs.get(code)
    }

    /// Whether the sniff should run at all.
    pub fn sniff_enabled(&self, code: &str) -> bool {
        self.sniff(code).map_or(true, |s| s.enabled)
    }

    /// Recording threshold for a message kind.
    pub fn threshold(&self, kind: MessageKind) -> u8 {
        match kind {
            MessageKind::Error => self.error_severity,
            MessageKind::Warning => self.warning_severity,
        }
    }

    /// Whether `path` matches one of the sniff's ignore patterns.
    pub fn sniff_ignores_path(&self, code: &str, path: &Path) -> bool {
        self.sniff(code).is_some_and(|s| {
            s.ignore_patterns
                .iter()
                .any(|p| p.matches(path, &self.base_dir))
        })
    }

    /// Position-mapping options for a file using `eol`.
    pub fn position_options(&self, eol: &str) -> PositionOptions {
        PositionOptions {
            tab_width: self.tab_width,
            encoding: self.encoding,
            eol: eol.to_string(),
            annotations: self.annotations,
        }
    }
}
