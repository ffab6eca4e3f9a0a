//! Collection of findings for one file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::augment::{Directives, IgnoreRule};

/// Severity used when neither the sniff nor the configuration sets one.
pub const DEFAULT_SEVERITY: u8 = 5;

/// Highest accepted severity.
pub const MAX_SEVERITY: u8 = 10;

/// Whether a finding is an error or a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Error => write!(f, "error"),
            MessageKind::Warning => write!(f, "warning"),
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(MessageKind::Error),
            "warning" => Ok(MessageKind::Warning),
            _ => Err(format!("unknown message type: {}", s)),
        }
    }
}

/// A single reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Fully qualified code, e.g. `Generic.Files.LineLength.TooLong`.
    pub source: String,
    pub severity: u8,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// How much detail the collector keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// Keep every finding.
    #[default]
    Full,
    /// Keep per-line counts only.
    Summary,
}

/// Findings on one line, grouped by column in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFindings {
    pub count: usize,
    pub columns: BTreeMap<usize, Vec<Finding>>,
}

/// Errors and warnings for one file.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    mode: RecordMode,
    errors: BTreeMap<usize, LineFindings>,
    warnings: BTreeMap<usize, LineFindings>,
    error_count: usize,
    warning_count: usize,
    suppressed: usize,
}

impl Diagnostics {
    pub fn new(mode: RecordMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Store a finding. Severity thresholds must already have been applied.
    pub fn record(&mut self, finding: Finding) {
        let (lines, count) = match finding.kind {
            MessageKind::Error => (&mut self.errors, &mut self.error_count),
            MessageKind::Warning => (&mut self.warnings, &mut self.warning_count),
        };
        *count += 1;

        let entry = lines.entry(finding.line).or_default();
        entry.count += 1;
        if self.mode == RecordMode::Full {
            entry.columns.entry(finding.column).or_default().push(finding);
        }
    }

    /// Count a finding that a directive suppressed before it was recorded.
    pub fn note_suppressed(&mut self) {
        self.suppressed += 1;
    }

    /// Drop everything recorded on lines ignored for all sniffs.
    ///
    /// Returns the number of findings removed.
    pub fn purge_ignored(&mut self, directives: &Directives) -> usize {
        let mut removed = 0;
        for (line, rule) in &directives.ignored_lines {
            if *rule != IgnoreRule::All {
                continue;
            }
            if let Some(findings) = self.errors.remove(line) {
                self.error_count -= findings.count;
                removed += findings.count;
            }
            if let Some(findings) = self.warnings.remove(line) {
                self.warning_count -= findings.count;
                removed += findings.count;
            }
        }
        self.suppressed += removed;
        removed
    }

    /// Discard everything, as when the file is aborted.
    pub fn clear(&mut self) {
        let mode = self.mode;
        *self = Self::new(mode);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn errors(&self) -> &BTreeMap<usize, LineFindings> {
        &self.errors
    }

    pub fn warnings(&self) -> &BTreeMap<usize, LineFindings> {
        &self.warnings
    }

    /// All findings ordered by line then column, errors before warnings at
    /// the same position. Empty in summary mode.
    pub fn finalize(self) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .errors
            .into_values()
            .chain(self.warnings.into_values())
            .flat_map(|line| line.columns.into_values().flatten())
            .collect();
        findings.sort_by_key(|f| (f.line, f.column, f.kind));
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(line: usize, column: usize, kind: MessageKind, source: &str) -> Finding {
        Finding {
            line,
            column,
            message: format!("{} at {}:{}", source, line, column),
            source: source.to_string(),
            severity: DEFAULT_SEVERITY,
            kind,
        }
    }

    #[test]
    fn test_record_and_count() {
        let mut diags = Diagnostics::new(RecordMode::Full);
        diags.record(finding(3, 1, MessageKind::Error, "A.B.C.D"));
        diags.record(finding(3, 1, MessageKind::Error, "A.B.C.E"));
        diags.record(finding(1, 4, MessageKind::Warning, "A.B.C.F"));

        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.warning_count(), 1);
        let line3 = &diags.errors()[&3];
        assert_eq!(line3.count, 2);
        // Insertion order within a column is kept.
        assert_eq!(line3.columns[&1][0].source, "A.B.C.D");
        assert_eq!(line3.columns[&1][1].source, "A.B.C.E");
    }

    #[test]
    fn test_summary_mode_keeps_counts_only() {
        let mut diags = Diagnostics::new(RecordMode::Summary);
        diags.record(finding(2, 1, MessageKind::Error, "A.B.C.D"));
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.errors()[&2].count, 1);
        assert!(diags.errors()[&2].columns.is_empty());
        assert!(diags.finalize().is_empty());
    }

    #[test]
    fn test_purge_ignored() {
        let mut diags = Diagnostics::new(RecordMode::Full);
        diags.record(finding(1, 1, MessageKind::Error, "A.B.C.D"));
        diags.record(finding(2, 1, MessageKind::Error, "A.B.C.D"));
        diags.record(finding(2, 5, MessageKind::Warning, "A.B.C.D"));
        diags.record(finding(3, 1, MessageKind::Warning, "A.B.C.D"));

        let mut directives = Directives::default();
        directives.ignored_lines.insert(2, IgnoreRule::All);
        directives
            .ignored_lines
            .insert(3, IgnoreRule::Sniffs(["X.Y.Z".to_string()].into_iter().collect()));

        assert_eq!(diags.purge_ignored(&directives), 2);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.suppressed_count(), 2);
        assert!(!diags.errors().contains_key(&2));
        // Purging again removes nothing.
        assert_eq!(diags.purge_ignored(&directives), 0);
    }

    #[test]
    fn test_finalize_order() {
        let mut diags = Diagnostics::new(RecordMode::Full);
        diags.record(finding(2, 1, MessageKind::Warning, "W"));
        diags.record(finding(1, 9, MessageKind::Error, "E2"));
        diags.record(finding(2, 1, MessageKind::Error, "E3"));
        diags.record(finding(1, 2, MessageKind::Warning, "W2"));

        let sources: Vec<String> = diags.finalize().into_iter().map(|f| f.source).collect();
        assert_eq!(sources, vec!["W2", "E2", "E3", "W"]);
    }

    #[test]
    fn test_clear() {
        let mut diags = Diagnostics::new(RecordMode::Summary);
        diags.record(finding(1, 1, MessageKind::Error, "A"));
        diags.clear();
        assert_eq!(diags.error_count(), 0);
        assert_eq!(diags.mode(), RecordMode::Summary);
    }

    #[test]
    fn test_message_kind_parse() {
        assert_eq!("Error".parse::<MessageKind>(), Ok(MessageKind::Error));
        assert!("info".parse::<MessageKind>().is_err());
    }
}
