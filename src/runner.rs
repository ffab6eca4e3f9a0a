//! Batch runner that checks files and collects per-file outcomes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::augment::{augment, Encoding};
use crate::context::AnalysisContext;
use crate::diagnostics::Finding;
use crate::dispatch::Dispatcher;
use crate::error::AnalysisError;
use crate::file::SourceFile;
use crate::lexer::{self, CLikeTokenizer, Tokenizer};
use crate::sniffs::{SniffFactory, BUILTIN};

/// Source code of the warning raised for files mixing line endings.
pub const MIXED_LINE_ENDINGS: &str = "Internal.LineEndings.Mixed";

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    /// The file was checked. `findings` is empty in summary mode.
    Checked {
        errors: usize,
        warnings: usize,
        suppressed: usize,
        findings: Vec<Finding>,
    },
    /// The file opted out with an ignore-file directive.
    Ignored,
    /// Analysis was aborted; nothing was reported for the file.
    Failed { reason: String },
}

/// Outcome for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn errors(&self) -> usize {
        match &self.outcome {
            FileOutcome::Checked { errors, .. } => *errors,
            _ => 0,
        }
    }

    pub fn warnings(&self) -> usize {
        match &self.outcome {
            FileOutcome::Checked { warnings, .. } => *warnings,
            _ => 0,
        }
    }
}

/// Totals over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: usize,
    pub checked: usize,
    pub ignored: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub suppressed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[FileResult]) -> Self {
        let mut summary = RunSummary {
            files: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                FileOutcome::Checked {
                    errors,
                    warnings,
                    suppressed,
                    ..
                } => {
                    summary.checked += 1;
                    summary.errors += errors;
                    summary.warnings += warnings;
                    summary.suppressed += suppressed;
                }
                FileOutcome::Ignored => summary.ignored += 1,
                FileOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Checks files against one analysis context.
///
/// Every file gets its own token array, sniff instances and collector, so
/// files can be checked in parallel.
pub struct Runner {
    context: AnalysisContext,
    tokenizer: Box<dyn Tokenizer>,
    factories: Vec<(&'static str, SniffFactory)>,
    timings: Mutex<BTreeMap<String, Duration>>,
}

impl Runner {
    /// Create a runner with the built-in sniffs and the tokenizer for the
    /// context's dialect.
    pub fn new(context: AnalysisContext) -> Self {
        let tokenizer = lexer::builtin(&context.table.dialect).unwrap_or_else(|| {
            tracing::debug!(dialect = %context.table.dialect, "no built-in tokenizer, using clike");
            Box::new(CLikeTokenizer)
        });
        Self {
            context,
            tokenizer,
            factories: BUILTIN.to_vec(),
            timings: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replace the tokenizer.
    pub fn tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        if tokenizer.dialect() != self.context.table.dialect {
            tracing::warn!(
                tokenizer = tokenizer.dialect(),
                table = %self.context.table.dialect,
                "tokenizer and token table dialects differ"
            );
        }
        self.tokenizer = tokenizer;
        self
    }

    /// Replace the set of sniffs.
    pub fn sniffs(mut self, factories: Vec<(&'static str, SniffFactory)>) -> Self {
        self.factories = factories;
        self
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Instantiate every sniff once so bad configuration surfaces before
    /// any file is read.
    pub fn validate(&self) -> anyhow::Result<Vec<&'static str>> {
        let dispatcher = Dispatcher::from_factories(&self.factories, &self.context)?;
        Ok(dispatcher.codes())
    }

    /// Accumulated time spent in each sniff across all files.
    pub fn timings(&self) -> BTreeMap<String, Duration> {
        self.timings.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Check files in parallel. Results are sorted by path.
    pub fn run(&self, files: &[PathBuf]) -> Vec<FileResult> {
        use rayon::prelude::*;

        let mut results: Vec<FileResult> = files.par_iter().map(|p| self.check_file(p)).collect();

        // Sort by path for deterministic ordering
        results.sort_by(|a, b| a.path.cmp(&b.path));
        results
    }

    /// Read, decode and check one file.
    pub fn check_file(&self, path: &Path) -> FileResult {
        let source = std::fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| decode(bytes, self.context.encoding));
        match source {
            Ok(source) => self.check_source(path, &source),
            Err(err) => failed(path, err),
        }
    }

    /// Check source text as if it were read from `path`.
    pub fn check_source(&self, path: &Path, source: &str) -> FileResult {
        match self.analyze(path, source) {
            Ok(outcome) => FileResult {
                path: path.to_path_buf(),
                outcome,
            },
            Err(err) => failed(path, err),
        }
    }

    fn analyze(&self, path: &Path, source: &str) -> anyhow::Result<FileOutcome> {
        let table = &self.context.table;
        let eol = lexer::detect_line_ending(source);
        if table.skip_minified {
            lexer::check_minified(source, eol)?;
        }

        let raw = self
            .tokenizer
            .tokenize(source, eol)
            .map_err(AnalysisError::from)?;
        let augmented = augment(raw, table, &self.context.position_options(eol))?;
        if augmented.ignored() {
            tracing::debug!(path = %path.display(), "skipping file with ignore-file directive");
            return Ok(FileOutcome::Ignored);
        }

        let mut file = SourceFile::new(path, augmented, eol, &self.context);
        if lexer::has_mixed_line_endings(source, eol) {
            file.add_warning(
                format!(
                    "File has mixed line endings; this may cause incorrect results (expected {:?})",
                    eol
                ),
                0,
                MIXED_LINE_ENDINGS,
            );
        }

        let mut dispatcher = Dispatcher::from_factories(&self.factories, &self.context)?;
        dispatcher.run(&mut file);
        let purged = file.purge_ignored();
        self.merge_timings(dispatcher.timings());

        let diagnostics = file.into_diagnostics();
        tracing::debug!(
            path = %path.display(),
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            purged,
            "checked file"
        );
        Ok(FileOutcome::Checked {
            errors: diagnostics.error_count(),
            warnings: diagnostics.warning_count(),
            suppressed: diagnostics.suppressed_count(),
            findings: diagnostics.finalize(),
        })
    }

    fn merge_timings(&self, timings: &BTreeMap<String, Duration>) {
        if let Ok(mut total) = self.timings.lock() {
            for (code, elapsed) in timings {
                *total.entry(code.clone()).or_default() += *elapsed;
            }
        }
    }
}

fn failed(path: &Path, err: anyhow::Error) -> FileResult {
    tracing::warn!(path = %path.display(), "{:#}", err);
    FileResult {
        path: path.to_path_buf(),
        outcome: FileOutcome::Failed {
            reason: format!("{:#}", err),
        },
    }
}

/// Turn file bytes into text.
fn decode(bytes: Vec<u8>, encoding: Encoding) -> anyhow::Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("file is not valid UTF-8: {}", e)),
        Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SniffSettings;
    use crate::diagnostics::{MessageKind, RecordMode};
    use crate::tokens::TokenTable;
    use tempfile::TempDir;

    fn runner() -> Runner {
        Runner::new(AnalysisContext::new(TokenTable::clike()))
    }

    fn findings(result: &FileResult) -> &[Finding] {
        match &result.outcome {
            FileOutcome::Checked { findings, .. } => findings,
            other => panic!("expected a checked file, got {:?}", other),
        }
    }

    #[test]
    fn test_check_source_reports_findings() {
        let result = runner().check_source(Path::new("a.c"), "if ($a)\n    foo();\n");
        let found = findings(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "Generic.ControlStructures.InlineControlStructure.Discouraged");
        assert_eq!(found[0].kind, MessageKind::Warning);
        assert_eq!(result.warnings(), 1);
        assert_eq!(result.errors(), 0);
    }

    #[test]
    fn test_ignore_file() {
        let source = "// tokensniff:ignore-file\nif ($a)\n    foo();\n";
        let result = runner().check_source(Path::new("a.c"), source);
        assert_eq!(result.outcome, FileOutcome::Ignored);
    }

    #[test]
    fn test_ignored_range_is_suppressed() {
        let source = "// tokensniff:ignore-start\nif ($a)\n    foo();\n// tokensniff:ignore-end\nif ($b)\n    bar();\n";
        let result = runner().check_source(Path::new("a.c"), source);
        let found = findings(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 5);
    }

    #[test]
    fn test_too_deep_nesting_fails() {
        let mut source = String::new();
        for _ in 0..51 {
            source.push_str("if ($a) {\n");
        }
        for _ in 0..51 {
            source.push_str("}\n");
        }
        let result = runner().check_source(Path::new("deep.c"), &source);
        match result.outcome {
            FileOutcome::Failed { reason } => assert!(reason.contains("maximum nesting level")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_minified_input_fails_when_table_opts_in() {
        let mut table = TokenTable::clike();
        table.skip_minified = true;
        let runner = Runner::new(AnalysisContext::new(table));
        let source = "a = 1; ".repeat(40);
        let result = runner.check_source(Path::new("min.js"), &source);
        assert!(matches!(result.outcome, FileOutcome::Failed { .. }));

        let result = runner.check_source(Path::new("ok.js"), "a = 1;\nb = 2;\n");
        assert!(matches!(result.outcome, FileOutcome::Checked { .. }));
    }

    #[test]
    fn test_lexer_failure_is_reported() {
        let result = runner().check_source(Path::new("bad.c"), "a = 1;\n/* never closed\n");
        match result.outcome {
            FileOutcome::Failed { reason } => assert!(reason.contains("unterminated comment")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_line_endings_warning() {
        let result = runner().check_source(Path::new("a.c"), "a();\r\nb();\nc();\r\n");
        let found = findings(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, MIXED_LINE_ENDINGS);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_summary_mode_keeps_counts_only() {
        let mut ctx = AnalysisContext::new(TokenTable::clike());
        ctx.record_mode = RecordMode::Summary;
        let result = Runner::new(ctx).check_source(Path::new("a.c"), "if ($a)\n    foo();\n");
        assert_eq!(result.warnings(), 1);
        assert!(findings(&result).is_empty());
    }

    #[test]
    fn test_disabled_sniff_and_type_override() {
        let mut ctx = AnalysisContext::new(TokenTable::clike());
        ctx.sniffs.insert(
            "Generic.ControlStructures.InlineControlStructure".to_string(),
            SniffSettings {
                kind: Some(MessageKind::Error),
                ..Default::default()
            },
        );
        let runner = Runner::new(ctx.clone());
        let result = runner.check_source(Path::new("a.c"), "if ($a)\n    foo();\n");
        assert_eq!(result.errors(), 1);

        ctx.sniffs
            .get_mut("Generic.ControlStructures.InlineControlStructure")
            .unwrap()
            .enabled = false;
        let result = Runner::new(ctx).check_source(Path::new("a.c"), "if ($a)\n    foo();\n");
        assert_eq!(result.errors() + result.warnings(), 0);
    }

    #[test]
    fn test_run_sorts_results_and_summarises() {
        let temp = TempDir::new().unwrap();
        let b = temp.path().join("b.c");
        let a = temp.path().join("a.c");
        let c = temp.path().join("c.c");
        std::fs::write(&b, "if ($a)\n    foo();\n").unwrap();
        std::fs::write(&a, "x();\n").unwrap();
        std::fs::write(&c, "// tokensniff:ignore-file\n").unwrap();
        let missing = temp.path().join("missing.c");

        let runner = runner();
        let results = runner.run(&[b.clone(), missing.clone(), c.clone(), a.clone()]);
        let paths: Vec<_> = results.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![a, b, c, missing]);

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.files, 4);
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.warnings, 1);
        assert!(runner.timings().contains_key("Generic.Files.LineLength"));
    }

    #[test]
    fn test_decoding() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latin.c");
        std::fs::write(&path, b"s = \"caf\xe9\";\n").unwrap();

        let result = runner().check_file(&path);
        assert!(matches!(result.outcome, FileOutcome::Failed { .. }));

        let mut ctx = AnalysisContext::new(TokenTable::clike());
        ctx.encoding = Encoding::Latin1;
        let result = Runner::new(ctx).check_file(&path);
        assert!(matches!(result.outcome, FileOutcome::Checked { .. }));
    }

    #[test]
    fn test_json_shape() {
        let result = runner().check_source(Path::new("a.c"), "// tokensniff:ignore-file\n");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "ignored");
        assert_eq!(json["path"], "a.c");
    }
}
