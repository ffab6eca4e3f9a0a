//! Output formatting for check results.
//!
//! Supports two output formats:
//! - Text: colored terminal output grouped by file
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::diagnostics::{Finding, MessageKind};
use crate::runner::{FileOutcome, FileResult, RunSummary};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report.
#[derive(Serialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub totals: RunSummary,
    pub files: Vec<JsonFile>,
}

/// One file in the JSON report.
#[derive(Serialize)]
pub struct JsonFile {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Build the JSON report with paths relative to `base_path`.
pub fn json_report(base_path: &Path, results: &[FileResult]) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: base_path.to_string_lossy().to_string(),
        totals: RunSummary::from_results(results),
        files: results
            .iter()
            .map(|r| JsonFile {
                path: make_relative_path(&r.path, base_path),
                outcome: r.outcome.clone(),
            })
            .collect(),
    }
}

/// Write results in JSON format.
pub fn write_json(base_path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(base_path, results))?;
    println!("{}", json);
    Ok(())
}

fn make_relative_path(file_path: &Path, base_path: &Path) -> String {
    let relative = if base_path.is_file() {
        base_path
            .parent()
            .and_then(|parent| file_path.strip_prefix(parent).ok())
    } else {
        file_path.strip_prefix(base_path).ok()
    };
    relative
        .unwrap_or(file_path)
        .to_string_lossy()
        .replace('\\', "/")
}

// =============================================================================
// Text Format
// =============================================================================

/// Write results in colored text format.
pub fn write_text(base_path: &Path, results: &[FileResult], show_timings: Option<&[(String, Duration)]>) {
    println!();
    print!("  ");
    print!("{}", "tokensniff".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Checking: ".dimmed());
    println!("{}", base_path.display());
    println!();

    for result in results {
        let path = make_relative_path(&result.path, base_path);
        match &result.outcome {
            FileOutcome::Checked {
                errors,
                warnings,
                findings,
                ..
            } => {
                if *errors == 0 && *warnings == 0 {
                    continue;
                }
                write_file_header(&path, *errors, *warnings);
                write_findings(findings);
                println!();
            }
            FileOutcome::Ignored => {}
            FileOutcome::Failed { reason } => {
                println!("  {} {}", path.blue().bold(), "(not checked)".red());
                println!("    {}", reason);
                println!();
            }
        }
    }

    write_totals(&RunSummary::from_results(results));

    if let Some(timings) = show_timings {
        write_timings(timings);
    }
}

fn write_file_header(path: &str, errors: usize, warnings: usize) {
    print!("  {}", path.blue().bold());
    print!("  ");
    if errors > 0 {
        print!("{} ", format!("{} error{}", errors, plural(errors)).red());
    }
    if warnings > 0 {
        print!("{}", format!("{} warning{}", warnings, plural(warnings)).yellow());
    }
    println!();
}

fn write_findings(findings: &[Finding]) {
    // Summary mode keeps no individual findings.
    if findings.is_empty() {
        return;
    }
    for f in findings {
        print!("    {:>5}", format!("{}:{}", f.line, f.column).dimmed());
        print!("  ");
        write_kind_tag(f.kind);
        println!(" {}", f.message);
        println!("            {}", format!("({}, severity {})", f.source, f.severity).dimmed());
    }
}

fn write_kind_tag(kind: MessageKind) {
    match kind {
        MessageKind::Error => print!("{}", "ERROR".red()),
        MessageKind::Warning => print!("{}", "WARN ".yellow()),
    }
}

fn write_totals(summary: &RunSummary) {
    if summary.errors == 0 && summary.failed == 0 {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }
    print!(
        "  {} file{} checked, {} error{}, {} warning{}",
        summary.checked,
        plural(summary.checked),
        summary.errors,
        plural(summary.errors),
        summary.warnings,
        plural(summary.warnings)
    );
    if summary.ignored > 0 {
        print!("  {}", format!("({} ignored)", summary.ignored).dimmed());
    }
    if summary.suppressed > 0 {
        print!("  {}", format!("({} suppressed)", summary.suppressed).dimmed());
    }
    if summary.failed > 0 {
        print!("  {}", format!("({} failed)", summary.failed).red());
    }
    println!();
}

fn write_timings(timings: &[(String, Duration)]) {
    println!();
    println!("  {}", "Time per sniff:".bold());
    for (code, elapsed) in timings {
        println!("    {:<52} {:>10.3} ms", code, elapsed.as_secs_f64() * 1000.0);
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
