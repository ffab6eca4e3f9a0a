//! Command-line interface for tokensniff.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::report;
use crate::runner::{RunSummary, Runner};
use crate::sniffs;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Token-stream static analysis.
///
/// tokensniff tokenizes source files, resolves their scope structure and
/// runs a set of sniffs over the result, reporting errors and warnings.
#[derive(Parser)]
#[command(name = "tokensniff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Log filter directive for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check files against a ruleset
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// List the built-in sniffs
    Sniffs,
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Path to ruleset YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Tab stop width; 0 disables tab expansion
    #[arg(long)]
    pub tab_width: Option<usize>,

    /// Minimum severity for errors to be reported; 0 hides errors
    #[arg(long)]
    pub error_severity: Option<u8>,

    /// Minimum severity for warnings to be reported; 0 hides warnings
    #[arg(long)]
    pub warning_severity: Option<u8>,

    /// Report per-file counts only
    #[arg(long)]
    pub summary: bool,

    /// Show time spent in each sniff
    #[arg(long)]
    pub timings: bool,
}

/// Load the ruleset given on the command line, or discover one next to
/// the checked path or in the current directory. Returns the ruleset and
/// the directory its relative paths resolve against.
fn load_config(explicit: Option<&Path>, root: &Path) -> anyhow::Result<(Config, PathBuf)> {
    if let Some(path) = explicit {
        let config = Config::parse_file(path)
            .map_err(|e| anyhow::anyhow!("error parsing ruleset {}: {}", path.display(), e))?;
        let dir = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        return Ok((config, dir));
    }

    let cwd = std::env::current_dir()?;
    for dir in [root, cwd.as_path()] {
        if let Some(path) = Config::discover(dir) {
            tracing::debug!(path = %path.display(), "using discovered ruleset");
            let config = Config::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("error parsing ruleset {}: {}", path.display(), e))?;
            return Ok((config, dir.to_path_buf()));
        }
    }

    tracing::debug!("no ruleset found, using defaults");
    Ok((Config::default(), root.to_path_buf()))
}

/// Collect files to check under `root`.
fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let extensions = config.extensions();
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden and third-party directories
            !(name.starts_with('.') || name == "vendor" || name == "node_modules")
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.is_path_excluded(relative) {
            tracing::debug!(path = %path.display(), "excluded by ruleset");
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    if args.format != "text" && args.format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'text' or 'json'", args.format);
        return Ok(EXIT_ERROR);
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let is_dir = std::fs::metadata(&abs_path)?.is_dir();
    let root = if is_dir {
        abs_path.clone()
    } else {
        abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| abs_path.clone())
    };

    let (mut config, config_dir) = match load_config(args.config.as_deref(), &root) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Some(width) = args.tab_width {
        config.tab_width = width;
    }
    if let Some(severity) = args.error_severity {
        config.error_severity = severity;
    }
    if let Some(severity) = args.warning_severity {
        config.warning_severity = severity;
    }
    if args.summary {
        config.report_mode = crate::diagnostics::RecordMode::Summary;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: invalid ruleset: {}", e);
        return Ok(EXIT_ERROR);
    }

    let context = config.to_context(&config_dir)?;
    let runner = Runner::new(context);
    if let Err(e) = runner.validate() {
        eprintln!("Error: invalid sniff configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    let files = if is_dir {
        collect_files(&abs_path, &config)?
    } else {
        vec![abs_path.clone()]
    };
    if files.is_empty() {
        eprintln!("Warning: no files to check");
        return Ok(EXIT_SUCCESS);
    }

    let results = runner.run(&files);
    let summary = RunSummary::from_results(&results);

    match args.format.as_str() {
        "json" => report::write_json(&abs_path, &results)?,
        _ => {
            let timings: Option<Vec<(String, std::time::Duration)>> =
                args.timings.then(|| runner.timings().into_iter().collect());
            report::write_text(&abs_path, &results, timings.as_deref());
        }
    }

    if summary.errors > 0 || summary.failed > 0 {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the sniffs command.
pub fn run_sniffs() -> anyhow::Result<i32> {
    println!("Built-in sniffs:");
    println!();
    for (code, factory) in sniffs::BUILTIN {
        let sniff = factory();
        let kinds: Vec<&str> = sniff.register().iter().map(|k| k.as_str()).collect();
        let listens = if kinds.len() > 8 {
            "every token".to_string()
        } else {
            kinds.join(", ")
        };
        println!("  {:<50} {}", code, listens);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_skips_hidden_vendor_and_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["src", "src/gen", ".git", "vendor", "node_modules"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "src/a.c",
            "src/b.txt",
            "src/gen/out.c",
            ".git/x.c",
            "vendor/v.c",
            "node_modules/m.js",
        ] {
            std::fs::write(root.join(file), "x();\n").unwrap();
        }

        let config = Config::parse("exclude_patterns:\n  - \"**/gen/**\"\n").unwrap();
        let files = collect_files(root, &config).unwrap();
        assert_eq!(files, vec![root.join("src/a.c")]);
    }

    #[test]
    fn test_load_config_discovers_next_to_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("tokensniff.yaml"), "tab_width: 2\n").unwrap();
        let (config, dir) = load_config(None, temp.path()).unwrap();
        assert_eq!(config.tab_width, 2);
        assert_eq!(dir, temp.path());
    }

    #[test]
    fn test_load_config_explicit_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.yaml");
        std::fs::write(&path, "tab_width: [1, 2]\n").unwrap();
        assert!(load_config(Some(&path), temp.path()).is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::parse_from(["tokensniff", "-vv", "sniffs"]);
        assert_eq!(cli.log_level(), "trace");
        let cli = Cli::parse_from(["tokensniff", "check", "-q", "."]);
        assert_eq!(cli.log_level(), "error");
        let cli = Cli::parse_from(["tokensniff", "lint", "src"]);
        assert_eq!(cli.log_level(), "warn");
    }
}
