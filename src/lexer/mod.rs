//! Lexer boundary.
//!
//! The engine does not interpret source text itself. A [`Tokenizer`] turns
//! text into a flat sequence of `(kind, content)` pairs; everything else is
//! derived from that sequence and the dialect's token table.

mod clike;

pub use clike::CLikeTokenizer;

use crate::error::{AnalysisError, TokenizeError};
use crate::tokens::RawToken;

/// Average characters per line above which input is treated as minified.
pub const MINIFIED_LINE_AVERAGE: usize = 100;

/// A lexer for one dialect.
pub trait Tokenizer: Send + Sync {
    /// Dialect identifier, matching the token table's `dialect`.
    fn dialect(&self) -> &str;

    /// Split source text into raw tokens.
    ///
    /// Each token may contain at most one end-of-line marker, at its end.
    fn tokenize(&self, source: &str, eol: &str) -> Result<Vec<RawToken>, TokenizeError>;
}

/// Look up a built-in tokenizer by dialect name.
pub fn builtin(dialect: &str) -> Option<Box<dyn Tokenizer>> {
    match dialect {
        "clike" => Some(Box::new(CLikeTokenizer)),
        _ => None,
    }
}

/// Detect the end-of-line string used by the source, from its first line
/// break. Defaults to `"\n"` when the source has none.
pub fn detect_line_ending(source: &str) -> &'static str {
    match source.find(['\n', '\r']) {
        Some(pos) => {
            let rest = &source.as_bytes()[pos..];
            if rest.starts_with(b"\r\n") {
                "\r\n"
            } else if rest[0] == b'\r' {
                "\r"
            } else {
                "\n"
            }
        }
        None => "\n",
    }
}

/// Whether the source uses line endings other than `eol`.
pub fn has_mixed_line_endings(source: &str, eol: &str) -> bool {
    let stripped = source.replace(eol, "");
    stripped.contains(['\n', '\r'])
}

/// Reject content whose average line length suggests minified code.
pub fn check_minified(source: &str, eol: &str) -> Result<(), AnalysisError> {
    let chars = source.chars().count();
    let lines = source.matches(eol).count() + 1;
    let average = chars / lines;
    if average > MINIFIED_LINE_AVERAGE {
        return Err(AnalysisError::Minified { average });
    }
    Ok(())
}
