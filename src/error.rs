//! Error types for the analysis engine.
//!
//! Only two situations abort a file: the lexer failing (or refusing input it
//! considers degenerate) and the scope resolver exceeding its nesting limit.
//! Everything else is tolerated by the lower layers and left for sniffs to
//! report as ordinary diagnostics.

/// A fatal condition that aborts analysis of a single file.
///
/// Diagnostics collected for the file so far are discarded when this is
/// raised; other files in a batch are unaffected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Scope nesting exceeded the resolver's depth limit.
    #[error("maximum nesting level reached at token {token} (depth {depth}); file could not be processed")]
    NestingTooDeep {
        /// Depth at which the limit was hit.
        depth: usize,
        /// Index of the scope opener that would have exceeded the limit.
        token: usize,
    },

    /// The lexer could not tokenize the source.
    #[error("tokenizer failed: {0}")]
    Tokenize(#[from] TokenizeError),

    /// Input looks like minified or generated content.
    #[error("file appears to be minified and cannot be processed (average line length {average})")]
    Minified {
        /// Average number of characters per line.
        average: usize,
    },
}

/// Errors produced by a lexer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A comment was opened but never closed.
    #[error("unterminated comment starting on line {line}")]
    UnterminatedComment { line: usize },

    /// A string literal was opened but never closed.
    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
}

/// Errors raised when configuring a sniff property.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The sniff has no property with this name.
    #[error("sniff {sniff} has no property {property:?}")]
    Unknown { sniff: String, property: String },

    /// The value could not be converted to the property's type.
    #[error("invalid value {value:?} for property {property:?}: {reason}")]
    Invalid {
        property: String,
        value: String,
        reason: String,
    },

    /// No registered sniff has this code.
    #[error("no sniff registered with code {0:?}")]
    NoSuchSniff(String),
}

impl PropertyError {
    /// Build an `Invalid` error for a value that failed to parse.
    pub fn invalid(property: &str, value: &str, reason: impl ToString) -> Self {
        PropertyError::Invalid {
            property: property.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
