//! The augmentation pipeline.
//!
//! Raw tokens pass through five stages, in order:
//!
//! 1. [`position`]: line, column, length and inline directives
//! 2. [`brackets`]: parenthesis, square and curly pairs plus parenthesis owners
//! 3. [`nesting`]: enclosing parenthesis pairs per token
//! 4. [`scope`]: scope condition, opener and closer per construct
//! 5. [`level`]: nesting level and enclosing conditions per token
//!
//! Each stage only reads fields written by earlier ones.

pub mod brackets;
pub mod level;
pub mod nesting;
pub mod position;
pub mod scope;

pub use position::{Directives, Encoding, IgnoreRule, PositionOptions, SettingChange};
pub use scope::{chain_closer, MAX_NESTING_DEPTH};

use crate::error::AnalysisError;
use crate::tokens::{RawToken, Token, TokenTable};

/// A fully augmented token stream.
#[derive(Debug, Clone)]
pub struct Augmented {
    pub tokens: Vec<Token>,
    pub directives: Directives,
}

impl Augmented {
    /// Whether the file asked to be skipped. Only positions up to the
    /// directive are mapped in that case.
    pub fn ignored(&self) -> bool {
        self.directives.ignore_file
    }
}

/// Run every augmentation stage over `raw`.
pub fn augment(
    raw: Vec<RawToken>,
    table: &TokenTable,
    options: &PositionOptions,
) -> Result<Augmented, AnalysisError> {
    let mut tokens: Vec<Token> = raw.into_iter().map(Token::from).collect();

    let directives = position::map_positions(&mut tokens, table, options);
    if directives.ignore_file {
        tracing::debug!("file opted out of checking");
        return Ok(Augmented { tokens, directives });
    }

    brackets::match_brackets(&mut tokens, table);
    nesting::map_parenthesis_nesting(&mut tokens);
    scope::resolve_scopes(&mut tokens, table)?;
    level::annotate_levels(&mut tokens, table);

    tracing::debug!(
        tokens = tokens.len(),
        ignored_lines = directives.ignored_lines.len(),
        settings = directives.settings.len(),
        "augmentation complete"
    );

    Ok(Augmented { tokens, directives })
}
