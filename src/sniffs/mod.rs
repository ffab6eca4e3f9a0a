//! Rule checkers.
//!
//! This module provides:
//! - `Sniff` trait: the contract between the dispatcher and a rule checker
//! - `SniffFactory`: constructor used to build fresh instances per file
//! - the built-in sniffs shipped with the engine

mod disallow_tab_indent;
mod inline_control_structure;
mod line_length;
mod nesting_level;
mod unmatched_bracket;

pub use disallow_tab_indent::DisallowTabIndentSniff;
pub use inline_control_structure::InlineControlStructureSniff;
pub use line_length::LineLengthSniff;
pub use nesting_level::NestingLevelSniff;
pub use unmatched_bracket::UnmatchedBracketSniff;

use crate::error::PropertyError;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// A rule checker.
///
/// A sniff declares the token kinds it listens for; the dispatcher then calls
/// [`process`](Sniff::process) once for every token of those kinds, in file
/// order. Instances are created per file, so a sniff may keep state across
/// calls within one file.
pub trait Sniff: Send {
    /// Dotted code identifying the sniff, e.g. `Generic.Files.LineLength`.
    /// Finding sources are formed by appending a message code to it.
    fn code(&self) -> &'static str;

    /// Token kinds this sniff listens for.
    fn register(&self) -> Vec<TokenKind>;

    /// Dialects the sniff understands. Empty means every dialect.
    fn dialects(&self) -> &'static [&'static str] {
        &[]
    }

    /// Change a property from configuration or an inline directive.
    fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        let _ = value;
        Err(PropertyError::Unknown {
            sniff: self.code().to_string(),
            property: name.to_string(),
        })
    }

    /// Check the token at `index`.
    ///
    /// Returning `Some(next)` asks the dispatcher not to call this sniff
    /// again before token `next`.
    fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize>;
}

/// Factory function type for creating sniff instances.
pub type SniffFactory = fn() -> Box<dyn Sniff>;

fn line_length() -> Box<dyn Sniff> {
    Box::new(LineLengthSniff::default())
}

fn inline_control_structure() -> Box<dyn Sniff> {
    Box::new(InlineControlStructureSniff)
}

fn nesting_level() -> Box<dyn Sniff> {
    Box::new(NestingLevelSniff::default())
}

fn unmatched_bracket() -> Box<dyn Sniff> {
    Box::new(UnmatchedBracketSniff)
}

fn disallow_tab_indent() -> Box<dyn Sniff> {
    Box::new(DisallowTabIndentSniff)
}

/// Every built-in sniff, keyed by code.
pub const BUILTIN: &[(&str, SniffFactory)] = &[
    ("Generic.Brackets.UnmatchedBracket", unmatched_bracket),
    ("Generic.ControlStructures.InlineControlStructure", inline_control_structure),
    ("Generic.Files.LineLength", line_length),
    ("Generic.Metrics.NestingLevel", nesting_level),
    ("Generic.WhiteSpace.DisallowTabIndent", disallow_tab_indent),
];

/// Look up a built-in sniff factory by code.
pub fn factory(code: &str) -> Option<SniffFactory> {
    BUILTIN.iter().find(|(c, _)| *c == code).map(|(_, f)| *f)
}

/// Parse a numeric property value.
pub(crate) fn parse_usize(property: &str, value: &str) -> Result<usize, PropertyError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| PropertyError::invalid(property, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codes_match_instances() {
        for (code, factory) in BUILTIN {
            let sniff = factory();
            assert_eq!(sniff.code(), *code);
            assert!(!sniff.register().is_empty());
        }
    }

    #[test]
    fn test_factory_lookup() {
        assert!(factory("Generic.Files.LineLength").is_some());
        assert!(factory("Generic.Files.Nope").is_none());
    }

    #[test]
    fn test_unknown_property() {
        let mut sniff = UnmatchedBracketSniff;
        let err = sniff.set_property("limit", "3").unwrap_err();
        assert!(matches!(err, PropertyError::Unknown { .. }));
    }
}
