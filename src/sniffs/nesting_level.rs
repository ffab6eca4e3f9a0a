//! Generic.Metrics.NestingLevel

use super::{parse_usize, Sniff};
use crate::error::PropertyError;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// Measures how deeply code inside a function body nests.
///
/// A warning is raised above `nesting_level`, an error above
/// `absolute_nesting_level`. The function body is measured as a whole, so
/// the sniff skips straight to the function's closer.
#[derive(Debug, Clone)]
pub struct NestingLevelSniff {
    pub nesting_level: usize,
    pub absolute_nesting_level: usize,
}

impl Default for NestingLevelSniff {
    fn default() -> Self {
        Self {
            nesting_level: 5,
            absolute_nesting_level: 10,
        }
    }
}

impl Sniff for NestingLevelSniff {
    fn code(&self) -> &'static str {
        "Generic.Metrics.NestingLevel"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Function]
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        match name {
            "nesting_level" => self.nesting_level = parse_usize(name, value)?,
            "absolute_nesting_level" => self.absolute_nesting_level = parse_usize(name, value)?,
            _ => {
                return Err(PropertyError::Unknown {
                    sniff: self.code().to_string(),
                    property: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize> {
        let tokens = file.tokens();
        let token = &tokens[index];
        // Interface and abstract declarations have no body.
        let (Some(opener), Some(closer)) = (token.scope_opener, token.scope_closer) else {
            return None;
        };

        let deepest = tokens[opener + 1..closer]
            .iter()
            .map(|t| t.level)
            .max()
            .unwrap_or(0);
        let nesting = deepest.saturating_sub(token.level + 1);

        if nesting > self.absolute_nesting_level {
            file.add_error(
                format!(
                    "Function's nesting level ({}) exceeds allowed maximum of {}",
                    nesting, self.absolute_nesting_level
                ),
                index,
                "MaxExceeded",
            );
        } else if nesting > self.nesting_level {
            file.add_warning(
                format!(
                    "Function's nesting level ({}) exceeds {}; consider refactoring the function",
                    nesting, self.nesting_level
                ),
                index,
                "TooHigh",
            );
        }

        Some(closer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::augment;
    use crate::context::AnalysisContext;
    use crate::diagnostics::{Finding, MessageKind};
    use crate::lexer::{CLikeTokenizer, Tokenizer};
    use crate::tokens::TokenTable;

    fn nested_function(depth: usize) -> String {
        let mut source = String::from("function f() {\n");
        for _ in 0..depth {
            source.push_str("if ($a) {\n");
        }
        source.push_str("x();\n");
        for _ in 0..depth {
            source.push_str("}\n");
        }
        source.push_str("}\n");
        source
    }

    fn check(sniff: &mut NestingLevelSniff, source: &str) -> (Option<usize>, Vec<Finding>) {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let raw = CLikeTokenizer.tokenize(source, "\n").unwrap();
        let augmented = augment(raw, &ctx.table, &ctx.position_options("\n")).unwrap();
        let mut file = SourceFile::new("t.c", augmented, "\n", &ctx);
        file.set_active_sniff(Some(sniff.code()));
        let skip = sniff.process(&mut file, 0);
        (skip, file.into_diagnostics().finalize())
    }

    #[test]
    fn test_shallow_function() {
        let mut sniff = NestingLevelSniff::default();
        let (skip, findings) = check(&mut sniff, &nested_function(2));
        assert!(findings.is_empty());
        assert!(skip.is_some());
    }

    #[test]
    fn test_warning_and_error_levels() {
        let mut sniff = NestingLevelSniff {
            nesting_level: 2,
            absolute_nesting_level: 4,
        };
        let (_, findings) = check(&mut sniff, &nested_function(3));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, MessageKind::Warning);
        assert!(findings[0].message.contains("(3)"));

        let (_, findings) = check(&mut sniff, &nested_function(5));
        assert_eq!(findings[0].kind, MessageKind::Error);
        assert_eq!(findings[0].source, "Generic.Metrics.NestingLevel.MaxExceeded");
    }

    #[test]
    fn test_declaration_without_body() {
        let mut sniff = NestingLevelSniff::default();
        let (skip, findings) = check(&mut sniff, "function f();\n");
        assert_eq!(skip, None);
        assert!(findings.is_empty());
    }
}
