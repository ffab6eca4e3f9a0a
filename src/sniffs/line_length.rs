//! Generic.Files.LineLength

use super::{parse_usize, Sniff};
use crate::error::PropertyError;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// Warns about lines longer than `line_limit` and errors on lines longer
/// than `absolute_line_limit` (0 disables the error).
///
/// Widths use expanded tabs and exclude the end-of-line marker. Each call
/// measures the line of the token it is given and skips to the next line.
#[derive(Debug, Clone)]
pub struct LineLengthSniff {
    pub line_limit: usize,
    pub absolute_line_limit: usize,
}

impl Default for LineLengthSniff {
    fn default() -> Self {
        Self {
            line_limit: 80,
            absolute_line_limit: 100,
        }
    }
}

impl Sniff for LineLengthSniff {
    fn code(&self) -> &'static str {
        "Generic.Files.LineLength"
    }

    fn register(&self) -> Vec<TokenKind> {
        TokenKind::ALL.to_vec()
    }

    fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        match name {
            "line_limit" => self.line_limit = parse_usize(name, value)?,
            "absolute_line_limit" => self.absolute_line_limit = parse_usize(name, value)?,
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
        let line = tokens[index].line;
        let last = tokens[index..]
            .iter()
            .take_while(|t| t.line == line)
            .count()
            + index
            - 1;
        let width = tokens[last].column + tokens[last].length - 1;

        if self.absolute_line_limit > 0 && width > self.absolute_line_limit {
            file.add_error(
                format!(
                    "Line exceeds maximum limit of {} characters; contains {} characters",
                    self.absolute_line_limit, width
                ),
                index,
                "MaxExceeded",
            );
        } else if width > self.line_limit {
            file.add_warning(
                format!(
                    "Line exceeds {} characters; contains {} characters",
                    self.line_limit, width
                ),
                index,
                "TooLong",
            );
        }

        // Resume on the next line.
        Some(last + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::augment;
    use crate::context::AnalysisContext;
    use crate::diagnostics::MessageKind;
    use crate::lexer::{CLikeTokenizer, Tokenizer};
    use crate::tokens::TokenTable;

    fn check(sniff: &mut LineLengthSniff, source: &str) -> Vec<(usize, MessageKind, String)> {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let raw = CLikeTokenizer.tokenize(source, "\n").unwrap();
        let augmented = augment(raw, &ctx.table, &ctx.position_options("\n")).unwrap();
        let mut file = SourceFile::new("t.c", augmented, "\n", &ctx);
        file.set_active_sniff(Some(sniff.code()));
        let mut index = 0;
        while index < file.tokens().len() {
            let next = sniff.process(&mut file, index).unwrap();
            assert!(next > index);
            assert_ne!(file.tokens().get(next).map(|t| t.line), Some(file.tokens()[index].line));
            index = next;
        }
        file.into_diagnostics()
            .finalize()
            .into_iter()
            .map(|f| (f.line, f.kind, f.source))
            .collect()
    }

    #[test]
    fn test_long_lines() {
        let mut sniff = LineLengthSniff {
            line_limit: 10,
            absolute_line_limit: 20,
        };
        let source = format!("short();\n{}();\n{}();\n", "a".repeat(12), "b".repeat(30));
        let found = check(&mut sniff, &source);
        assert_eq!(
            found,
            vec![
                (2, MessageKind::Warning, "Generic.Files.LineLength.TooLong".to_string()),
                (3, MessageKind::Error, "Generic.Files.LineLength.MaxExceeded".to_string()),
            ]
        );
    }

    #[test]
    fn test_tabs_count_expanded() {
        let mut sniff = LineLengthSniff {
            line_limit: 8,
            absolute_line_limit: 0,
        };
        // Two tabs reach column 9; "x;" makes the line 10 wide.
        let found = check(&mut sniff, "\t\tx;\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, MessageKind::Warning);
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut sniff = LineLengthSniff {
            line_limit: 5,
            absolute_line_limit: 0,
        };
        let found = check(&mut sniff, "ok;\nlonger_line();");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 2);
    }

    #[test]
    fn test_properties() {
        let mut sniff = LineLengthSniff::default();
        sniff.set_property("line_limit", "120").unwrap();
        assert_eq!(sniff.line_limit, 120);
        assert!(matches!(
            sniff.set_property("line_limit", "wide"),
            Err(PropertyError::Invalid { .. })
        ));
        assert!(sniff.set_property("colour", "red").is_err());
    }
}
