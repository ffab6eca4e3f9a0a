//! Generic.Brackets.UnmatchedBracket

use super::Sniff;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// Reports parentheses and brackets the matcher could not pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmatchedBracketSniff;

impl Sniff for UnmatchedBracketSniff {
    fn code(&self) -> &'static str {
        "Generic.Brackets.UnmatchedBracket"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![
            TokenKind::OpenParenthesis,
            TokenKind::CloseParenthesis,
            TokenKind::OpenSquareBracket,
            TokenKind::CloseSquareBracket,
            TokenKind::OpenCurlyBracket,
            TokenKind::CloseCurlyBracket,
        ]
    }

    fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize> {
        let token = &file.tokens()[index];
        let (unmatched, code) = match token.kind {
            TokenKind::OpenParenthesis => (token.parenthesis_closer.is_none(), "Unclosed"),
            TokenKind::CloseParenthesis => (token.parenthesis_opener.is_none(), "Unopened"),
            TokenKind::OpenSquareBracket | TokenKind::OpenCurlyBracket => {
                (token.bracket_closer.is_none(), "Unclosed")
            }
            TokenKind::CloseSquareBracket | TokenKind::CloseCurlyBracket => {
                (token.bracket_opener.is_none(), "Unopened")
            }
            _ => return None,
        };

        if unmatched {
            let message = if code == "Unclosed" {
                format!("Opening \"{}\" has no matching closer", token.content)
            } else {
                format!("Closing \"{}\" has no matching opener", token.content)
            };
            file.add_error(message, index, code);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::augment;
    use crate::context::AnalysisContext;
    use crate::lexer::{CLikeTokenizer, Tokenizer};
    use crate::tokens::TokenTable;

    fn sources(source: &str) -> Vec<String> {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let raw = CLikeTokenizer.tokenize(source, "\n").unwrap();
        let augmented = augment(raw, &ctx.table, &ctx.position_options("\n")).unwrap();
        let mut file = SourceFile::new("t.c", augmented, "\n", &ctx);
        let mut sniff = UnmatchedBracketSniff;
        file.set_active_sniff(Some(sniff.code()));
        let kinds = sniff.register();
        for i in 0..file.tokens().len() {
            if kinds.contains(&file.tokens()[i].kind) {
                sniff.process(&mut file, i);
            }
        }
        file.into_diagnostics().finalize().into_iter().map(|f| f.source).collect()
    }

    #[test]
    fn test_balanced() {
        assert!(sources("f(a[1], {b: (c)});\n").is_empty());
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(
            sources("f(a;\nb]);\n"),
            vec![
                "Generic.Brackets.UnmatchedBracket.Unopened".to_string(),
            ]
        );
        assert_eq!(
            sources("x = [1, 2;\n"),
            vec!["Generic.Brackets.UnmatchedBracket.Unclosed".to_string()]
        );
    }
}
