//! Generic.WhiteSpace.DisallowTabIndent

use super::Sniff;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// Reports lines indented with tabs.
///
/// Tab expansion rewrites token content, so the check looks at the content
/// the lexer produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisallowTabIndentSniff;

impl Sniff for DisallowTabIndentSniff {
    fn code(&self) -> &'static str {
        "Generic.WhiteSpace.DisallowTabIndent"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Whitespace, TokenKind::Comment, TokenKind::DocComment]
    }

    fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize> {
        let token = &file.tokens()[index];
        if token.column != 1 {
            return None;
        }
        let indent_has_tab = token
            .original()
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .any(|c| c == '\t');
        if indent_has_tab {
            file.add_error("Spaces must be used to indent lines; tabs are not allowed", index, "TabsUsed");
        }
        None
    }
}
