//! Generic.ControlStructures.InlineControlStructure

use super::Sniff;
use crate::file::SourceFile;
use crate::tokens::TokenKind;

/// Reports control structures whose body is a single statement without
/// braces.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineControlStructureSniff;

impl Sniff for InlineControlStructureSniff {
    fn code(&self) -> &'static str {
        "Generic.ControlStructures.InlineControlStructure"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![
            TokenKind::If,
            TokenKind::ElseIf,
            TokenKind::Else,
            TokenKind::For,
            TokenKind::Foreach,
            TokenKind::While,
            TokenKind::Do,
        ]
    }

    fn dialects(&self) -> &'static [&'static str] {
        &["clike"]
    }

    fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize> {
        let tokens = file.tokens();
        let token = &tokens[index];
        if token.scope_opener.is_some() {
            return None;
        }

        // `else if` is reported on the `if`.
        if token.kind == TokenKind::Else {
            if let Some(next) = file.find_next_non_empty(index + 1) {
                if tokens[next].kind == TokenKind::If {
                    return None;
                }
            }
        }

        // The `while` closing a do-while loop has no body of its own.
        if token.kind == TokenKind::While {
            if let Some(prev) = index.checked_sub(1).and_then(|p| file.find_previous_non_empty(p)) {
                let prev_token = &tokens[prev];
                if prev_token.kind == TokenKind::CloseCurlyBracket
                    && prev_token
                        .scope_condition
                        .is_some_and(|c| tokens[c].kind == TokenKind::Do)
                {
                    return None;
                }
            }
        }

        // A loop header followed directly by a semicolon has an empty body.
        let after_header = token.parenthesis_closer.unwrap_or(index) + 1;
        if let Some(next) = file.find_next_non_empty(after_header) {
            if tokens[next].kind == TokenKind::Semicolon
                && matches!(token.kind, TokenKind::For | TokenKind::Foreach | TokenKind::While)
            {
                return None;
            }
        } else {
            return None;
        }

        file.add_warning("Inline control structures are discouraged", index, "Discouraged");
        None
    }
}
