//! Bracket and parenthesis matching.

use crate::tokens::{Token, TokenKind, TokenTable};

/// Pair up parentheses, square brackets and curly brackets, and attach
/// owned parentheses to their owner keyword.
///
/// Unmatched closers are left without a partner. Scope braces are paired
/// here as well; scope resolution runs afterwards and adds the scope triple
/// on top of the bracket pair.
pub fn match_brackets(tokens: &mut [Token], table: &TokenTable) {
    let mut squares: Vec<usize> = Vec::new();
    let mut curlies: Vec<usize> = Vec::new();
    let mut parens: Vec<usize> = Vec::new();
    let mut pending_owner: Option<usize> = None;

    for i in 0..tokens.len() {
        let kind = tokens[i].kind;

        if table.owns_parenthesis(kind) {
            tokens[i].parenthesis_owner = Some(i);
            pending_owner = Some(i);
            continue;
        }

        match kind {
            TokenKind::OpenParenthesis => {
                tokens[i].parenthesis_opener = Some(i);
                parens.push(i);
                if let Some(owner) = pending_owner.take() {
                    tokens[owner].parenthesis_opener = Some(i);
                    tokens[i].parenthesis_owner = Some(owner);
                }
            }
            TokenKind::CloseParenthesis => {
                let Some(opener) = parens.pop() else {
                    tracing::trace!(token = i, line = tokens[i].line, "unmatched close parenthesis");
                    continue;
                };
                tokens[i].parenthesis_opener = Some(opener);
                tokens[i].parenthesis_closer = Some(i);
                tokens[opener].parenthesis_closer = Some(i);
                if let Some(owner) = tokens[opener].parenthesis_owner {
                    tokens[owner].parenthesis_closer = Some(i);
                    tokens[i].parenthesis_owner = Some(owner);
                }
            }
            TokenKind::OpenSquareBracket => squares.push(i),
            TokenKind::CloseSquareBracket => {
                if let Some(opener) = squares.pop() {
                    pair(tokens, opener, i);
                }
            }
            TokenKind::OpenCurlyBracket => curlies.push(i),
            TokenKind::CloseCurlyBracket => {
                if let Some(opener) = curlies.pop() {
                    pair(tokens, opener, i);
                }
            }
            _ => {}
        }
    }

    if !parens.is_empty() || !squares.is_empty() || !curlies.is_empty() {
        tracing::trace!(
            parentheses = parens.len(),
            squares = squares.len(),
            curlies = curlies.len(),
            "unmatched openers left at end of file"
        );
    }
}

fn pair(tokens: &mut [Token], opener: usize, closer: usize) {
    tokens[opener].bracket_opener = Some(opener);
    tokens[opener].bracket_closer = Some(closer);
    tokens[closer].bracket_opener = Some(opener);
    tokens[closer].bracket_closer = Some(closer);
}
