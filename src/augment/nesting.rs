//! Parenthesis nesting.

use std::collections::BTreeMap;

use crate::tokens::{Token, TokenKind};

/// Record, for every token, the parenthesis pairs that enclose it.
///
/// An opener is not inside its own pair; a closer is recorded after its pair
/// is popped, so both delimiters see the same enclosing set. Openers without
/// a matching closer do not open a level.
pub fn map_parenthesis_nesting(tokens: &mut [Token]) {
    let mut open: BTreeMap<usize, usize> = BTreeMap::new();

    for i in 0..tokens.len() {
        match (tokens[i].kind, tokens[i].parenthesis_closer) {
            (TokenKind::OpenParenthesis, closer) => {
                tokens[i].nested_parenthesis = open.clone();
                if let Some(closer) = closer {
                    open.insert(i, closer);
                }
            }
            (TokenKind::CloseParenthesis, _) => {
                if let Some(opener) = tokens[i].parenthesis_opener {
                    open.remove(&opener);
                }
                tokens[i].nested_parenthesis = open.clone();
            }
            _ => tokens[i].nested_parenthesis = open.clone(),
        }
    }
}
