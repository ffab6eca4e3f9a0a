//! Nesting level and enclosing conditions.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::tokens::{Token, TokenKind, TokenTable};

/// Stamp every token with the number of scopes enclosing it and the list of
/// their conditions.
///
/// Delimiters belong to the outer level: an opener is stamped before its
/// scope is entered and a closer after its scope is left.
///
/// Two corrections keep the map consistent when scopes overlap:
///
/// - when a scope ends on a closer that belongs to a different, incompatible
///   construct, the condition is removed again from the tokens of the scope;
/// - when a construct opens a scope ending on the same closer as the scope
///   directly enclosing it, and the two can share that closer (consecutive
///   `case` labels), the earlier one is closed first so the two become
///   siblings instead of parent and child.
pub fn annotate_levels(tokens: &mut [Token], table: &TokenTable) {
    let mut level = 0usize;
    let mut conditions: BTreeMap<usize, TokenKind> = BTreeMap::new();
    let mut openers: Vec<usize> = Vec::new();

    for i in 0..tokens.len() {
        tokens[i].level = level;
        tokens[i].conditions = conditions.clone();

        // A token can close one scope and open the next, so closers go first.
        let mut closed = false;
        while let Some(pos) = openers
            .iter()
            .rposition(|&o| tokens[o].scope_closer == Some(i))
        {
            let opener = openers.remove(pos);
            let Some(condition) = tokens[opener].scope_condition else {
                continue;
            };
            if conditions.remove(&condition).is_some() {
                level -= 1;
            }
            closed = true;

            let popped = tokens[condition].kind;
            let owner = tokens[i]
                .scope_condition
                .map(|c| tokens[c].kind)
                .unwrap_or(popped);
            if popped != owner && !table.shares_with(popped, owner) {
                tracing::trace!(closer = i, condition, "closer belongs to another construct");
                correct_range(tokens, opener + 1..i, condition);
            }
        }
        if closed {
            tokens[i].level = level;
            tokens[i].conditions = conditions.clone();
        }

        if tokens[i].scope_opener != Some(i) {
            continue;
        }
        let Some(condition) = tokens[i].scope_condition else {
            continue;
        };

        if let Some(&previous) = openers.last() {
            if let Some(previous_condition) = tokens[previous].scope_condition {
                let this_kind = tokens[condition].kind;
                let previous_kind = tokens[previous_condition].kind;
                if tokens[previous].scope_closer == tokens[i].scope_closer
                    && table.shares_with(this_kind, previous_kind)
                    && table.same_primary_end(this_kind, previous_kind)
                {
                    tracing::trace!(opener = i, previous, "sibling constructs share a closer");
                    correct_range(tokens, previous_condition..i + 1, previous_condition);
                    if conditions.remove(&previous_condition).is_some() {
                        level -= 1;
                    }
                    openers.pop();
                }
            }
        }

        level += 1;
        conditions.insert(condition, tokens[condition].kind);
        openers.push(i);
    }
}

/// Remove `condition` from the conditions of every token in `range`,
/// dropping one level where it was present.
///
/// Returns how many tokens changed. Applying the same correction twice
/// changes nothing the second time.
pub fn correct_range(tokens: &mut [Token], range: Range<usize>, condition: usize) -> usize {
    let mut changed = 0;
    for token in &mut tokens[range] {
        if token.conditions.remove(&condition).is_some() {
            token.level = token.level.saturating_sub(1);
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{augment, PositionOptions};
    use crate::lexer::{CLikeTokenizer, Tokenizer};

    fn annotated(source: &str) -> Vec<Token> {
        let table = TokenTable::clike();
        let raw = CLikeTokenizer.tokenize(source, "\n").unwrap();
        augment(raw, &table, &PositionOptions::default()).unwrap().tokens
    }

    fn find(tokens: &[Token], content: &str, nth: usize) -> usize {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.content == content)
            .nth(nth)
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_levels_and_conditions() {
        let source = "function f() {\n  if ($a) {\n    x();\n  }\n}\n";
        let tokens = annotated(source);
        let if_ = find(&tokens, "if", 0);
        let x = find(&tokens, "x", 0);

        assert_eq!(tokens[0].level, 0);
        assert_eq!(tokens[if_].level, 1);
        assert_eq!(tokens[if_].conditions.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(tokens[x].level, 2);
        assert_eq!(
            tokens[x].conditions.values().copied().collect::<Vec<_>>(),
            vec![TokenKind::Function, TokenKind::If]
        );

        // Delimiters sit at the outer level.
        assert_eq!(tokens[find(&tokens, "{", 1)].level, 1);
        assert_eq!(tokens[find(&tokens, "}", 0)].level, 1);
        assert_eq!(tokens[find(&tokens, "}", 1)].level, 0);
    }

    #[test]
    fn test_level_matches_conditions() {
        let source = "class A {\n  function f() {\n    switch ($a) {\n      case 1:\n        x();\n        break;\n      default:\n        y();\n    }\n  }\n}\n";
        for (i, token) in annotated(source).iter().enumerate() {
            assert_eq!(token.level, token.conditions.len(), "token {}", i);
        }
    }

    #[test]
    fn test_cases_are_siblings() {
        let source = "switch ($a) {\n  case 1:\n  case 2:\n    x();\n    break;\n}\n";
        let tokens = annotated(source);
        let x = find(&tokens, "x", 0);
        let case2 = find(&tokens, "case", 1);

        assert_eq!(tokens[case2].level, 1);
        assert_eq!(tokens[x].level, 2);
        let kinds: Vec<TokenKind> = tokens[x].conditions.values().copied().collect();
        assert_eq!(kinds, vec![TokenKind::Switch, TokenKind::Case]);
        assert_eq!(tokens[x].conditions.keys().nth(1), Some(&case2));
        assert_eq!(tokens[find(&tokens, "}", 0)].level, 0);
    }

    #[test]
    fn test_shared_closer_correction_is_idempotent() {
        let source = "switch ($a) {\n  case 1:\n  case 2:\n    x();\n    break;\n}\n";
        let mut tokens = annotated(source);
        let case1 = find(&tokens, "case", 0);
        let colon2 = find(&tokens, ":", 1);
        // The annotator already lifted case 1 out of the range up to case 2's opener.
        assert!(tokens[case1 + 1..=colon2].iter().all(|t| !t.conditions.contains_key(&case1)));

        let snapshot = tokens.clone();
        assert_eq!(correct_range(&mut tokens, case1..colon2 + 1, case1), 0);
        assert_eq!(tokens, snapshot);

        annotate_levels(&mut tokens, &TokenTable::clike());
        assert_eq!(tokens, snapshot);
    }

    #[test]
    fn test_unclosed_scope_does_not_underflow() {
        let tokens = annotated("}\n}\nfunction f() {\n");
        assert!(tokens.iter().all(|t| t.level == 0));
    }
}
