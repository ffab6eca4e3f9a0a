//! Structural checks on the augmented token stream of every fixture.

use std::path::PathBuf;

use tokensniff::augment::{augment, PositionOptions};
use tokensniff::lexer::{detect_line_ending, CLikeTokenizer, Tokenizer};
use tokensniff::{Token, TokenKind, TokenTable};

const FIXTURES: &[&str] = &["clean.c", "inline.c", "deep.c", "directives.c", "brackets.c", "tabs.c"];

fn load(name: &str) -> (String, Vec<Token>) {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name);
    let source = std::fs::read_to_string(&path).expect("should read fixture");
    let eol = detect_line_ending(&source);
    let raw = CLikeTokenizer.tokenize(&source, eol).expect("fixture should tokenize");
    let options = PositionOptions {
        eol: eol.to_string(),
        ..PositionOptions::default()
    };
    let augmented = augment(raw, &TokenTable::clike(), &options).expect("fixture should augment");
    (source, augmented.tokens)
}

#[test]
fn test_original_content_round_trips() {
    for name in FIXTURES {
        let (source, tokens) = load(name);
        let rebuilt: String = tokens.iter().map(|t| t.original()).collect();
        assert_eq!(rebuilt, source, "{}", name);
    }
}

#[test]
fn test_bracket_pairs_are_symmetric() {
    for name in FIXTURES {
        let (_, tokens) = load(name);
        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::OpenParenthesis => {
                    if let Some(closer) = token.parenthesis_closer {
                        assert_eq!(tokens[closer].parenthesis_opener, Some(i), "{} token {}", name, i);
                        assert_eq!(tokens[closer].parenthesis_owner, token.parenthesis_owner);
                    }
                }
                TokenKind::OpenSquareBracket | TokenKind::OpenCurlyBracket => {
                    if let Some(closer) = token.bracket_closer {
                        assert_eq!(tokens[closer].bracket_opener, Some(i), "{} token {}", name, i);
                    }
                }
                _ => {}
            }
        }
    }
}

#[test]
fn test_levels_match_conditions() {
    for name in FIXTURES {
        let (_, tokens) = load(name);
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.level, token.conditions.len(), "{} token {}", name, i);
            assert!(token.conditions.keys().all(|&c| c < i), "{} token {}", name, i);
        }
    }
}

#[test]
fn test_scope_triples_point_back() {
    for name in FIXTURES {
        let (_, tokens) = load(name);
        for (i, token) in tokens.iter().enumerate() {
            if token.scope_condition != Some(i) {
                continue;
            }
            let (Some(opener), Some(closer)) = (token.scope_opener, token.scope_closer) else {
                panic!("{}: condition {} without opener or closer", name, i);
            };
            assert!(i <= opener && opener < closer, "{} token {}", name, i);
            assert_eq!(tokens[opener].scope_condition, Some(i), "{} token {}", name, i);
            assert_eq!(tokens[opener].scope_closer, Some(closer), "{} token {}", name, i);
        }
    }
}

#[test]
fn test_body_tokens_are_one_level_deeper() {
    let (_, tokens) = load("deep.c");
    let function = 0;
    let opener = tokens[function].scope_opener.expect("function has a body");
    let closer = tokens[function].scope_closer.expect("function has a closer");
    assert_eq!(tokens[opener].level, 0);
    assert_eq!(tokens[closer].level, 0);
    assert!(tokens[opener + 1..closer].iter().all(|t| t.level >= 1));
    let deepest = tokens.iter().map(|t| t.level).max().unwrap();
    assert_eq!(deepest, 7);
}
