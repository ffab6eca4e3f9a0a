//! Reference lexer for the C-family `clike` dialect.
//!
//! Covers the constructs the built-in token table knows about: `//`, `#` and
//! block comments, quoted strings, `$variables`, keywords, numbers, brackets
//! and operators. Multi-line comments and strings are split so that each
//! token ends at most one line.

use phf::phf_map;

use super::Tokenizer;
use crate::error::TokenizeError;
use crate::tokens::{RawToken, TokenKind};

/// Keywords, matched case-insensitively.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "if" => TokenKind::If,
    "elseif" => TokenKind::ElseIf,
    "else" => TokenKind::Else,
    "endif" => TokenKind::EndIf,
    "for" => TokenKind::For,
    "endfor" => TokenKind::EndFor,
    "foreach" => TokenKind::Foreach,
    "endforeach" => TokenKind::EndForeach,
    "while" => TokenKind::While,
    "endwhile" => TokenKind::EndWhile,
    "do" => TokenKind::Do,
    "switch" => TokenKind::Switch,
    "endswitch" => TokenKind::EndSwitch,
    "case" => TokenKind::Case,
    "default" => TokenKind::Default,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "return" => TokenKind::Return,
    "throw" => TokenKind::Throw,
    "exit" => TokenKind::Exit,
    "function" => TokenKind::Function,
    "class" => TokenKind::Class,
    "interface" => TokenKind::Interface,
    "trait" => TokenKind::Trait,
    "namespace" => TokenKind::Namespace,
    "use" => TokenKind::Use,
    "try" => TokenKind::Try,
    "catch" => TokenKind::Catch,
    "finally" => TokenKind::Finally,
    "declare" => TokenKind::Declare,
    "enddeclare" => TokenKind::EndDeclare,
    "array" => TokenKind::Array,
    "list" => TokenKind::List,
    "new" => TokenKind::New,
};

const OPERATOR_CHARS: &str = "+-*/%<>!&|^~?.@=:";

/// Tokenizer for the built-in `clike` dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct CLikeTokenizer;

impl Tokenizer for CLikeTokenizer {
    fn dialect(&self) -> &str {
        "clike"
    }

    fn tokenize(&self, source: &str, _eol: &str) -> Result<Vec<RawToken>, TokenizeError> {
        Scanner::new(source).run()
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<RawToken>,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Vec<RawToken>, TokenizeError> {
        while let Some(c) = self.peek(0) {
            match c {
                '/' if self.peek(1) == Some('/') => self.line_comment(),
                '#' => self.line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment()?,
                '"' | '\'' | '`' => self.string(c)?,
                '$' if self.peek(1).is_some_and(is_ident_start) => {
                    let start = self.pos;
                    self.pos += 1;
                    self.take_while(is_ident_continue);
                    self.emit(TokenKind::Variable, start);
                }
                c if c.is_whitespace() => self.whitespace(),
                c if is_ident_start(c) => self.word(),
                c if c.is_ascii_digit() => {
                    let start = self.pos;
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                    self.emit(TokenKind::Number, start);
                }
                _ => self.punctuation(c),
            }
        }
        Ok(self.tokens)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize) {
        let content: String = self.chars[start..self.pos].iter().collect();
        self.tokens.push(RawToken::new(kind, content));
    }

    /// Consume one end-of-line marker if present at the cursor.
    fn eat_eol(&mut self) -> bool {
        match self.peek(0) {
            Some('\r') => {
                self.pos += 1;
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                true
            }
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                true
            }
            _ => false,
        }
    }

    fn whitespace(&mut self) {
        let start = self.pos;
        loop {
            match self.peek(0) {
                Some('\r') | Some('\n') => {
                    self.eat_eol();
                    break;
                }
                Some(c) if c.is_whitespace() => self.pos += 1,
                _ => break,
            }
        }
        self.emit(TokenKind::Whitespace, start);
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        self.take_while(|c| c != '\n' && c != '\r');
        self.eat_eol();
        self.emit(TokenKind::Comment, start);
    }

    fn block_comment(&mut self) -> Result<(), TokenizeError> {
        let first_line = self.line;
        let kind = if self.peek(2) == Some('*') && self.peek(3) != Some('/') {
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        };
        let mut start = self.pos;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(TokenizeError::UnterminatedComment { line: first_line }),
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    self.emit(kind, start);
                    return Ok(());
                }
                Some('\r') | Some('\n') => {
                    self.eat_eol();
                    self.emit(kind, start);
                    start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<(), TokenizeError> {
        let first_line = self.line;
        let mut start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(TokenizeError::UnterminatedString { line: first_line }),
                Some('\\') if !matches!(self.peek(1), None | Some('\r') | Some('\n')) => {
                    self.pos += 2
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    self.emit(TokenKind::String, start);
                    return Ok(());
                }
                Some('\r') | Some('\n') => {
                    self.eat_eol();
                    self.emit(TokenKind::String, start);
                    start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        self.take_while(is_ident_continue);
        let word: String = self.chars[start..self.pos].iter().collect();
        let kind = KEYWORDS
            .get(word.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.tokens.push(RawToken::new(kind, word));
    }

    fn punctuation(&mut self, c: char) {
        let start = self.pos;
        let single = match c {
            '(' => Some(TokenKind::OpenParenthesis),
            ')' => Some(TokenKind::CloseParenthesis),
            '[' => Some(TokenKind::OpenSquareBracket),
            ']' => Some(TokenKind::CloseSquareBracket),
            '{' => Some(TokenKind::OpenCurlyBracket),
            '}' => Some(TokenKind::CloseCurlyBracket),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            ':' if self.peek(1) != Some(':') => Some(TokenKind::Colon),
            '=' if !matches!(self.peek(1), Some('=') | Some('>')) => Some(TokenKind::Equal),
            _ => None,
        };
        if let Some(kind) = single {
            self.pos += 1;
            self.emit(kind, start);
            return;
        }

        if c == '-' && self.peek(1) == Some('>') {
            self.pos += 2;
            self.emit(TokenKind::ObjectOperator, start);
            return;
        }

        if OPERATOR_CHARS.contains(c) {
            let mut len = 1;
            while len < 3 && self.peek(len).is_some_and(|n| OPERATOR_CHARS.contains(n)) {
                // Stop before something that starts a comment.
                if self.peek(len) == Some('/') && matches!(self.peek(len + 1), Some('/') | Some('*')) {
                    break;
                }
                len += 1;
            }
            self.pos += len;
            self.emit(TokenKind::Operator, start);
            return;
        }

        self.pos += 1;
        self.emit(TokenKind::Unknown, start);
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        CLikeTokenizer
            .tokenize(source, "\n")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("if ($x) { foo(); }"),
            vec![
                If,
                Whitespace,
                OpenParenthesis,
                Variable,
                CloseParenthesis,
                Whitespace,
                OpenCurlyBracket,
                Whitespace,
                Identifier,
                OpenParenthesis,
                CloseParenthesis,
                Semicolon,
                Whitespace,
                CloseCurlyBracket,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(kinds("ELSEIF"), vec![TokenKind::ElseIf]);
        assert_eq!(kinds("Function"), vec![TokenKind::Function]);
    }

    #[test]
    fn test_whitespace_ends_at_newline() {
        let tokens = CLikeTokenizer.tokenize("a  \n\n  b", "\n").unwrap();
        let contents: Vec<_> = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "  \n", "\n", "  ", "b"]);
    }

    #[test]
    fn test_block_comment_split_per_line() {
        let tokens = CLikeTokenizer.tokenize("/**\n * doc\n */", "\n").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::DocComment));
        assert_eq!(tokens[1].content, " * doc\n");
    }

    #[test]
    fn test_operators_and_object_operator() {
        use TokenKind::*;
        assert_eq!(
            kinds("$a->b === c::d"),
            vec![
                Variable,
                ObjectOperator,
                Identifier,
                Whitespace,
                Operator,
                Whitespace,
                Identifier,
                Operator,
                Identifier
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let err = CLikeTokenizer.tokenize("x;\n/* never closed", "\n").unwrap_err();
        assert_eq!(err, TokenizeError::UnterminatedComment { line: 2 });
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = CLikeTokenizer.tokenize("$a = 'abc", "\n").unwrap_err();
        assert_eq!(err, TokenizeError::UnterminatedString { line: 1 });
    }
}
