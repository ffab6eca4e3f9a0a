//! Token kinds and the augmented token record.
//!
//! Every stage of the pipeline works on one flat `Vec<Token>`. Relationships
//! between tokens (matched brackets, scope openers, enclosing conditions) are
//! stored as indices into that vector, never as references.

mod table;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use table::{ScopeRule, TokenTable};

/// Kinds of lexical tokens understood by the engine.
///
/// The set is shared by all dialects; a dialect's [`TokenTable`] decides what
/// each kind means structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Whitespace,
    Comment,
    DocComment,
    String,
    Number,
    Variable,
    ObjectOperator,
    Identifier,
    Semicolon,
    Colon,
    Comma,
    Equal,
    Operator,
    OpenParenthesis,
    CloseParenthesis,
    OpenSquareBracket,
    CloseSquareBracket,
    OpenCurlyBracket,
    CloseCurlyBracket,
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    EndFor,
    Foreach,
    EndForeach,
    While,
    EndWhile,
    Do,
    Switch,
    EndSwitch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Throw,
    Exit,
    Function,
    Class,
    Interface,
    Trait,
    Namespace,
    Use,
    Try,
    Catch,
    Finally,
    Declare,
    EndDeclare,
    Array,
    List,
    New,
    Unknown,
}

impl TokenKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [TokenKind] = &[
        TokenKind::Whitespace, TokenKind::Comment, TokenKind::DocComment, TokenKind::String,
        TokenKind::Number, TokenKind::Variable, TokenKind::ObjectOperator,
        TokenKind::Identifier, TokenKind::Semicolon, TokenKind::Colon, TokenKind::Comma,
        TokenKind::Equal, TokenKind::Operator, TokenKind::OpenParenthesis,
        TokenKind::CloseParenthesis, TokenKind::OpenSquareBracket,
        TokenKind::CloseSquareBracket, TokenKind::OpenCurlyBracket,
        TokenKind::CloseCurlyBracket, TokenKind::If, TokenKind::ElseIf, TokenKind::Else,
        TokenKind::EndIf, TokenKind::For, TokenKind::EndFor, TokenKind::Foreach,
        TokenKind::EndForeach, TokenKind::While, TokenKind::EndWhile, TokenKind::Do,
        TokenKind::Switch, TokenKind::EndSwitch, TokenKind::Case, TokenKind::Default,
        TokenKind::Break, TokenKind::Continue, TokenKind::Return, TokenKind::Throw,
        TokenKind::Exit, TokenKind::Function, TokenKind::Class, TokenKind::Interface,
        TokenKind::Trait, TokenKind::Namespace, TokenKind::Use, TokenKind::Try,
        TokenKind::Catch, TokenKind::Finally, TokenKind::Declare, TokenKind::EndDeclare,
        TokenKind::Array, TokenKind::List, TokenKind::New, TokenKind::Unknown,
    ];

    /// Canonical upper-case name, as used in token table files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Whitespace => "WHITESPACE",
            TokenKind::Comment => "COMMENT",
            TokenKind::DocComment => "DOC_COMMENT",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Variable => "VARIABLE",
            TokenKind::ObjectOperator => "OBJECT_OPERATOR",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Colon => "COLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Equal => "EQUAL",
            TokenKind::Operator => "OPERATOR",
            TokenKind::OpenParenthesis => "OPEN_PARENTHESIS",
            TokenKind::CloseParenthesis => "CLOSE_PARENTHESIS",
            TokenKind::OpenSquareBracket => "OPEN_SQUARE_BRACKET",
            TokenKind::CloseSquareBracket => "CLOSE_SQUARE_BRACKET",
            TokenKind::OpenCurlyBracket => "OPEN_CURLY_BRACKET",
            TokenKind::CloseCurlyBracket => "CLOSE_CURLY_BRACKET",
            TokenKind::If => "IF",
            TokenKind::ElseIf => "ELSE_IF",
            TokenKind::Else => "ELSE",
            TokenKind::EndIf => "END_IF",
            TokenKind::For => "FOR",
            TokenKind::EndFor => "END_FOR",
            TokenKind::Foreach => "FOREACH",
            TokenKind::EndForeach => "END_FOREACH",
            TokenKind::While => "WHILE",
            TokenKind::EndWhile => "END_WHILE",
            TokenKind::Do => "DO",
            TokenKind::Switch => "SWITCH",
            TokenKind::EndSwitch => "END_SWITCH",
            TokenKind::Case => "CASE",
            TokenKind::Default => "DEFAULT",
            TokenKind::Break => "BREAK",
            TokenKind::Continue => "CONTINUE",
            TokenKind::Return => "RETURN",
            TokenKind::Throw => "THROW",
            TokenKind::Exit => "EXIT",
            TokenKind::Function => "FUNCTION",
            TokenKind::Class => "CLASS",
            TokenKind::Interface => "INTERFACE",
            TokenKind::Trait => "TRAIT",
            TokenKind::Namespace => "NAMESPACE",
            TokenKind::Use => "USE",
            TokenKind::Try => "TRY",
            TokenKind::Catch => "CATCH",
            TokenKind::Finally => "FINALLY",
            TokenKind::Declare => "DECLARE",
            TokenKind::EndDeclare => "END_DECLARE",
            TokenKind::Array => "ARRAY",
            TokenKind::List => "LIST",
            TokenKind::New => "NEW",
            TokenKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A token as produced by a lexer, before augmentation.
///
/// Lexers must emit at most one end-of-line marker per token, at the end of
/// its content; the position mapper counts one line per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: TokenKind,
    pub content: String,
}

impl RawToken {
    pub fn new(kind: TokenKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// A token with every field derived by the augmentation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Content with tabs expanded to spaces when tab expansion applied.
    pub content: String,
    /// The untouched lexer content, present only when `content` was rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_content: Option<String>,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, with tabs expanded.
    pub column: usize,
    /// Visible width of the token, excluding any end-of-line marker.
    pub length: usize,

    pub parenthesis_opener: Option<usize>,
    pub parenthesis_closer: Option<usize>,
    pub parenthesis_owner: Option<usize>,
    /// Enclosing parenthesis pairs (opener → closer), outermost first.
    /// Empty when the token is not inside any parentheses.
    pub nested_parenthesis: BTreeMap<usize, usize>,

    pub bracket_opener: Option<usize>,
    pub bracket_closer: Option<usize>,

    pub scope_condition: Option<usize>,
    pub scope_opener: Option<usize>,
    pub scope_closer: Option<usize>,

    /// Number of enclosing scopes.
    pub level: usize,
    /// Enclosing scope conditions (condition index → kind), outermost first.
    pub conditions: BTreeMap<usize, TokenKind>,
}

impl Token {
    pub fn new(kind: TokenKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            orig_content: None,
            line: 0,
            column: 0,
            length: 0,
            parenthesis_opener: None,
            parenthesis_closer: None,
            parenthesis_owner: None,
            nested_parenthesis: BTreeMap::new(),
            bracket_opener: None,
            bracket_closer: None,
            scope_condition: None,
            scope_opener: None,
            scope_closer: None,
            level: 0,
            conditions: BTreeMap::new(),
        }
    }

    /// The content as the lexer produced it.
    pub fn original(&self) -> &str {
        self.orig_content.as_deref().unwrap_or(&self.content)
    }

    /// Whether this token is the opening delimiter of its own scope.
    pub fn opens_scope(&self, index: usize) -> bool {
        self.scope_opener == Some(index)
    }
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Self {
        Token::new(raw.kind, raw.content)
    }
}
