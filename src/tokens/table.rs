//! Per-dialect token tables.
//!
//! A table is pure data: which kinds carry no meaning (whitespace, comments),
//! which kinds own parentheses, and for every scope-opening kind how its body
//! starts and ends. The augmentation algorithms consult nothing else, so a
//! new dialect only needs a lexer and a table.
//!
//! Tables can be written in YAML:
//!
//! ```yaml
//! dialect: mini
//! empty: [WHITESPACE, COMMENT]
//! scope_openers:
//!   IF:
//!     start: [OPEN_CURLY_BRACKET]
//!     end: [CLOSE_CURLY_BRACKET]
//!     optional_body: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::TokenKind;

/// Default number of lines the scope resolver scans for an opener before
/// giving up on a non-strict construct.
pub const DEFAULT_GIVE_UP_LINES: usize = 3;

/// How a scope-opening kind finds its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    /// Kinds that open the body.
    pub start: Vec<TokenKind>,
    /// Kinds that close the body. The first entry is the primary terminator.
    pub end: Vec<TokenKind>,
    /// Keep looking for an opener regardless of distance.
    #[serde(default)]
    pub strict: bool,
    /// Several constructs of this kind may end at one closer.
    #[serde(default)]
    pub shared: bool,
    /// Kinds this one may share a closer with.
    #[serde(default)]
    pub with: Vec<TokenKind>,
    /// A statement terminator before the opener means there is no block body.
    #[serde(default)]
    pub optional_body: bool,
    /// End kinds that only count as a closer once they are shown to open a
    /// body of their own (`else` closing an alternative-syntax `if`).
    #[serde(default)]
    pub continuations: Vec<TokenKind>,
    /// Kinds that may follow the closer as further blocks of the same
    /// statement (`catch` after `try`).
    #[serde(default)]
    pub followed_by: Vec<TokenKind>,
}

impl ScopeRule {
    fn block(start: &[TokenKind], end: &[TokenKind]) -> Self {
        Self {
            start: start.to_vec(),
            end: end.to_vec(),
            strict: false,
            shared: false,
            with: Vec::new(),
            optional_body: false,
            continuations: Vec::new(),
            followed_by: Vec::new(),
        }
    }

    fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn optional(mut self) -> Self {
        self.optional_body = true;
        self
    }

    fn with(mut self, kinds: &[TokenKind]) -> Self {
        self.with = kinds.to_vec();
        self
    }

    fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    fn continued_by(mut self, kinds: &[TokenKind]) -> Self {
        self.continuations = kinds.to_vec();
        self
    }

    fn followed_by(mut self, kinds: &[TokenKind]) -> Self {
        self.followed_by = kinds.to_vec();
        self
    }

    /// The first declared terminator.
    pub fn primary_end(&self) -> Option<TokenKind> {
        self.end.first().copied()
    }
}

/// Structural description of one dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTable {
    /// Dialect identifier sniffs declare compatibility with.
    pub dialect: String,
    /// Kinds with no syntactic meaning.
    #[serde(default)]
    pub empty: HashSet<TokenKind>,
    /// Kinds scanned for inline directives.
    #[serde(default)]
    pub comments: HashSet<TokenKind>,
    /// Kinds whose content may contain tabs to expand.
    #[serde(default)]
    pub tab_kinds: HashSet<TokenKind>,
    /// Kinds whose length never varies.
    #[serde(default)]
    pub known_lengths: HashMap<TokenKind, usize>,
    /// Kinds that own the parenthesis pair following them.
    #[serde(default)]
    pub parenthesis_owners: HashSet<TokenKind>,
    /// Scope-opening kinds.
    #[serde(default)]
    pub scope_openers: HashMap<TokenKind, ScopeRule>,
    /// Kinds that may end a scope even when not listed by the construct.
    #[serde(default)]
    pub end_scope: HashSet<TokenKind>,
    /// End-scope kinds that never end a construct that did not list them.
    #[serde(default)]
    pub soft_terminators: HashSet<TokenKind>,
    /// Statement terminators.
    #[serde(default)]
    pub statement_terminators: HashSet<TokenKind>,
    /// Kinds that make a following curly bracket a string offset.
    #[serde(default)]
    pub value_references: HashSet<TokenKind>,
    /// Scope openers ignored when they appear inside another construct's header.
    #[serde(default)]
    pub inline_openers: HashSet<TokenKind>,
    /// Closure-like kinds resolved in place inside another construct's header.
    #[serde(default)]
    pub closures: HashSet<TokenKind>,
    /// Lines to scan for an opener before abandoning a non-strict construct.
    #[serde(default = "default_give_up_lines")]
    pub give_up_lines: usize,
    /// Refuse input whose average line length suggests minified content.
    #[serde(default)]
    pub skip_minified: bool,
}

fn default_give_up_lines() -> usize {
    DEFAULT_GIVE_UP_LINES
}

impl TokenTable {
    /// Parse a table from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table: TokenTable = serde_yaml::from_str(&content)?;
        table.validate()?;
        Ok(table)
    }

    /// Look up a built-in table by dialect name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "clike" => Some(Self::clike()),
            _ => None,
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (kind, rule) in &self.scope_openers {
            if rule.start.is_empty() {
                anyhow::bail!("scope opener {} has no start kinds", kind);
            }
            if rule.end.is_empty() {
                anyhow::bail!("scope opener {} has no end kinds", kind);
            }
            for cont in &rule.continuations {
                if !rule.end.contains(cont) {
                    anyhow::bail!(
                        "continuation {} of {} must also be an end kind",
                        cont,
                        kind
                    );
                }
            }
        }
        Ok(())
    }

    /// The table for the built-in C-family dialect.
    pub fn clike() -> Self {
        use TokenKind::*;

        let curly: &[TokenKind] = &[OpenCurlyBracket];
        let curly_or_colon: &[TokenKind] = &[OpenCurlyBracket, Colon];
        let case_ends: &[TokenKind] = &[Break, Return, Continue, Throw, Exit];

        let mut scope_openers = HashMap::new();
        scope_openers.insert(
            If,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndIf, Else, ElseIf])
                .optional()
                .with(&[Else, ElseIf])
                .continued_by(&[Else, ElseIf]),
        );
        scope_openers.insert(
            ElseIf,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndIf, Else, ElseIf])
                .optional()
                .with(&[If, Else])
                .continued_by(&[Else, ElseIf]),
        );
        scope_openers.insert(
            Else,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndIf])
                .optional()
                .with(&[If, ElseIf]),
        );
        scope_openers.insert(
            For,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndFor]).optional(),
        );
        scope_openers.insert(
            Foreach,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndForeach]).optional(),
        );
        scope_openers.insert(
            While,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndWhile]).optional(),
        );
        scope_openers.insert(Do, ScopeRule::block(curly, &[CloseCurlyBracket]).strict());
        scope_openers.insert(
            Switch,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndSwitch]).strict(),
        );
        scope_openers.insert(
            Case,
            ScopeRule::block(&[Colon, Semicolon], case_ends)
                .strict()
                .shared()
                .with(&[Default, Case, Switch]),
        );
        scope_openers.insert(
            Default,
            ScopeRule::block(&[Colon, Semicolon], case_ends)
                .strict()
                .shared()
                .with(&[Case, Switch]),
        );
        scope_openers.insert(
            Try,
            ScopeRule::block(curly, &[CloseCurlyBracket])
                .strict()
                .followed_by(&[Catch, Finally]),
        );
        scope_openers.insert(
            Catch,
            ScopeRule::block(curly, &[CloseCurlyBracket])
                .strict()
                .followed_by(&[Catch, Finally]),
        );
        scope_openers.insert(Finally, ScopeRule::block(curly, &[CloseCurlyBracket]).strict());
        scope_openers.insert(Function, ScopeRule::block(curly, &[CloseCurlyBracket]));
        scope_openers.insert(Class, ScopeRule::block(curly, &[CloseCurlyBracket]).strict());
        scope_openers.insert(Interface, ScopeRule::block(curly, &[CloseCurlyBracket]).strict());
        scope_openers.insert(Trait, ScopeRule::block(curly, &[CloseCurlyBracket]).strict());
        scope_openers.insert(Namespace, ScopeRule::block(curly, &[CloseCurlyBracket]));
        scope_openers.insert(Use, ScopeRule::block(curly, &[CloseCurlyBracket]).optional());
        scope_openers.insert(
            Declare,
            ScopeRule::block(curly_or_colon, &[CloseCurlyBracket, EndDeclare]),
        );

        let known_lengths = [
            (ObjectOperator, 2),
            (Semicolon, 1),
            (Colon, 1),
            (Comma, 1),
            (Equal, 1),
            (OpenParenthesis, 1),
            (CloseParenthesis, 1),
            (OpenSquareBracket, 1),
            (CloseSquareBracket, 1),
            (OpenCurlyBracket, 1),
            (CloseCurlyBracket, 1),
            (If, 2),
            (ElseIf, 6),
            (Else, 4),
            (EndIf, 5),
            (For, 3),
            (EndFor, 6),
            (Foreach, 7),
            (EndForeach, 10),
            (While, 5),
            (EndWhile, 8),
            (Do, 2),
            (Switch, 6),
            (EndSwitch, 9),
            (Case, 4),
            (Default, 7),
            (Break, 5),
            (Continue, 8),
            (Return, 6),
            (Throw, 5),
            (Function, 8),
            (Class, 5),
            (Interface, 9),
            (Trait, 5),
            (Namespace, 9),
            (Use, 3),
            (Try, 3),
            (Catch, 5),
            (Finally, 7),
            (Declare, 7),
            (EndDeclare, 10),
            (Array, 5),
            (List, 4),
            (New, 3),
        ]
        .into_iter()
        .collect();

        Self {
            dialect: "clike".to_string(),
            empty: [Whitespace, Comment, DocComment].into_iter().collect(),
            comments: [Comment, DocComment].into_iter().collect(),
            tab_kinds: [Whitespace, Comment, DocComment, String].into_iter().collect(),
            known_lengths,
            parenthesis_owners: [
                Array, Function, While, For, Foreach, Switch, If, ElseIf, Catch, Declare, List,
            ]
            .into_iter()
            .collect(),
            scope_openers,
            end_scope: [CloseCurlyBracket, Break].into_iter().collect(),
            soft_terminators: [Break].into_iter().collect(),
            statement_terminators: [Semicolon].into_iter().collect(),
            value_references: [Variable, ObjectOperator].into_iter().collect(),
            inline_openers: [Use].into_iter().collect(),
            closures: [Function].into_iter().collect(),
            give_up_lines: DEFAULT_GIVE_UP_LINES,
            skip_minified: true,
        }
    }

    pub fn is_empty_kind(&self, kind: TokenKind) -> bool {
        self.empty.contains(&kind)
    }

    pub fn is_comment(&self, kind: TokenKind) -> bool {
        self.comments.contains(&kind)
    }

    pub fn known_length(&self, kind: TokenKind) -> Option<usize> {
        self.known_lengths.get(&kind).copied()
    }

    pub fn owns_parenthesis(&self, kind: TokenKind) -> bool {
        self.parenthesis_owners.contains(&kind)
    }

    /// The scope rule for a kind, if it opens scopes.
    pub fn rule(&self, kind: TokenKind) -> Option<&ScopeRule> {
        self.scope_openers.get(&kind)
    }

    pub fn is_scope_opener(&self, kind: TokenKind) -> bool {
        self.scope_openers.contains_key(&kind)
    }

    pub fn is_terminator(&self, kind: TokenKind) -> bool {
        self.statement_terminators.contains(&kind)
    }

    /// Whether `kind` is declared as able to share a closer with `other`.
    pub fn shares_with(&self, kind: TokenKind, other: TokenKind) -> bool {
        self.rule(kind).is_some_and(|r| r.with.contains(&other))
    }

    /// Whether `kind` continues another construct (appears in any rule's
    /// continuation list).
    pub fn is_continuation(&self, kind: TokenKind) -> bool {
        self.scope_openers
            .values()
            .any(|r| r.continuations.contains(&kind))
    }

    /// Whether `kind` takes part in a continuation chain, either as the head
    /// of one or as a link.
    pub fn in_chain(&self, kind: TokenKind) -> bool {
        self.rule(kind).is_some_and(|r| !r.continuations.is_empty()) || self.is_continuation(kind)
    }

    /// Whether two kinds end on the same primary terminator.
    pub fn same_primary_end(&self, a: TokenKind, b: TokenKind) -> bool {
        match (self.rule(a), self.rule(b)) {
            (Some(ra), Some(rb)) => ra.primary_end() == rb.primary_end(),
            _ => false,
        }
    }
}
