//! The per-file view handed to sniffs.

use std::path::{Path, PathBuf};

use crate::augment::{self, Augmented, Directives, IgnoreRule};
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostics, Finding, MessageKind, DEFAULT_SEVERITY, MAX_SEVERITY};
use crate::tokens::{Token, TokenKind, TokenTable};

/// An augmented file being checked.
///
/// Sniffs read tokens through the query methods and report through
/// [`add_error`](Self::add_error) and [`add_warning`](Self::add_warning).
/// Severity thresholds, per-sniff overrides and per-sniff ignore directives
/// are applied here, before a finding reaches the collector.
pub struct SourceFile<'a> {
    path: PathBuf,
    tokens: Vec<Token>,
    directives: Directives,
    eol: String,
    context: &'a AnalysisContext,
    diagnostics: Diagnostics,
    active_sniff: Option<String>,
}

impl<'a> SourceFile<'a> {
    pub fn new(path: impl Into<PathBuf>, augmented: Augmented, eol: &str, context: &'a AnalysisContext) -> Self {
        Self {
            path: path.into(),
            tokens: augmented.tokens,
            directives: augmented.directives,
            eol: eol.to_string(),
            context,
            diagnostics: Diagnostics::new(context.record_mode),
            active_sniff: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn table(&self) -> &TokenTable {
        &self.context.table
    }

    pub fn context(&self) -> &AnalysisContext {
        self.context
    }

    /// End-of-line marker detected for this file.
    pub fn eol(&self) -> &str {
        &self.eol
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Drop findings on lines ignored for every sniff.
    pub(crate) fn purge_ignored(&mut self) -> usize {
        self.diagnostics.purge_ignored(&self.directives)
    }

    pub(crate) fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Code of the sniff currently being dispatched.
    pub fn active_sniff(&self) -> Option<&str> {
        self.active_sniff.as_deref()
    }

    pub(crate) fn set_active_sniff(&mut self, code: Option<&str>) {
        self.active_sniff = code.map(str::to_string);
    }

    // ----- reporting -----

    /// Report an error at `index`. Returns whether it was recorded.
    pub fn add_error(&mut self, message: impl Into<String>, index: usize, code: &str) -> bool {
        self.add_message(MessageKind::Error, message, index, code, None)
    }

    /// Report a warning at `index`. Returns whether it was recorded.
    pub fn add_warning(&mut self, message: impl Into<String>, index: usize, code: &str) -> bool {
        self.add_message(MessageKind::Warning, message, index, code, None)
    }

    /// Report a finding at `index`.
    ///
    /// `code` is appended to the active sniff's code to form the finding's
    /// source; outside a sniff it is used as is. Configured type and severity
    /// overrides for the sniff win over the arguments. Returns whether the
    /// finding was recorded.
    pub fn add_message(
        &mut self,
        kind: MessageKind,
        message: impl Into<String>,
        index: usize,
        code: &str,
        severity: Option<u8>,
    ) -> bool {
        let (line, column) = self
            .tokens
            .get(index)
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));

        let source = match &self.active_sniff {
            Some(sniff) => format!("{}.{}", sniff, code),
            None => code.to_string(),
        };

        let settings = self.active_sniff.as_deref().and_then(|s| self.context.sniff(s));
        let kind = settings.and_then(|s| s.kind).unwrap_or(kind);
        let severity = settings
            .and_then(|s| s.severity)
            .or(severity)
            .unwrap_or(DEFAULT_SEVERITY)
            .min(MAX_SEVERITY);

        let threshold = self.context.threshold(kind);
        if threshold == 0 || severity < threshold {
            return false;
        }

        if let Some(rule @ IgnoreRule::Sniffs(_)) = self.directives.rule_for(line) {
            if rule.covers(&source) {
                self.diagnostics.note_suppressed();
                return false;
            }
        }

        self.diagnostics.record(Finding {
            line,
            column,
            message: message.into(),
            source,
            severity,
            kind,
        });
        true
    }

    // ----- queries -----

    /// First token at or after `start` (and before `end`) whose kind is in `kinds`.
    pub fn find_next(&self, kinds: &[TokenKind], start: usize, end: Option<usize>) -> Option<usize> {
        let end = end.unwrap_or(self.tokens.len()).min(self.tokens.len());
        (start..end).find(|&i| kinds.contains(&self.tokens[i].kind))
    }

    /// First token at or after `start` (and before `end`) whose kind is not in `kinds`.
    pub fn find_next_excluding(&self, kinds: &[TokenKind], start: usize, end: Option<usize>) -> Option<usize> {
        let end = end.unwrap_or(self.tokens.len()).min(self.tokens.len());
        (start..end).find(|&i| !kinds.contains(&self.tokens[i].kind))
    }

    /// Last token at or before `start` (and after `end`) whose kind is in `kinds`.
    pub fn find_previous(&self, kinds: &[TokenKind], start: usize, end: Option<usize>) -> Option<usize> {
        let low = end.map_or(0, |e| e + 1);
        if start >= self.tokens.len() {
            return None;
        }
        (low..=start).rev().find(|&i| kinds.contains(&self.tokens[i].kind))
    }

    /// Last token at or before `start` (and after `end`) whose kind is not in `kinds`.
    pub fn find_previous_excluding(&self, kinds: &[TokenKind], start: usize, end: Option<usize>) -> Option<usize> {
        let low = end.map_or(0, |e| e + 1);
        if start >= self.tokens.len() {
            return None;
        }
        (low..=start).rev().find(|&i| !kinds.contains(&self.tokens[i].kind))
    }

    /// First token at or after `start` that carries meaning.
    pub fn find_next_non_empty(&self, start: usize) -> Option<usize> {
        let table = &self.context.table;
        (start..self.tokens.len()).find(|&i| !table.is_empty_kind(self.tokens[i].kind))
    }

    /// Last token at or before `start` that carries meaning.
    pub fn find_previous_non_empty(&self, start: usize) -> Option<usize> {
        let table = &self.context.table;
        if start >= self.tokens.len() {
            return None;
        }
        (0..=start).rev().find(|&i| !table.is_empty_kind(self.tokens[i].kind))
    }

    /// Like [`find_next`](Self::find_next), but stop at the end of the
    /// current statement. A terminator inside parentheses opened after
    /// `start` does not end the search.
    pub fn find_next_in_statement(&self, kinds: &[TokenKind], start: usize) -> Option<usize> {
        let table = &self.context.table;
        let depth = self.tokens.get(start)?.nested_parenthesis.len();
        for i in start..self.tokens.len() {
            let token = &self.tokens[i];
            if kinds.contains(&token.kind) {
                return Some(i);
            }
            if table.is_terminator(token.kind) && token.nested_parenthesis.len() <= depth {
                return None;
            }
        }
        None
    }

    /// Like [`find_next`](Self::find_next), but bounded by the closer of the
    /// innermost scope enclosing `start`.
    pub fn find_next_in_scope(&self, kinds: &[TokenKind], start: usize) -> Option<usize> {
        let end = self
            .tokens
            .get(start)?
            .conditions
            .keys()
            .next_back()
            .and_then(|&c| self.tokens[c].scope_closer);
        self.find_next(kinds, start, end)
    }

    /// Concatenated content of `length` tokens starting at `start`.
    pub fn tokens_as_string(&self, start: usize, length: usize) -> String {
        let end = start.saturating_add(length).min(self.tokens.len());
        self.tokens
            .get(start..end)
            .map(|slice| slice.iter().map(|t| t.content.as_str()).collect())
            .unwrap_or_default()
    }

    /// Name of the declaration introduced by the keyword at `index`, such as
    /// the function name after `function`. `None` for anonymous functions
    /// and for tokens that do not declare anything.
    pub fn declaration_name(&self, index: usize) -> Option<String> {
        let token = self.tokens.get(index)?;
        if !matches!(
            token.kind,
            TokenKind::Function | TokenKind::Class | TokenKind::Interface | TokenKind::Trait | TokenKind::Namespace
        ) {
            return None;
        }
        let next = self.find_next_non_empty(index + 1)?;
        match self.tokens[next].kind {
            TokenKind::Identifier => Some(self.tokens[next].content.clone()),
            _ => None,
        }
    }

    /// Innermost enclosing condition of `kind`, if any.
    pub fn condition(&self, index: usize, kind: TokenKind) -> Option<usize> {
        self.tokens
            .get(index)?
            .conditions
            .iter()
            .rev()
            .find(|(_, k)| **k == kind)
            .map(|(&c, _)| c)
    }

    /// Whether `index` is inside a scope whose condition is one of `kinds`.
    pub fn has_condition(&self, index: usize, kinds: &[TokenKind]) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|t| t.conditions.values().any(|k| kinds.contains(k)))
    }

    /// Closer of the last construct in the chain that starts at `index`
    /// (`if` … `elseif` … `else`, `try` … `catch` … `finally`).
    pub fn chain_closer(&self, index: usize) -> Option<usize> {
        augment::chain_closer(&self.tokens, &self.context.table, index)
    }
}
