//! Scope resolution.
//!
//! For every scope-opening keyword, find the token that opens its body and
//! the token that closes it, and stamp the `(condition, opener, closer)`
//! triple on all three. The search is a recursive scan driven entirely by the
//! dialect's [`TokenTable`]: a nested scope opener found inside a body is
//! resolved first and the outer scan resumes after its closer.
//!
//! Three situations complicate the scan:
//!
//! - Curly brackets that are not scope delimiters (string offsets, curlies
//!   inside a header) are counted in an `ignore` tally so the matching `}`
//!   is not taken as the closer.
//! - Constructs sharing one closer (`case`/`default` ending on `break`)
//!   return to their parent at the opener so siblings can claim the same
//!   closer.
//! - Continuations (`else` closing an alternative-syntax `if`) only count as
//!   a closer once they are shown to open a compatible body of their own.

use crate::error::AnalysisError;
use crate::tokens::{ScopeRule, Token, TokenKind, TokenTable};

/// Deepest construct nesting the resolver descends into.
pub const MAX_NESTING_DEPTH: usize = 50;

/// Resolve every scope in the file.
///
/// Fails with [`AnalysisError::NestingTooDeep`] when constructs nest more than
/// [`MAX_NESTING_DEPTH`] levels deep.
pub fn resolve_scopes(tokens: &mut [Token], table: &TokenTable) -> Result<(), AnalysisError> {
    let mut resolver = Resolver { tokens, table };
    let mut i = 0;
    while i < resolver.tokens.len() {
        if table.is_scope_opener(resolver.tokens[i].kind) && resolver.tokens[i].scope_condition.is_none() {
            let mut ignore = 0;
            i = resolver.recurse(i, 1, &mut ignore)?;
        }
        i += 1;
    }
    Ok(())
}

/// Outcome of checking a closer candidate.
enum Closing {
    /// The construct is resolved; resume the caller from this index.
    Done(usize),
    /// The candidate did not close the construct; keep scanning after this index.
    Rejected(usize),
}

struct Resolver<'a> {
    tokens: &'a mut [Token],
    table: &'a TokenTable,
}

impl<'a> Resolver<'a> {
    fn stamp(&mut self, token: usize, condition: usize, opener: usize, closer: usize) {
        let t = &mut self.tokens[token];
        t.scope_condition = Some(condition);
        t.scope_opener = Some(opener);
        t.scope_closer = Some(closer);
    }

    /// Whether `index` lies inside the parentheses owned by `owner`.
    fn in_header(&self, owner: usize, index: usize) -> bool {
        self.tokens[owner]
            .parenthesis_closer
            .is_some_and(|closer| index < closer)
    }

    fn next_non_empty(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.table.is_empty_kind(self.tokens[i].kind))
    }

    /// Recurse one level deeper, enforcing the nesting limit.
    fn descend(&mut self, start: usize, depth: usize, ignore: &mut usize) -> Result<usize, AnalysisError> {
        if depth > MAX_NESTING_DEPTH {
            tracing::debug!(token = start, line = self.tokens[start].line, depth, "nesting limit exceeded");
            return Err(AnalysisError::NestingTooDeep {
                depth,
                token: start,
            });
        }
        self.recurse(start, depth, ignore)
    }

    /// Resolve the construct starting at `start`.
    ///
    /// Returns the index the caller should resume scanning from (the caller
    /// advances past it).
    fn recurse(&mut self, start: usize, depth: usize, ignore: &mut usize) -> Result<usize, AnalysisError> {
        let table = self.table;
        let current = self.tokens[start].kind;
        let Some(rule) = table.rule(current) else {
            return Ok(start);
        };

        tracing::trace!(token = start, kind = %current, depth, "resolving scope");

        let mut opener: Option<usize> = rule.start.contains(&current).then_some(start);
        let mut start_line = self.tokens[start].line;
        let original_ignore = *ignore;
        let len = self.tokens.len();

        let mut i = start;
        loop {
            i += 1;
            if i >= len {
                break;
            }
            let kind = self.tokens[i].kind;

            if rule.optional_body && opener.is_none() && table.is_terminator(kind) && !self.in_header(start, i) {
                tracing::trace!(token = start, at = i, "no body before statement end");
                return Ok(i);
            }

            if opener.is_none() && *ignore == 0 && kind == TokenKind::CloseCurlyBracket && rule.end.contains(&kind) {
                tracing::trace!(token = start, at = i, "closer found before opener");
                return Ok(i - 1);
            }

            if let Some(op) = opener {
                if (self.tokens[i].scope_opener.is_none() || rule.shared) && rule.end.contains(&kind) {
                    if *ignore > 0 && kind == TokenKind::CloseCurlyBracket {
                        *ignore -= 1;
                        continue;
                    }
                    if self.tokens[op].kind == TokenKind::OpenCurlyBracket && kind != TokenKind::CloseCurlyBracket {
                        // A curly body only ends on a curly.
                    } else {
                        match self.close(start, op, i, rule, depth, ignore, original_ignore)? {
                            Closing::Done(resume) => return Ok(resume),
                            Closing::Rejected(resume) => {
                                i = resume;
                                continue;
                            }
                        }
                    }
                }
            }

            if table.is_scope_opener(kind) {
                if opener.is_none() {
                    if table.inline_openers.contains(&kind) {
                        continue;
                    }
                    if table.closures.contains(&kind) && !table.closures.contains(&current) {
                        if self.tokens[i].scope_condition.is_some() {
                            if let Some(closer) = self.tokens[i].scope_closer {
                                i = closer;
                            }
                        } else {
                            i = self.descend(i, depth + 1, ignore)?;
                        }
                        continue;
                    }
                    if table.in_chain(current) && table.is_continuation(kind) {
                        return Ok(i - 1);
                    }
                    tracing::trace!(token = start, at = i, kind = %kind, "found another opener before a body");
                    return Ok(start);
                }

                let Some(nested) = table.rule(kind) else {
                    continue;
                };
                if self.tokens[i].scope_condition.is_some() {
                    if !nested.shared {
                        if let Some(closer) = self.tokens[i].scope_closer {
                            i = closer;
                        }
                    }
                    continue;
                }

                let resets_ignore = nested.end.contains(&TokenKind::CloseCurlyBracket);
                let saved_ignore = *ignore;
                if resets_ignore {
                    *ignore = 0;
                }
                let nested_depth = if nested.shared && nested.with.contains(&current) {
                    depth.saturating_sub(1)
                } else {
                    depth
                };
                i = self.descend(i, nested_depth + 1, ignore)?;
                if resets_ignore {
                    *ignore = saved_ignore;
                }
                continue;
            }

            if opener.is_none() && rule.start.contains(&kind) {
                if kind == TokenKind::OpenCurlyBracket {
                    if self.in_header(start, i) {
                        *ignore += 1;
                    } else if let Some(prev) =
                        (start + 1..i).rev().find(|&p| !table.is_empty_kind(self.tokens[p].kind))
                    {
                        if table.value_references.contains(&self.tokens[prev].kind) {
                            *ignore += 1;
                        }
                    }
                }
                if *ignore == 0 || kind != TokenKind::OpenCurlyBracket {
                    tracing::trace!(token = start, opener = i, "found scope opener");
                    opener = Some(i);
                }
            } else if kind == TokenKind::OpenParenthesis {
                if let (Some(owner), Some(closer)) =
                    (self.tokens[i].parenthesis_owner, self.tokens[i].parenthesis_closer)
                {
                    if table.is_scope_opener(self.tokens[owner].kind) {
                        start_line = self.tokens[closer].line;
                    }
                }
            } else if kind == TokenKind::OpenCurlyBracket && opener.is_some() {
                *ignore += 1;
            } else if kind == TokenKind::CloseCurlyBracket && *ignore > 0 {
                *ignore -= 1;
            } else if opener.is_none() {
                if self.tokens[i].line >= start_line + table.give_up_lines
                    && !table.is_empty_kind(self.tokens[i - 1].kind)
                {
                    if !rule.strict {
                        tracing::trace!(token = start, at = i, "no opener found nearby; giving up");
                        return Ok(start);
                    }
                }
            } else if let Some(op) = opener {
                if !table.soft_terminators.contains(&kind)
                    && table.end_scope.contains(&kind)
                    && self.tokens[i].scope_condition.is_none()
                {
                    if *ignore > 0 {
                        *ignore -= 1;
                    } else {
                        tracing::trace!(token = start, closer = i, kind = %kind, "unexpected closer ends scope");
                        for t in [start, op] {
                            self.stamp(t, start, op, i);
                        }
                        return Ok(i - 1);
                    }
                }
            }
        }

        Ok(start)
    }

    /// Handle a closer candidate at `closer` for the construct at `start`.
    #[allow(clippy::too_many_arguments)]
    fn close(
        &mut self,
        start: usize,
        opener: usize,
        closer: usize,
        rule: &ScopeRule,
        depth: usize,
        ignore: &mut usize,
        original_ignore: usize,
    ) -> Result<Closing, AnalysisError> {
        let table = self.table;
        let kind = self.tokens[closer].kind;
        let mut resume = closer;
        let mut todo = vec![start, opener];

        if rule.continuations.contains(&kind) {
            // The continuation must open a body of its own, compatible with
            // ours, before it counts as our closer. It sits beside us, not
            // inside us, so it is resolved at our depth.
            resume = self.recurse(closer, depth, ignore)?;
            let compatible = self.tokens[closer]
                .scope_opener
                .is_some_and(|cont| self.tokens[cont].kind == self.tokens[opener].kind);
            if !compatible {
                tracing::trace!(token = start, at = closer, "continuation does not close this scope");
                return Ok(Closing::Rejected(resume.max(closer)));
            }
        } else {
            todo.push(closer);
        }

        for t in todo {
            self.stamp(t, start, opener, closer);
        }
        tracing::trace!(token = start, opener, closer, "scope resolved");

        if rule.shared {
            *ignore = original_ignore;
            return Ok(Closing::Done(opener));
        }

        if resume == closer && table.is_scope_opener(kind) {
            // The closer opens a scope of its own; let the caller revisit it.
            self.tokens[closer].scope_condition = None;
            return Ok(Closing::Done(closer - 1));
        }

        Ok(Closing::Done(self.follow_sequence(resume, rule, depth)?))
    }

    /// Resolve the blocks that may follow a closed construct (`catch` and
    /// `finally` after `try`). Returns the index to resume from.
    fn follow_sequence(&mut self, mut resume: usize, rule: &ScopeRule, depth: usize) -> Result<usize, AnalysisError> {
        if rule.followed_by.is_empty() {
            return Ok(resume);
        }
        while let Some(next) = self.next_non_empty(resume + 1) {
            if !rule.followed_by.contains(&self.tokens[next].kind) || self.tokens[next].scope_condition.is_some() {
                break;
            }
            // Sibling blocks share the depth of the construct they follow.
            let mut ignore = 0;
            let end = self.recurse(next, depth, &mut ignore)?;
            match self.tokens[next].scope_closer {
                Some(closer) if self.tokens[next].scope_condition == Some(next) => {
                    resume = end.max(closer);
                }
                _ => break,
            }
        }
        Ok(resume)
    }
}

/// Follow a chain of continuation constructs (`if` → `elseif` → `else`) from
/// `start` and return the closer of the last link.
///
/// A link is followed when the next non-empty token after a closer is a
/// continuation kind with a resolved scope, or when a bare `else` is
/// followed by a chained construct such as `if`.
pub fn chain_closer(tokens: &[Token], table: &TokenTable, start: usize) -> Option<usize> {
    let mut closer = tokens.get(start)?.scope_closer?;
    loop {
        // An alternative-syntax chain closes on the continuation itself.
        let current = &tokens[closer];
        if table.is_continuation(current.kind) && current.scope_condition == Some(closer) {
            closer = current.scope_closer?;
            continue;
        }

        let next = (closer + 1..tokens.len()).find(|&i| !table.is_empty_kind(tokens[i].kind));
        let Some(next) = next else {
            return Some(closer);
        };
        let token = &tokens[next];
        if !table.is_continuation(token.kind) {
            return Some(closer);
        }
        match token.scope_closer {
            Some(next_closer) if token.scope_condition == Some(next) => closer = next_closer,
            _ => {
                // `else if (...)`: a bare else chained to a scoped if.
                let follow = (next + 1..tokens.len()).find(|&i| !table.is_empty_kind(tokens[i].kind));
                match follow.map(|i| (i, &tokens[i])) {
                    Some((i, t)) if table.in_chain(t.kind) && t.scope_condition == Some(i) => {
                        closer = t.scope_closer?;
                    }
                    _ => return Some(closer),
                }
            }
        }
    }
}
