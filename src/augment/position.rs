//! Line, column and length assignment, plus inline directive scanning.
//!
//! Directives live in comments and use the `tokensniff:` prefix:
//!
//! - `tokensniff:ignore-start [Sniff.Code, ...]` opens an ignored range
//! - `tokensniff:ignore-end` closes it (the closing line is ignored too)
//! - `tokensniff:ignore-line` ignores its own line and the next one
//! - `tokensniff:ignore-file` skips the whole file
//! - `tokensniff:set <Sniff.Code> <property> <value>` changes a sniff setting
//!
//! Anything after ` -- ` is treated as a free-form reason and dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::tokens::{Token, TokenTable};

lazy_static::lazy_static! {
    static ref DIRECTIVE: Regex =
        Regex::new(r"tokensniff:(ignore-start|ignore-end|ignore-line|ignore-file|set)\b(.*)").unwrap();
}

/// Character encoding used to measure token widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: one column per byte.
    Latin1,
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            _ => Err(format!("unsupported encoding: {}", s)),
        }
    }
}

impl Encoding {
    /// Width of `text` in this encoding.
    ///
    /// Falls back to the byte length when the text contains characters the
    /// encoding cannot represent.
    pub fn measure(&self, text: &str) -> usize {
        match self {
            Encoding::Utf8 => text.chars().count(),
            Encoding::Latin1 => {
                if text.chars().all(|c| (c as u32) <= 0xFF) {
                    text.chars().count()
                } else {
                    text.len()
                }
            }
        }
    }
}

/// Inputs to the position mapper.
#[derive(Debug, Clone)]
pub struct PositionOptions {
    /// Tab stop width; 0 disables tab expansion.
    pub tab_width: usize,
    pub encoding: Encoding,
    /// End-of-line marker used by the file.
    pub eol: String,
    /// Honour inline directives.
    pub annotations: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            encoding: Encoding::Utf8,
            eol: "\n".to_string(),
            annotations: true,
        }
    }
}

/// What an ignored line suppresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IgnoreRule {
    /// Every sniff.
    All,
    /// Only the listed sniff codes.
    Sniffs(BTreeSet<String>),
}

impl IgnoreRule {
    /// Whether a finding with this source is suppressed by the rule.
    ///
    /// A listed code matches its own source and any more specific source
    /// below it (`Generic.Files.LineLength` covers
    /// `Generic.Files.LineLength.TooLong`).
    pub fn covers(&self, source: &str) -> bool {
        match self {
            IgnoreRule::All => true,
            IgnoreRule::Sniffs(codes) => codes.iter().any(|code| {
                source == code
                    || (source.starts_with(code.as_str())
                        && source.as_bytes().get(code.len()) == Some(&b'.'))
            }),
        }
    }

    fn merge(&mut self, other: &IgnoreRule) {
        match (&mut *self, other) {
            (IgnoreRule::All, _) => {}
            (_, IgnoreRule::All) => *self = IgnoreRule::All,
            (IgnoreRule::Sniffs(mine), IgnoreRule::Sniffs(theirs)) => {
                mine.extend(theirs.iter().cloned())
            }
        }
    }
}

/// A `set` directive: change one sniff property from this token onwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingChange {
    /// Index of the comment token carrying the directive.
    pub token: usize,
    pub sniff: String,
    pub property: String,
    pub value: String,
}

/// Directives collected while mapping positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Lines whose findings are suppressed.
    pub ignored_lines: BTreeMap<usize, IgnoreRule>,
    /// Setting changes in source order.
    pub settings: Vec<SettingChange>,
    /// The file asked to be skipped entirely.
    pub ignore_file: bool,
}

impl Directives {
    fn ignore_line(&mut self, line: usize, rule: &IgnoreRule) {
        match self.ignored_lines.get_mut(&line) {
            Some(existing) => existing.merge(rule),
            None => {
                self.ignored_lines.insert(line, rule.clone());
            }
        }
    }

    /// The rule for a line, if it is ignored.
    pub fn rule_for(&self, line: usize) -> Option<&IgnoreRule> {
        self.ignored_lines.get(&line)
    }

    /// Whether every sniff is suppressed on `line`.
    pub fn line_fully_ignored(&self, line: usize) -> bool {
        matches!(self.ignored_lines.get(&line), Some(IgnoreRule::All))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    IgnoreStart(IgnoreRule),
    IgnoreEnd,
    IgnoreLine,
    IgnoreFile,
    Set {
        sniff: String,
        property: String,
        value: String,
    },
}

fn parse_directive(comment: &str) -> Option<Directive> {
    let caps = DIRECTIVE.captures(comment)?;
    let name = caps.get(1)?.as_str();
    let mut args = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    if let Some(pos) = args.find(" -- ") {
        args = &args[..pos];
    }
    let args = args
        .trim()
        .trim_end_matches("-->")
        .trim_end_matches("*/")
        .trim();

    match name {
        "ignore-start" => {
            let codes: BTreeSet<String> = args
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if codes.is_empty() {
                Some(Directive::IgnoreStart(IgnoreRule::All))
            } else {
                Some(Directive::IgnoreStart(IgnoreRule::Sniffs(codes)))
            }
        }
        "ignore-end" => Some(Directive::IgnoreEnd),
        "ignore-line" => Some(Directive::IgnoreLine),
        "ignore-file" => Some(Directive::IgnoreFile),
        "set" => {
            let mut parts = args.split_whitespace();
            let sniff = parts.next()?;
            let property = parts.next()?;
            let value = parts.collect::<Vec<_>>().join(" ");
            if sniff.split('.').count() < 3 || value.is_empty() {
                return None;
            }
            Some(Directive::Set {
                sniff: sniff.to_string(),
                property: property.to_string(),
                value,
            })
        }
        _ => None,
    }
}

/// Expand tabs in `content` starting at `column`.
///
/// Returns the rewritten content and its width. A tab moves to the next tab
/// stop (columns 1, 1 + width, ...); a tab that starts on a column divisible
/// by the width counts as a single column.
fn expand_tabs(content: &str, column: usize, tab_width: usize, encoding: Encoding) -> (String, usize) {
    let pieces: Vec<&str> = content.split('\t').collect();
    let last = pieces.len() - 1;
    let mut current = column;
    let mut length = 0;
    let mut expanded = String::with_capacity(content.len() + tab_width * last);

    for (idx, piece) in pieces.iter().enumerate() {
        if !piece.is_empty() {
            expanded.push_str(piece);
            let width = encoding.measure(piece);
            current += width;
            length += width;
        }

        if idx == last {
            break;
        }

        let before = current;
        current += 1;
        if before % tab_width != 0 {
            while current % tab_width != 0 {
                current += 1;
            }
            current += 1;
        }

        let width = current - before;
        length += width;
        expanded.extend(std::iter::repeat(' ').take(width));
    }

    (expanded, length)
}

/// Assign `line`, `column` and `length` to every token and collect inline
/// directives.
///
/// Scanning stops at an `ignore-file` directive; the returned directives then
/// have `ignore_file` set and later tokens keep their default positions.
pub fn map_positions(tokens: &mut [Token], table: &TokenTable, options: &PositionOptions) -> Directives {
    let mut directives = Directives::default();
    let mut line = 1;
    let mut column = 1;
    let eol_len = options.eol.chars().count();
    let mut ignoring: Option<IgnoreRule> = None;

    for i in 0..tokens.len() {
        let kind = tokens[i].kind;
        tokens[i].line = line;
        tokens[i].column = column;

        let known = table.known_length(kind);
        let length = match known {
            Some(len) => len,
            None if options.tab_width == 0
                || !table.tab_kinds.contains(&kind)
                || !tokens[i].content.contains('\t') =>
            {
                options.encoding.measure(&tokens[i].content)
            }
            None => {
                let (expanded, len) =
                    expand_tabs(&tokens[i].content, column, options.tab_width, options.encoding);
                let original = std::mem::replace(&mut tokens[i].content, expanded);
                tokens[i].orig_content = Some(original);
                len
            }
        };
        column += length;
        tokens[i].length = length;

        if known.is_none() && tokens[i].content.contains(options.eol.as_str()) {
            line += 1;
            column = 1;
            tokens[i].length = length.saturating_sub(eol_len);
        }

        let token_line = tokens[i].line;
        if options.annotations && table.is_comment(kind) {
            match parse_directive(tokens[i].original()) {
                Some(Directive::IgnoreStart(rule)) if ignoring.is_none() => {
                    ignoring = Some(rule);
                }
                Some(Directive::IgnoreEnd) => {
                    if let Some(rule) = ignoring.take() {
                        directives.ignore_line(token_line, &rule);
                    }
                }
                Some(Directive::IgnoreLine) if ignoring.is_none() => {
                    directives.ignore_line(token_line, &IgnoreRule::All);
                    directives.ignore_line(token_line + 1, &IgnoreRule::All);
                }
                Some(Directive::IgnoreFile) => {
                    tracing::debug!(token = i, line = token_line, "ignore-file directive found");
                    directives.ignore_file = true;
                    return directives;
                }
                Some(Directive::Set {
                    sniff,
                    property,
                    value,
                }) => {
                    directives.settings.push(SettingChange {
                        token: i,
                        sniff,
                        property,
                        value,
                    });
                }
                _ => {}
            }
        }

        if let Some(rule) = &ignoring {
            directives.ignore_line(token_line, rule);
        }
    }

    directives
}
