//! tokensniff - token-stream static analysis.
//!
//! A lexer turns source text into a flat token array. The engine augments
//! that array with positions, bracket pairs, parenthesis nesting, scope
//! conditions and nesting levels, then hands it to sniffs that report
//! errors and warnings.
//!
//! # Architecture
//!
//! - `lexer`: the tokenizer boundary and the `clike` reference lexer
//! - `tokens`: token kinds, the augmented token and per-dialect token tables
//! - `augment`: the five augmentation stages
//! - `file`: the per-file view sniffs query and report through
//! - `sniffs`: the `Sniff` trait and built-in sniffs
//! - `dispatch`: calls sniffs for the token kinds they registered
//! - `diagnostics`: per-file finding collection
//! - `config`: YAML rulesets; `context`: the per-run settings built from them
//! - `runner`: checks batches of files in parallel
//! - `report`: output formatting (text, JSON)
//!
//! # Adding a Sniff
//!
//! Implement [`Sniff`] and add a factory for it to `sniffs::BUILTIN`.

pub mod augment;
pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod file;
pub mod lexer;
pub mod report;
pub mod runner;
pub mod sniffs;
pub mod tokens;

pub use augment::{augment, Augmented};
pub use config::Config;
pub use context::AnalysisContext;
pub use diagnostics::{Diagnostics, Finding, MessageKind};
pub use dispatch::Dispatcher;
pub use error::{AnalysisError, PropertyError, TokenizeError};
pub use file::SourceFile;
pub use runner::{FileOutcome, FileResult, RunSummary, Runner};
pub use sniffs::Sniff;
pub use tokens::{Token, TokenKind, TokenTable};
