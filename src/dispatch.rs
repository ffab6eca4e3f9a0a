//! Listener dispatch.
//!
//! The dispatcher owns one instance of every active sniff for a file and
//! walks the augmented tokens once, calling each sniff registered for a
//! token's kind. Sniffs are unregistered by tombstoning their slot, so
//! removing one never shifts the listeners still to be visited.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::context::AnalysisContext;
use crate::error::PropertyError;
use crate::file::SourceFile;
use crate::sniffs::{Sniff, SniffFactory};
use crate::tokens::TokenKind;

struct Registration {
    code: &'static str,
    sniff: Box<dyn Sniff>,
}

/// Registry of sniffs keyed by the token kinds they listen for.
#[derive(Default)]
pub struct Dispatcher {
    sniffs: Vec<Option<Registration>>,
    listeners: HashMap<TokenKind, Vec<usize>>,
    timings: BTreeMap<String, Duration>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dispatcher from factories, skipping sniffs the context
    /// disables and applying configured properties.
    pub fn from_factories(factories: &[(&str, SniffFactory)], context: &AnalysisContext) -> Result<Self, PropertyError> {
        let mut dispatcher = Self::new();
        for (code, factory) in factories {
            if !context.sniff_enabled(code) {
                tracing::debug!(sniff = code, "sniff disabled by configuration");
                continue;
            }
            dispatcher.register(factory());
            if let Some(settings) = context.sniff(code) {
                for (name, value) in &settings.properties {
                    dispatcher.set_property(code, name, value)?;
                }
            }
        }
        Ok(dispatcher)
    }

    /// Add a sniff. Returns its slot.
    pub fn register(&mut self, sniff: Box<dyn Sniff>) -> usize {
        let id = self.sniffs.len();
        for kind in sniff.register() {
            let slots = self.listeners.entry(kind).or_default();
            if !slots.contains(&id) {
                slots.push(id);
            }
        }
        tracing::trace!(sniff = sniff.code(), id, "registered sniff");
        self.sniffs.push(Some(Registration {
            code: sniff.code(),
            sniff,
        }));
        id
    }

    /// Remove every sniff with `code`. Returns whether any was registered.
    pub fn unregister(&mut self, code: &str) -> bool {
        let mut removed = false;
        for slot in &mut self.sniffs {
            if slot.as_ref().is_some_and(|r| r.code == code) {
                *slot = None;
                removed = true;
            }
        }
        removed
    }

    /// Change a property on every sniff with `code`.
    pub fn set_property(&mut self, code: &str, name: &str, value: &str) -> Result<(), PropertyError> {
        let mut found = false;
        for registration in self.sniffs.iter_mut().flatten() {
            if registration.code == code {
                registration.sniff.set_property(name, value)?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(PropertyError::NoSuchSniff(code.to_string()))
        }
    }

    /// Codes of the registered sniffs, in registration order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.sniffs.iter().flatten().map(|r| r.code).collect()
    }

    /// Time spent in each sniff so far.
    pub fn timings(&self) -> &BTreeMap<String, Duration> {
        &self.timings
    }

    /// Dispatch every token of `file` to its listeners.
    pub fn run(&mut self, file: &mut SourceFile<'_>) {
        let dialect = file.table().dialect.clone();
        let settings = file.directives().settings.clone();
        let mut pending = settings.iter().peekable();
        let mut ignored: HashSet<usize> = HashSet::new();
        let mut skip_to: HashMap<usize, usize> = HashMap::new();

        for index in 0..file.tokens().len() {
            while let Some(change) = pending.next_if(|c| c.token <= index) {
                tracing::debug!(
                    sniff = %change.sniff,
                    property = %change.property,
                    value = %change.value,
                    "applying inline setting"
                );
                if let Err(err) = self.set_property(&change.sniff, &change.property, &change.value) {
                    tracing::warn!(path = %file.path().display(), line = file.tokens()[change.token].line, "{}", err);
                }
            }

            let (kind, line) = {
                let token = &file.tokens()[index];
                (token.kind, token.line)
            };
            if file.directives().line_fully_ignored(line) {
                continue;
            }
            let Some(count) = self.listeners.get(&kind).map(Vec::len) else {
                continue;
            };

            for n in 0..count {
                let id = self.listeners[&kind][n];
                if ignored.contains(&id) || skip_to.get(&id).is_some_and(|&next| next > index) {
                    continue;
                }
                let Some(registration) = self.sniffs[id].as_mut() else {
                    continue;
                };

                let dialects = registration.sniff.dialects();
                if !dialects.is_empty() && !dialects.contains(&dialect.as_str()) {
                    continue;
                }
                if file.context().sniff_ignores_path(registration.code, file.path()) {
                    tracing::debug!(sniff = registration.code, path = %file.path().display(), "sniff ignored for file");
                    ignored.insert(id);
                    continue;
                }

                file.set_active_sniff(Some(registration.code));
                let started = Instant::now();
                let result = registration.sniff.process(file, index);
                *self.timings.entry(registration.code.to_string()).or_default() += started.elapsed();

                if let Some(next) = result {
                    skip_to.insert(id, next);
                }
            }
        }

        file.set_active_sniff(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::augment;
    use crate::context::{IgnorePattern, PatternMode, SniffSettings};
    use crate::lexer::{CLikeTokenizer, Tokenizer};
    use crate::tokens::TokenTable;
    use std::sync::{Arc, Mutex};

    /// Records every index it is called with.
    struct Recorder {
        kinds: Vec<TokenKind>,
        seen: Arc<Mutex<Vec<usize>>>,
        skip: Option<usize>,
        dialects: &'static [&'static str],
        limit: usize,
    }

    impl Recorder {
        fn new(kinds: &[TokenKind], seen: &Arc<Mutex<Vec<usize>>>) -> Self {
            Self {
                kinds: kinds.to_vec(),
                seen: Arc::clone(seen),
                skip: None,
                dialects: &[],
                limit: 0,
            }
        }
    }

    impl Sniff for Recorder {
        fn code(&self) -> &'static str {
            "Test.Record.Calls"
        }

        fn register(&self) -> Vec<TokenKind> {
            self.kinds.clone()
        }

        fn dialects(&self) -> &'static [&'static str] {
            self.dialects
        }

        fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
            match name {
                "limit" => {
                    self.limit = crate::sniffs::parse_usize(name, value)?;
                    Ok(())
                }
                _ => Err(PropertyError::Unknown {
                    sniff: self.code().to_string(),
                    property: name.to_string(),
                }),
            }
        }

        fn process(&mut self, file: &mut SourceFile<'_>, index: usize) -> Option<usize> {
            self.seen.lock().unwrap().push(index);
            if self.limit > 0 {
                file.add_error(format!("limit {}", self.limit), index, "Limit");
            }
            self.skip
        }
    }

    fn file_for<'a>(source: &str, ctx: &'a AnalysisContext) -> SourceFile<'a> {
        let raw = CLikeTokenizer.tokenize(source, "\n").unwrap();
        let augmented = augment(raw, &ctx.table, &ctx.position_options("\n")).unwrap();
        SourceFile::new("/src/a.c", augmented, "\n", ctx)
    }

    fn semicolons(file: &SourceFile<'_>) -> Vec<usize> {
        file.tokens()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::Semicolon)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_dispatch_in_order() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let mut file = file_for("a;\nb;\nc;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        dispatcher.run(&mut file);

        assert_eq!(*seen.lock().unwrap(), semicolons(&file));
        assert!(dispatcher.timings().contains_key("Test.Record.Calls"));
    }

    #[test]
    fn test_skip_ahead() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let mut file = file_for("a;\nb;\nc;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sniff = Recorder::new(&[TokenKind::Semicolon], &seen);
        let third = semicolons(&file)[2];
        sniff.skip = Some(third);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(sniff));
        dispatcher.run(&mut file);

        let first = semicolons(&file)[0];
        assert_eq!(*seen.lock().unwrap(), vec![first, third]);
    }

    #[test]
    fn test_ignored_lines_are_not_dispatched() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let mut file = file_for("a;\n// tokensniff:ignore-line\nb;\nc;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        dispatcher.run(&mut file);

        let all = semicolons(&file);
        assert_eq!(*seen.lock().unwrap(), vec![all[0], all[2]]);
    }

    #[test]
    fn test_dialect_filter() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let mut file = file_for("a;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sniff = Recorder::new(&[TokenKind::Semicolon], &seen);
        sniff.dialects = &["other"];
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(sniff));
        dispatcher.run(&mut file);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_path_ignore_pattern() {
        let mut ctx = AnalysisContext::new(TokenTable::clike());
        ctx.sniffs.insert(
            "Test.Record.Calls".to_string(),
            SniffSettings {
                ignore_patterns: vec![IgnorePattern::new("*/src/*", PatternMode::Absolute).unwrap()],
                ..Default::default()
            },
        );
        let mut file = file_for("a;\nb;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        dispatcher.run(&mut file);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unregister_tombstones() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let mut file = file_for("a;\n", &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        assert!(dispatcher.unregister("Test.Record.Calls"));
        assert!(!dispatcher.unregister("Test.Record.Calls"));
        assert!(dispatcher.codes().is_empty());
        dispatcher.run(&mut file);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_inline_setting_applies_from_directive_onwards() {
        let ctx = AnalysisContext::new(TokenTable::clike());
        let source = "a;\n// tokensniff:set Test.Record.Calls limit 3\nb;\n";
        let mut file = file_for(source, &ctx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        dispatcher.run(&mut file);

        let findings = file.into_diagnostics().finalize();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 3);
        assert_eq!(findings[0].message, "limit 3");
        assert_eq!(findings[0].source, "Test.Record.Calls.Limit");
    }

    #[test]
    fn test_set_property_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Recorder::new(&[TokenKind::Semicolon], &seen)));
        assert!(matches!(
            dispatcher.set_property("No.Such.Sniff", "limit", "1"),
            Err(PropertyError::NoSuchSniff(_))
        ));
        assert!(matches!(
            dispatcher.set_property("Test.Record.Calls", "limit", "x"),
            Err(PropertyError::Invalid { .. })
        ));
    }

    #[test]
    fn test_from_factories_respects_configuration() {
        let mut ctx = AnalysisContext::new(TokenTable::clike());
        ctx.sniffs.insert(
            "Generic.Files.LineLength".to_string(),
            SniffSettings {
                enabled: false,
                ..Default::default()
            },
        );
        let mut props = BTreeMap::new();
        props.insert("nesting_level".to_string(), "2".to_string());
        ctx.sniffs.insert(
            "Generic.Metrics.NestingLevel".to_string(),
            SniffSettings {
                properties: props,
                ..Default::default()
            },
        );
        let dispatcher = Dispatcher::from_factories(crate::sniffs::BUILTIN, &ctx).unwrap();
        let codes = dispatcher.codes();
        assert!(!codes.contains(&"Generic.Files.LineLength"));
        assert!(codes.contains(&"Generic.Metrics.NestingLevel"));

        ctx.sniffs
            .get_mut("Generic.Metrics.NestingLevel")
            .unwrap()
            .properties
            .insert("depth".to_string(), "2".to_string());
        assert!(Dispatcher::from_factories(crate::sniffs::BUILTIN, &ctx).is_err());
    }
}
