//! The expansion driver.
//!
//! An [`Expander`] owns the rule registry, the handler registry, the configuration and an
//! output sink. [`Expander::expand`] parses a text as a sequence of top-level constructs
//! of one rule and dispatches each construct's root node to its handler. A construct that
//! fails to parse stops the whole expansion with a diagnostic pointing at the offending
//! token.
//!
//! The expander also holds the session's declarative macros, expanded at their
//! `name![...]` call sites by [`Expander::expand_macros`].

use crate::ast::Node;
use crate::config::ExpanderConfig;
use crate::diagnostics::to_error_source;
use crate::handlers::{Dispatch, HandlerRegistry};
use crate::macros::{parse_profiles, DeclarativeRegistry};
use crate::output::{OutputSink, StderrSink};
use crate::rules::{Parsed, RuleRegistry};
use crate::syntax::Stream;
use crate::{err_ctx, err_msg, MactenError};

// ============================================================================
// EXPANSION CONTEXT
// ============================================================================

/// Everything one expansion session needs: the grammar, the handlers, the settings and
/// where diagnostics go.
///
/// Grammar and handlers are filled in first. Parsing and dispatch only borrow them.
pub struct Expander<S: OutputSink = StderrSink> {
    rules: RuleRegistry,
    handlers: HandlerRegistry,
    macros: DeclarativeRegistry,
    config: ExpanderConfig,
    sink: S,
}

impl Expander<StderrSink> {
    pub fn new(rules: RuleRegistry, handlers: HandlerRegistry) -> Self {
        Self::with_config(rules, handlers, ExpanderConfig::default())
    }

    /// Diagnostics go to stderr, colored as `config` says.
    pub fn with_config(rules: RuleRegistry, handlers: HandlerRegistry, config: ExpanderConfig) -> Self {
        let sink = StderrSink::new(config.color);
        Self::with_sink(rules, handlers, config, sink)
    }
}

impl<S: OutputSink> Expander<S> {
    pub fn with_sink(
        rules: RuleRegistry,
        handlers: HandlerRegistry,
        config: ExpanderConfig,
        sink: S,
    ) -> Self {
        Self {
            rules,
            handlers,
            macros: DeclarativeRegistry::new(),
            config,
            sink,
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Reads every profile in `source` and installs it. Returns the registered rule names.
    pub fn load_profiles(&mut self, source: &str) -> Result<Vec<String>, MactenError> {
        let mut installed = Vec::new();
        for profile in parse_profiles(source)? {
            installed.extend(profile.install(&mut self.rules)?);
        }
        Ok(installed)
    }

    /// Reads every declarative macro in `source` and registers it. Returns their names.
    pub fn load_macros(&mut self, source: &str) -> Result<Vec<String>, MactenError> {
        self.macros.load(source)
    }

    pub fn macros(&self) -> &DeclarativeRegistry {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut DeclarativeRegistry {
        &mut self.macros
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn config(&self) -> &ExpanderConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    // ------------------------------------------------------------------------
    // Parsing and dispatch
    // ------------------------------------------------------------------------

    /// One attempt of `rule` at the front of `input`. No match is `Ok(None)`.
    pub fn parse(&self, rule: &str, input: &Stream) -> Result<Option<Parsed>, MactenError> {
        self.rules.parse(rule, input)
    }

    /// Parses `text` as exactly one `rule` construct.
    ///
    /// `Ok(None)` when the rule does not match or leaves input behind.
    pub fn parse_text(&self, rule: &str, text: &str) -> Result<Option<Node>, MactenError> {
        let input = Stream::from_text(text);
        Ok(self
            .parse(rule, &input)?
            .filter(|parsed| parsed.stream.is_empty())
            .map(|parsed| parsed.node))
    }

    pub fn dispatch(&mut self, node: &Node) -> Result<Dispatch, MactenError> {
        self.handlers.dispatch(node, &mut self.sink, &self.config)
    }

    /// Parses `text` as a sequence of `rule` constructs and dispatches each one, in order.
    ///
    /// Text that does not start a construct is a `Parse` error pointing at it.
    pub fn expand(&mut self, rule: &str, text: &str) -> Result<Vec<Dispatch>, MactenError> {
        let mut stream = Stream::from_text(text);
        let mut outputs = Vec::new();
        while !stream.is_empty() {
            let Some(parsed) = self.parse(rule, &stream)? else {
                let token = stream.peek(0)?;
                return Err(err_ctx!(
                    Parse,
                    format!("Could not parse '{}' at '{}'", rule, token),
                    &to_error_source("input", text),
                    token.span(),
                    format!("The input must be a sequence of '{}' constructs.", rule)
                ));
            };
            if parsed.stream.position() == stream.position() {
                return Err(err_msg!(
                    Parse,
                    "Rule '{}' matched without consuming input at token {}",
                    rule,
                    stream.position()
                ));
            }
            outputs.push(self.dispatch(&parsed.node)?);
            stream = parsed.stream;
        }
        Ok(outputs)
    }

    /// Replaces every declarative macro call in `text` by its expansion.
    pub fn expand_macros(&self, text: &str) -> Result<String, MactenError> {
        self.macros.expand(text)
    }
}

impl<S: OutputSink> std::fmt::Debug for Expander<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expander")
            .field("rules", &self.rules)
            .field("handlers", &self.handlers)
            .field("macros", &self.macros)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
