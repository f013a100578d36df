//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic type for the macten engine.
//! Every fatal failure of tokenizing, rule lookup, profile loading, expansion or handler
//! execution is a [`MactenError`]. Error construction goes through the `err_msg!` and
//! `err_ctx!` macros.
//!
//! # What is NOT an error
//!
//! - A rule that does not match is `Ok(None)`. It is the routine signal that drives
//!   backtracking and never allocates an error value.
//! - A top-level construct without a handler degrades to the tree printer plus a warning
//!   on the diagnostic sink (see [`crate::handlers`]).
//! - Asking [`crate::ast::utils`] for a field a node does not have yields `None`.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(Parse, "Failed to parse {}", rule)` for message-only errors.
//! - `err_ctx!(Parse, "Expected '{'", src, span)` when a definition source and span exist.
//! - `err_ctx!(Parse, "Expected '{'", src, span, help)` to attach a help message.
//!
//! Pass `src` as a `&SourceArc` and `span` as a [`Span`] value; the macros clone what they need.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification that corresponds to `MactenError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A rule name with no registry binding
    UnknownRule,
    /// Stream access past the last token
    OutOfBounds,
    /// Malformed profile definitions and input no top-level rule accepts
    Parse,
    /// Duplicate registrations through the `*_or_error` methods
    Validation,
    /// A handler reported a failure
    Handler,
    /// Unreadable configuration
    Config,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::UnknownRule => "UnknownRule",
            ErrorType::OutOfBounds => "OutOfBounds",
            ErrorType::Parse => "Parse",
            ErrorType::Validation => "Validation",
            ErrorType::Handler => "Handler",
            ErrorType::Config => "Config",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source the span points into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..Self::default()
        }
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }
}

/// Unified error type for all macten failure modes.
#[derive(Debug, Error)]
pub enum MactenError {
    #[error("Unknown rule: '{name}'")]
    UnknownRule { name: String, ctx: ErrorContext },
    #[error("Token stream out of bounds: index {index} with {len} tokens")]
    OutOfBounds {
        index: usize,
        len: usize,
        ctx: ErrorContext,
    },
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Handler error: {message}")]
    Handler {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl MactenError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            MactenError::UnknownRule { ctx, .. }
            | MactenError::OutOfBounds { ctx, .. }
            | MactenError::Parse { ctx, .. }
            | MactenError::Validation { ctx, .. }
            | MactenError::Handler { ctx, .. }
            | MactenError::Config { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            MactenError::UnknownRule { .. } => ErrorType::UnknownRule,
            MactenError::OutOfBounds { .. } => ErrorType::OutOfBounds,
            MactenError::Parse { .. } => ErrorType::Parse,
            MactenError::Validation { .. } => ErrorType::Validation,
            MactenError::Handler { .. } => ErrorType::Handler,
            MactenError::Config { .. } => ErrorType::Config,
        }
    }

    pub fn unknown_rule(name: &str) -> Self {
        MactenError::UnknownRule {
            name: name.to_string(),
            ctx: ErrorContext::with_help("Register the rule before parsing starts."),
        }
    }

    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        MactenError::OutOfBounds {
            index,
            len,
            ctx: ErrorContext::none(),
        }
    }

    /// Attaches an underlying cause, for the variants that carry one.
    pub fn with_source(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        match &mut self {
            MactenError::Parse { source, .. }
            | MactenError::Validation { source, .. }
            | MactenError::Handler { source, .. }
            | MactenError::Config { source, .. } => *source = Some(Box::new(cause)),
            MactenError::UnknownRule { .. } | MactenError::OutOfBounds { .. } => {}
        }
        self
    }
}

impl Diagnostic for MactenError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("macten::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let label = LabeledSpan::new_with_span(Some("here".to_string()), span);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Wraps a source string for use in diagnostics.
pub fn to_error_source<S: AsRef<str>>(name: &str, source: S) -> SourceArc {
    Arc::new(NamedSource::new(name, source.as_ref().to_string()))
}

/// Constructs a MactenError variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::MactenError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::MactenError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a MactenError variant with a message, a definition source and span,
/// and optionally a help message.
#[macro_export]
macro_rules! err_ctx {
    // Message, src, span, help
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::MactenError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    // Message, src, span
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::MactenError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: None,
            },
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_labels_and_help_render() {
        let src = to_error_source("switch.macten", "switch { target ident }");
        let err = err_ctx!(
            Parse,
            "Expected '{' after rule label",
            &src,
            Span { start: 16, end: 21 },
            "Wrap the rule body in braces."
        );
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("Expected '{' after rule label"));
        assert!(output.contains("Wrap the rule body in braces."));
        assert!(output.contains("here"));
    }

    #[test]
    fn test_error_type_classification() {
        assert_eq!(
            MactenError::unknown_rule("missing").error_type(),
            ErrorType::UnknownRule
        );
        assert_eq!(
            MactenError::out_of_bounds(3, 2).error_type(),
            ErrorType::OutOfBounds
        );
        assert_eq!(err_msg!(Handler, "boom").error_type(), ErrorType::Handler);
        assert_eq!(ErrorType::Parse.to_string(), "Parse");
    }

    #[test]
    fn test_unknown_rule_message_names_the_rule() {
        let err = MactenError::unknown_rule("switch_branch");
        assert_eq!(err.to_string(), "Unknown rule: 'switch_branch'");
        assert!(err.help().is_some());
    }

    #[test]
    fn test_error_chaining() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = err_msg!(Config, "Could not read settings").with_source(io);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk gone"));
    }
}
