//! Handler registry and dispatch of completed constructs.
//!
//! A handler turns the root node of a top-level construct into generated text. Handlers
//! are found by the root node's tag, so a profile's handler is registered under the
//! profile name.
//!
//! # Summary Table
//! | Method             | Overwrites | Error on Duplicate | Notes                        |
//! |--------------------|------------|--------------------|------------------------------|
//! | register           | Yes        | No                 | Returns the replaced handler |
//! | register_or_error  | No         | Yes                |                              |
//! | unregister         | N/A        | N/A                | Removes by name              |
//! | lookup/contains    | N/A        | N/A                | Case-sensitive lookup        |

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{render_tree, Node};
use crate::config::ExpanderConfig;
use crate::err_msg;
use crate::output::{Level, OutputSink};
use crate::MactenError;

pub type Handler = Arc<dyn Fn(&Node) -> Result<String, MactenError> + Send + Sync>;

/// Outcome of dispatching one construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Text produced by the registered handler.
    Generated(String),
    /// No handler was registered; the rendered tree instead.
    Fallback(String),
}

impl Dispatch {
    pub fn text(&self) -> &str {
        match self {
            Dispatch::Generated(text) | Dispatch::Fallback(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Dispatch::Generated(text) | Dispatch::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Dispatch::Fallback(_))
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to constructs tagged `rule`, replacing any previous handler.
    pub fn register<F>(&mut self, rule: &str, handler: F) -> Option<Handler>
    where
        F: Fn(&Node) -> Result<String, MactenError> + Send + Sync + 'static,
    {
        self.handlers.insert(rule.to_string(), Arc::new(handler))
    }

    pub fn register_or_error<F>(&mut self, rule: &str, handler: F) -> Result<(), MactenError>
    where
        F: Fn(&Node) -> Result<String, MactenError> + Send + Sync + 'static,
    {
        if self.handlers.contains_key(rule) {
            return Err(err_msg!(Validation, "Handler for '{}' is already registered", rule));
        }
        self.register(rule, handler);
        Ok(())
    }

    pub fn unregister(&mut self, rule: &str) -> Option<Handler> {
        self.handlers.remove(rule)
    }

    pub fn lookup(&self, rule: &str) -> Option<&Handler> {
        self.handlers.get(rule)
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.handlers.contains_key(rule)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for `node`'s tag.
    ///
    /// Without one, the tree is rendered instead and, unless disabled in `config`, a
    /// warning goes to `sink`. Handler failures propagate.
    pub fn dispatch(
        &self,
        node: &Node,
        sink: &mut dyn OutputSink,
        config: &ExpanderConfig,
    ) -> Result<Dispatch, MactenError> {
        let tag = node.tag().name();
        if let Some(handler) = self.handlers.get(tag) {
            return (**handler)(node).map(Dispatch::Generated);
        }
        if config.warn_on_fallback {
            sink.emit(
                Level::Warning,
                &format!("no handler registered for '{}', printing the tree instead", tag),
            );
        }
        Ok(Dispatch::Fallback(render_tree(node, config.tree_style)))
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Fields, Tag};
    use crate::diagnostics::ErrorType;
    use crate::output::{NullSink, OutputBuffer};
    use crate::syntax::tokenize;

    fn construct(tag: &str) -> Node {
        let token = tokenize("name").remove(0);
        let fields: Fields = vec![("target", Node::leaf(Tag::Ident, token))]
            .into_iter()
            .collect();
        Node::branch(Tag::rule(tag), fields)
    }

    #[test]
    fn dispatches_by_root_tag() {
        let mut handlers = HandlerRegistry::new();
        handlers.register("switch", |node: &Node| Ok(format!("match {}", node.text())));
        let result = handlers
            .dispatch(&construct("switch"), &mut NullSink, &ExpanderConfig::default())
            .unwrap();
        assert_eq!(result, Dispatch::Generated("match name".to_string()));
    }

    #[test]
    fn missing_handler_falls_back_with_a_warning() {
        let handlers = HandlerRegistry::new();
        let mut sink = OutputBuffer::new();
        let result = handlers
            .dispatch(&construct("loop"), &mut sink, &ExpanderConfig::default())
            .unwrap();
        assert!(result.is_fallback());
        assert!(result.text().starts_with("loop\n"));
        assert_eq!(
            sink.as_str(),
            "warning: no handler registered for 'loop', printing the tree instead"
        );
    }

    #[test]
    fn fallback_warning_can_be_disabled() {
        let config = ExpanderConfig {
            warn_on_fallback: false,
            ..ExpanderConfig::default()
        };
        let mut sink = OutputBuffer::new();
        HandlerRegistry::new()
            .dispatch(&construct("loop"), &mut sink, &config)
            .unwrap();
        assert!(sink.as_str().is_empty());
    }

    #[test]
    fn handler_errors_propagate() {
        let mut handlers = HandlerRegistry::new();
        handlers.register("switch", |_: &Node| Err(err_msg!(Handler, "no cases")));
        let err = handlers
            .dispatch(&construct("switch"), &mut NullSink, &ExpanderConfig::default())
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Handler);
    }

    #[test]
    fn registration_replaces_unless_asked_not_to() {
        let mut handlers = HandlerRegistry::new();
        assert!(handlers.register("switch", |_: &Node| Ok(String::new())).is_none());
        assert!(handlers.register("switch", |_: &Node| Ok("x".into())).is_some());
        assert_eq!(handlers.len(), 1);
        assert!(handlers
            .register_or_error("switch", |_: &Node| Ok(String::new()))
            .is_err());
        assert!(handlers.unregister("switch").is_some());
        assert!(handlers.is_empty());
    }
}
