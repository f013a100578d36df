//! # Rules
//!
//! The parsing protocol every grammar rule follows, and the machinery that runs rules.
//!
//! ## Contract
//!
//! - A rule receives the caller's stream by shared reference. It works on a fork and hands
//!   the advanced fork back on success, so a failed attempt cannot move the caller.
//! - No match is `Ok(None)`. It is the routine result that makes the caller try its next
//!   alternative; it is never an error.
//! - `Err` is reserved for configuration defects such as a sub-rule that was never
//!   registered. Those abort the whole expansion.
//!
//! ## Rule kinds
//!
//! - [`Rule`]: a plain rule, `parse(stream)`.
//! - [`RecursiveRule`]: a left-recursive rule expressed as a single `step` that may extend
//!   the previous result. Its `parse` is the growing engine in [`grow`].
//!
//! Closures with the matching signatures implement both traits, so small grammars can be
//! written inline; [`production::Production`] is the declarative form.

use std::sync::Arc;

use crate::ast::Node;
use crate::syntax::Stream;
use crate::MactenError;

pub mod builtins;
pub mod grow;
pub mod production;
pub mod registry;

pub use builtins::Builtin;
pub use grow::{grow, grow_traced};
pub use production::{Production, Symbol};
pub use registry::RuleRegistry;

/// A successful rule attempt: the advanced stream and the node it produced.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub stream: Stream,
    pub node: Node,
}

impl Parsed {
    pub fn new(stream: Stream, node: Node) -> Self {
        Self { stream, node }
    }
}

/// `Ok(Some(_))` on a match, `Ok(None)` on no match, `Err` on a fatal defect.
pub type ParseResult = Result<Option<Parsed>, MactenError>;

pub trait Rule: Send + Sync {
    fn parse(&self, input: &Stream, rules: &RuleRegistry) -> ParseResult;
}

/// A self-referential rule such as `list := list item | item`.
///
/// `step` receives the stream positioned after `seed` (or the original stream when `seed`
/// is `None`) and returns one more repetition built on top of `seed`.
pub trait RecursiveRule: Send + Sync {
    fn step(&self, input: &Stream, seed: Option<&Node>, rules: &RuleRegistry) -> ParseResult;
}

impl<F> Rule for F
where
    F: Fn(&Stream, &RuleRegistry) -> ParseResult + Send + Sync,
{
    fn parse(&self, input: &Stream, rules: &RuleRegistry) -> ParseResult {
        self(input, rules)
    }
}

impl<F> RecursiveRule for F
where
    F: Fn(&Stream, Option<&Node>, &RuleRegistry) -> ParseResult + Send + Sync,
{
    fn step(&self, input: &Stream, seed: Option<&Node>, rules: &RuleRegistry) -> ParseResult {
        self(input, seed, rules)
    }
}

/// A registered rule implementation.
#[derive(Clone)]
pub enum RuleDef {
    Builtin(Builtin),
    Plain(Arc<dyn Rule>),
    Recursive(Arc<dyn RecursiveRule>),
}

impl RuleDef {
    pub fn parse(&self, input: &Stream, rules: &RuleRegistry) -> ParseResult {
        match self {
            RuleDef::Builtin(builtin) => Ok(builtin.parse(input)),
            RuleDef::Plain(rule) => rule.parse(input, rules),
            RuleDef::Recursive(rule) => grow(rule.as_ref(), input, rules),
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self, RuleDef::Recursive(_))
    }
}

impl std::fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleDef::Builtin(builtin) => write!(f, "Builtin({})", builtin.name()),
            RuleDef::Plain(_) => write!(f, "Plain(<rule>)"),
            RuleDef::Recursive(_) => write!(f, "Recursive(<rule>)"),
        }
    }
}

// ============================================================================
// HELPERS FOR HAND-WRITTEN RULES
// ============================================================================

/// Runs `body` on a fork of `input`.
///
/// `body` returns the node to produce, or `None` to abandon the attempt. On `None` the
/// fork is dropped, so whatever `body` consumed is forgotten.
pub fn attempt<F>(input: &Stream, body: F) -> ParseResult
where
    F: FnOnce(&mut Stream) -> Result<Option<Node>, MactenError>,
{
    let mut fork = input.fork();
    Ok(body(&mut fork)?.map(|node| Parsed::new(fork, node)))
}

/// Calls the rule registered as `name` at the current position of `stream`, advancing it
/// on a match.
pub fn call(
    stream: &mut Stream,
    rules: &RuleRegistry,
    name: &str,
) -> Result<Option<Node>, MactenError> {
    match rules.parse(name, stream)? {
        Some(parsed) => {
            *stream = parsed.stream;
            Ok(Some(parsed.node))
        }
        None => Ok(None),
    }
}

/// Consumes the next token if its text is `text`, as a [`Tag::Literal`] leaf.
///
/// [`Tag::Literal`]: crate::ast::Tag::Literal
pub fn literal(stream: &mut Stream, text: &str) -> Option<Node> {
    stream
        .pop_if(text)
        .map(|token| Node::leaf(crate::ast::Tag::Literal, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Fields, Tag};

    #[test]
    fn attempt_discards_the_fork_on_failure() {
        let input = Stream::from_text("a b c");
        let result = attempt(&input, |s| {
            s.pop_if("a");
            s.pop_if("b");
            Ok(literal(s, "x"))
        })
        .unwrap();
        assert!(result.is_none());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn attempt_returns_the_advanced_fork() {
        let input = Stream::from_text("a b");
        let parsed = attempt(&input, |s| Ok(literal(s, "a")))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.stream.position(), 1);
        assert_eq!(input.position(), 0);
        assert_eq!(parsed.node.tag(), &Tag::Literal);
        assert_eq!(parsed.node.text(), "a");
    }

    #[test]
    fn literal_leaves_the_stream_alone_on_mismatch() {
        let mut stream = Stream::from_text("a");
        assert!(literal(&mut stream, "b").is_none());
        assert_eq!(stream.position(), 0);
        let node = literal(&mut stream, "a").unwrap();
        assert_eq!(node.tag().name(), "literal");
        assert!(stream.is_empty());
    }

    #[test]
    fn call_advances_only_on_match() {
        let rules = RuleRegistry::new();
        let mut stream = Stream::from_text("name {");
        assert!(call(&mut stream, &rules, "number").unwrap().is_none());
        assert_eq!(stream.position(), 0);
        let node = call(&mut stream, &rules, "ident").unwrap().unwrap();
        assert_eq!(node.text(), "name");
        assert_eq!(stream.position(), 1);
    }

    #[test]
    fn call_to_an_unknown_rule_is_fatal() {
        let rules = RuleRegistry::new();
        let mut stream = Stream::from_text("x");
        let err = call(&mut stream, &rules, "nope").unwrap_err();
        assert!(matches!(err, MactenError::UnknownRule { ref name, .. } if name == "nope"));
    }

    #[test]
    fn closures_are_rules() {
        let mut rules = RuleRegistry::new();
        rules.register("pair", |input: &Stream, rules: &RuleRegistry| {
            attempt(input, |s| {
                let Some(left) = call(s, rules, "ident")? else {
                    return Ok(None);
                };
                if s.pop_if(",").is_none() {
                    return Ok(None);
                }
                let Some(right) = call(s, rules, "ident")? else {
                    return Ok(None);
                };
                let fields: Fields = vec![("left", left), ("right", right)].into_iter().collect();
                Ok(Some(Node::branch(Tag::rule("pair"), fields)))
            })
        });
        let parsed = rules
            .parse("pair", &Stream::from_text("a , b"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.node.text(), "a b");
        assert!(parsed.stream.is_empty());
    }
}
