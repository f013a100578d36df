//! Structural navigation over nodes.
//!
//! These helpers are what handlers use to pull values out of a parse tree. A path that
//! leads nowhere is `None`: callers are expected to check, never to catch.

use crate::ast::{Fields, Node, NodeValue, Repetition};
use crate::syntax::Token;

/// Result of [`get`]: either a token at the bottom of a chain of single-field nodes, or
/// the node where the chain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Token(&'a Token),
    Node(&'a Node),
}

impl<'a> Lookup<'a> {
    pub fn token(self) -> Option<&'a Token> {
        match self {
            Lookup::Token(token) => Some(token),
            Lookup::Node(node) => node.token(),
        }
    }

    pub fn node(self) -> Option<&'a Node> {
        match self {
            Lookup::Node(node) => Some(node),
            Lookup::Token(_) => None,
        }
    }

    /// Token text, or the joined leaf text of a node.
    pub fn text(self) -> String {
        match self {
            Lookup::Token(token) => token.text().to_string(),
            Lookup::Node(node) => node.text(),
        }
    }
}

/// Descends through single-field nodes until a leaf or a node with several fields.
///
/// A leaf yields its token. A node with zero or several fields yields the node.
pub fn drill(node: &Node) -> Lookup<'_> {
    let mut current = node;
    loop {
        match current.value() {
            NodeValue::Token(token) => return Lookup::Token(token),
            NodeValue::Fields(fields) => match fields.single() {
                Some(child) => current = child,
                None => return Lookup::Node(current),
            },
        }
    }
}

/// Field access with optional drill-down.
///
/// - `field` empty: [`drill`] from `node`.
/// - `field` given, `singular`: the named child, then [`drill`].
/// - `field` given, not `singular`: the named child unchanged.
///
/// Returns `None` when `node` is absent, is a leaf asked for a field, or lacks the field.
pub fn get<'a>(node: Option<&'a Node>, field: &str, singular: bool) -> Option<Lookup<'a>> {
    let node = node?;
    if field.is_empty() {
        return Some(drill(node));
    }
    let child = node.field(field)?;
    if singular {
        Some(drill(child))
    } else {
        Some(Lookup::Node(child))
    }
}

/// Unchains the nodes of a self-referential rule into one entry per repetition, in source
/// order.
///
/// Each entry is that repetition's own content, without the field linking it to the
/// previous repetition. A repetition left with exactly one field yields that child as is;
/// otherwise the entry is a node of the chain's tag holding the remaining fields, so
/// [`get`] works on entries directly. `None` when `node` is not part of a repetition
/// chain or the chain is broken.
pub fn into_list(node: &Node) -> Option<Vec<Node>> {
    let mut entries = Vec::new();
    let mut current = node;
    loop {
        let fields = current.fields()?;
        match current.repetition()? {
            Repetition::Seed => {
                entries.push(entry(current, fields.clone()));
                break;
            }
            Repetition::Grown { field } => {
                entries.push(entry(current, fields.without(field)));
                let previous = fields.get(field)?;
                if previous.tag() != current.tag() {
                    return None;
                }
                current = previous;
            }
        }
    }
    entries.reverse();
    Some(entries)
}

fn entry(repetition: &Node, fields: Fields) -> Node {
    match fields.single() {
        Some(child) => child.clone(),
        None => Node::branch(repetition.tag().clone(), fields),
    }
}
