//! AST module for macten.
//!
//! A [`Node`] is the generic tree value every successful rule attempt produces. It carries
//! an explicit [`Tag`] naming what produced it, and either a single token (a leaf) or an
//! insertion-ordered set of named children.
//!
//! Nodes built by a self-referential rule also record how they repeat: the seed of the
//! repetition, or the name of the field that holds the previous repetition. Flattening
//! such a chain (see [`utils::into_list`]) reads that record instead of guessing from the
//! shape of the tree.

use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::syntax::Token;

pub mod printer;
pub mod utils;

pub use printer::{print_tree, render_tree, TreeStyle};
pub use utils::{get, into_list, Lookup};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// What produced a node. Set at construction, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The built-in `ident` rule.
    Ident,
    /// The built-in `number` rule.
    Number,
    /// A token matched by its exact text in a hand-written rule, see
    /// [`rules::literal`](crate::rules::literal). Productions tag their literal leaves with
    /// the production's own tag instead.
    Literal,
    /// A registered rule, by the name it tags its nodes with.
    Rule(Arc<str>),
}

impl Tag {
    pub fn rule(name: &str) -> Self {
        Tag::Rule(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Ident => "ident",
            Tag::Number => "number",
            Tag::Literal => "literal",
            Tag::Rule(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Tag::Ident | Tag::Number)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Insertion-ordered mapping from unique field names to child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, Node)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a child. A name that is already present keeps its position and has its
    /// node replaced; the previous node is returned.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) -> Option<Node> {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(&mut slot.1, node));
        }
        self.entries.push((name, node));
        None
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(n, node)| (n.as_str(), node))
    }

    /// The only child, if there is exactly one.
    pub fn single(&self) -> Option<&Node> {
        match self.entries.as_slice() {
            [(_, node)] => Some(node),
            _ => None,
        }
    }

    /// A copy without the named field.
    pub fn without(&self, name: &str) -> Fields {
        Fields {
            entries: self
                .entries
                .iter()
                .filter(|(n, _)| n != name)
                .cloned()
                .collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Node)> for Fields {
    fn from_iter<I: IntoIterator<Item = (S, Node)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, node) in iter {
            fields.insert(name, node);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, node) in &self.entries {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Token(Token),
    Fields(Fields),
}

/// Position of a node inside a chain built by a self-referential rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repetition {
    /// The first repetition; nothing precedes it.
    Seed,
    /// A later repetition; `field` holds the one before it.
    Grown { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: Tag,
    value: NodeValue,
    repetition: Option<Repetition>,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Node {
    pub fn leaf(tag: Tag, token: Token) -> Self {
        Self {
            tag,
            value: NodeValue::Token(token),
            repetition: None,
        }
    }

    pub fn branch(tag: Tag, fields: Fields) -> Self {
        Self {
            tag,
            value: NodeValue::Fields(fields),
            repetition: None,
        }
    }

    /// First repetition of a self-referential rule.
    pub fn seed(tag: Tag, fields: Fields) -> Self {
        Self {
            tag,
            value: NodeValue::Fields(fields),
            repetition: Some(Repetition::Seed),
        }
    }

    /// A repetition whose predecessor is stored under `field`.
    ///
    /// `field` must be one of the keys of `fields`.
    pub fn grown(tag: Tag, field: impl Into<String>, fields: Fields) -> Self {
        let field = field.into();
        debug_assert!(fields.contains(&field));
        Self {
            tag,
            value: NodeValue::Fields(fields),
            repetition: Some(Repetition::Grown { field }),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn repetition(&self) -> Option<&Repetition> {
        self.repetition.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.value, NodeValue::Token(_))
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.value {
            NodeValue::Token(token) => Some(token),
            NodeValue::Fields(_) => None,
        }
    }

    pub fn fields(&self) -> Option<&Fields> {
        match &self.value {
            NodeValue::Fields(fields) => Some(fields),
            NodeValue::Token(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields()?.get(name)
    }

    /// Same node with a different tag. Keeps the value and any repetition record.
    pub fn retagged(self, tag: Tag) -> Self {
        Self { tag, ..self }
    }

    /// All leaf tokens under this node, left to right.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        collect_tokens(self, &mut out);
        out
    }

    /// Leaf token texts joined with single spaces.
    pub fn text(&self) -> String {
        self.tokens()
            .iter()
            .map(|t| t.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn collect_tokens<'a>(node: &'a Node, out: &mut Vec<&'a Token>) {
    match &node.value {
        NodeValue::Token(token) => out.push(token),
        NodeValue::Fields(fields) => {
            for (_, child) in fields.iter() {
                collect_tokens(child, out);
            }
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Node", 2)?;
        state.serialize_field("tag", &self.tag)?;
        match &self.value {
            NodeValue::Token(token) => state.serialize_field("token", token.text())?,
            NodeValue::Fields(fields) => state.serialize_field("fields", fields)?,
        }
        state.end()
    }
}
