//! Declarative rules: ordered alternatives of symbol sequences.
//!
//! A [`Production`] is the generic shape of a grammar rule:
//!
//! ```text
//! branch   { case " case_name " : { body } }
//! branches { branches branch } | { branch }
//! ```
//!
//! Each alternative is tried in order on its own fork; the first that matches every symbol
//! wins. A symbol either calls another rule (its node is stored under the symbol's field
//! name) or expects a literal token (matched, not stored).
//!
//! An alternative whose first symbol calls the production itself is left-recursive. A
//! production with such an alternative parses through the growing engine: without a seed
//! only the other alternatives are tried, and with a seed only the left-recursive ones,
//! with the seed standing in for the self-call.

use serde::{Deserialize, Serialize};

use crate::ast::{Fields, Node, Tag};
use crate::rules::{grow, Parsed, ParseResult, RecursiveRule, Rule, RuleDef, RuleRegistry};
use crate::syntax::Stream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    /// Call `rule`, storing its node under `field`.
    Rule { field: String, rule: String },
    /// Expect a token with this text.
    Literal(String),
}

impl Symbol {
    /// A rule call whose field is named after the rule.
    pub fn call(rule: &str) -> Self {
        Symbol::Rule {
            field: rule.to_string(),
            rule: rule.to_string(),
        }
    }

    pub fn field(field: &str, rule: &str) -> Self {
        Symbol::Rule {
            field: field.to_string(),
            rule: rule.to_string(),
        }
    }

    pub fn literal(text: &str) -> Self {
        Symbol::Literal(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    /// The name this production calls itself by.
    name: String,
    /// The tag its nodes carry.
    tag: String,
    alternatives: Vec<Vec<Symbol>>,
}

impl Production {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: name.to_string(),
            alternatives: Vec::new(),
        }
    }

    /// Tags produced nodes with `tag` instead of the production's name.
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn alternative(mut self, symbols: Vec<Symbol>) -> Self {
        self.alternatives.push(symbols);
        self
    }

    pub fn push_alternative(&mut self, symbols: Vec<Symbol>) {
        self.alternatives.push(symbols);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn alternatives(&self) -> &[Vec<Symbol>] {
        &self.alternatives
    }

    fn is_left_recursive(&self, symbols: &[Symbol]) -> bool {
        matches!(symbols.first(), Some(Symbol::Rule { rule, .. }) if *rule == self.name)
    }

    pub fn is_self_referential(&self) -> bool {
        self.alternatives
            .iter()
            .any(|alt| self.is_left_recursive(alt))
    }

    /// Wraps the production in the registry binding matching its kind.
    pub fn into_def(self) -> RuleDef {
        if self.is_self_referential() {
            RuleDef::Recursive(std::sync::Arc::new(self))
        } else {
            RuleDef::Plain(std::sync::Arc::new(self))
        }
    }

    fn node_tag(&self) -> Tag {
        Tag::rule(&self.tag)
    }

    // ------------------------------------------------------------------------
    // Sequence matching
    // ------------------------------------------------------------------------

    fn first_match<'a, I>(
        &self,
        alternatives: I,
        input: &Stream,
        seed: Option<&Node>,
        rules: &RuleRegistry,
    ) -> ParseResult
    where
        I: Iterator<Item = &'a Vec<Symbol>>,
    {
        if input.is_empty() {
            return Ok(None);
        }
        for symbols in alternatives.filter(|s| !s.is_empty()) {
            if let Some(parsed) = self.match_sequence(symbols, input, seed, rules)? {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    fn match_sequence(
        &self,
        symbols: &[Symbol],
        input: &Stream,
        seed: Option<&Node>,
        rules: &RuleRegistry,
    ) -> ParseResult {
        let mut stream = input.fork();

        if seed.is_none() && symbols.len() == 1 && !self.is_self_referential() {
            return self.match_single(&symbols[0], stream, rules);
        }

        let mut fields = Fields::new();
        let mut rest = symbols.iter();
        let mut accumulator = None;

        if let Some(seed) = seed {
            let Some(Symbol::Rule { field, .. }) = rest.next() else {
                return Ok(None);
            };
            fields.insert(field.clone(), seed.clone());
            accumulator = Some(field.clone());
        }

        for symbol in rest {
            match symbol {
                Symbol::Literal(text) => {
                    if stream.pop_if(text).is_none() {
                        return Ok(None);
                    }
                }
                Symbol::Rule { field, rule } => match rules.parse(rule, &stream)? {
                    Some(parsed) => {
                        stream = parsed.stream;
                        fields.insert(field.clone(), parsed.node);
                    }
                    None => return Ok(None),
                },
            }
        }

        let node = match accumulator {
            Some(field) => Node::grown(self.node_tag(), field, fields),
            None if self.is_self_referential() => Node::seed(self.node_tag(), fields),
            None => Node::branch(self.node_tag(), fields),
        };
        Ok(Some(Parsed::new(stream, node)))
    }

    /// A one-symbol alternative of a plain production.
    ///
    /// A literal or a built-in token becomes a leaf tagged with this production; any other
    /// rule's node is kept as the only field.
    fn match_single(&self, symbol: &Symbol, mut stream: Stream, rules: &RuleRegistry) -> ParseResult {
        match symbol {
            Symbol::Literal(text) => Ok(stream
                .pop_if(text)
                .map(|token| Parsed::new(stream, Node::leaf(self.node_tag(), token)))),
            Symbol::Rule { field, rule } => {
                let Some(parsed) = rules.parse(rule, &stream)? else {
                    return Ok(None);
                };
                let node = if parsed.node.tag().is_builtin() && parsed.node.is_leaf() {
                    parsed.node.retagged(self.node_tag())
                } else {
                    let fields: Fields = std::iter::once((field.clone(), parsed.node)).collect();
                    Node::branch(self.node_tag(), fields)
                };
                Ok(Some(Parsed::new(parsed.stream, node)))
            }
        }
    }
}

impl Rule for Production {
    fn parse(&self, input: &Stream, rules: &RuleRegistry) -> ParseResult {
        if self.is_self_referential() {
            grow(self, input, rules)
        } else {
            self.first_match(self.alternatives.iter(), input, None, rules)
        }
    }
}

impl RecursiveRule for Production {
    fn step(&self, input: &Stream, seed: Option<&Node>, rules: &RuleRegistry) -> ParseResult {
        let recursive = seed.is_some();
        let alternatives = self
            .alternatives
            .iter()
            .filter(|alt| self.is_left_recursive(alt) == recursive);
        self.first_match(alternatives, input, seed, rules)
    }
}
