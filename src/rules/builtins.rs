//! Built-in lexical rules every registry starts with.
//!
//! | name     | matches                                                      |
//! |----------|--------------------------------------------------------------|
//! | `ident`  | one identifier token                                         |
//! | `number` | one token made of digits with at most one decimal point      |
//!
//! Because the tokenizer emits one token per digit, `number` in practice matches a single
//! digit. Multi-digit numerals would need tokenizer support first.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ast::{Node, Tag};
use crate::rules::Parsed;
use crate::syntax::{Stream, Token, TokenKind};

lazy_static! {
    static ref NUMERIC: Regex =
        Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").expect("numeric pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    Ident,
    Number,
}

impl Builtin {
    pub const ALL: [Builtin; 2] = [Builtin::Ident, Builtin::Number];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Ident => "ident",
            Builtin::Number => "number",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn tag(self) -> Tag {
        match self {
            Builtin::Ident => Tag::Ident,
            Builtin::Number => Tag::Number,
        }
    }

    pub fn accepts(self, token: &Token) -> bool {
        match self {
            Builtin::Ident => token.kind() == TokenKind::Ident,
            Builtin::Number => NUMERIC.is_match(token.text()),
        }
    }

    /// Matches one token at the front of `input`.
    pub fn parse(self, input: &Stream) -> Option<Parsed> {
        let token = input.peek(0).ok()?;
        if !self.accepts(token) {
            return None;
        }
        let mut stream = input.fork();
        let token = stream.pop(0).ok()?;
        Some(Parsed::new(stream, Node::leaf(self.tag(), token)))
    }
}
