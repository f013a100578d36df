//! Tokens and the tokenizer.
//!
//! The tokenizer is deliberately small: identifier-class runs become one token, whitespace
//! is dropped, and every other character stands alone. Digit runs are not grouped, so
//! `42` is two `Digit` tokens; the built-in `number` rule only ever sees a single digit.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Byte range of a token in the text it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::new(span.start.into(), span.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident,
    /// A single ASCII digit not preceded by an identifier character.
    Digit,
    /// Any other single character.
    Punct,
}

/// An immutable lexeme.
///
/// Equality compares kind and text only; the span is location metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    kind: TokenKind,
    text: Arc<str>,
    span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token {}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        &*self.text == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        &*self.text == *other
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits `text` into tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        if is_ident_start(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if !is_ident_continue(next) {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            tokens.push(Token::new(
                TokenKind::Ident,
                &text[start..end],
                Span { start, end },
            ));
            continue;
        }

        let end = start + c.len_utf8();
        let kind = if c.is_ascii_digit() {
            TokenKind::Digit
        } else {
            TokenKind::Punct
        };
        tokens.push(Token::new(kind, &text[start..end], Span { start, end }));
    }

    tokens
}
