//! The token stream: a cursor over a shared, immutable token buffer.
//!
//! Every rule attempt works on a fork. Forking clones an `Arc` and an index, so a failed
//! attempt is abandoned by simply dropping its fork; the caller's stream never moved.

use std::sync::Arc;

use crate::syntax::token::{tokenize, Token};
use crate::MactenError;

/// Saved cursor position, see [`Stream::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
pub struct Stream {
    tokens: Arc<[Token]>,
    cursor: usize,
}

impl Stream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            cursor: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(tokenize(text))
    }

    /// Returns an independent stream at the same position.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.cursor)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.0.min(self.tokens.len());
    }

    /// Index of the token `offset` places after the cursor, if it exists.
    fn index_of(&self, offset: usize) -> Result<usize, MactenError> {
        match self.cursor.checked_add(offset) {
            Some(index) if index < self.tokens.len() => Ok(index),
            Some(index) => Err(MactenError::out_of_bounds(index, self.tokens.len())),
            None => Err(MactenError::out_of_bounds(usize::MAX, self.tokens.len())),
        }
    }

    /// Reads the token `offset` places after the cursor without consuming it.
    pub fn peek(&self, offset: usize) -> Result<&Token, MactenError> {
        let index = self.index_of(offset)?;
        Ok(&self.tokens[index])
    }

    /// Consumes the next token if its text equals `expected`.
    ///
    /// A mismatch leaves the stream where it was. This is the trial-matching primitive,
    /// so a mismatch is `None` rather than an error.
    pub fn pop_if(&mut self, expected: &str) -> Option<Token> {
        let token = self.tokens.get(self.cursor)?;
        if token.text() != expected {
            return None;
        }
        let token = token.clone();
        self.cursor += 1;
        Some(token)
    }

    /// Consumes and returns the token `offset` places after the cursor.
    ///
    /// The cursor moves past the returned token, so the `offset` tokens before it are
    /// consumed with it.
    pub fn pop(&mut self, offset: usize) -> Result<Token, MactenError> {
        let index = self.index_of(offset)?;
        let token = self.tokens[index].clone();
        self.cursor = index + 1;
        Ok(token)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.cursor)
    }

    /// Number of tokens consumed since the start of the buffer.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of tokens this stream has consumed beyond `origin`.
    ///
    /// Both streams must be forks of the same buffer.
    pub fn consumed_since(&self, origin: &Stream) -> usize {
        debug_assert!(Arc::ptr_eq(&self.tokens, &origin.tokens));
        self.cursor.saturating_sub(origin.cursor)
    }

    pub fn rest(&self) -> &[Token] {
        &self.tokens[self.cursor.min(self.tokens.len())..]
    }
}

impl From<Vec<Token>> for Stream {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}
