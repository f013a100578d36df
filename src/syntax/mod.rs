//! Lexical layer: tokens, the tokenizer, and the backtracking token stream.

pub mod stream;
pub mod token;

pub use stream::{Checkpoint, Stream};
pub use token::{tokenize, Span, Token, TokenKind};
