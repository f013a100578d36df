//! # macten
//!
//! A small meta-programming engine. A grammar of named rules is matched against source
//! text by recursive descent with backtracking; each completed top-level construct is a
//! generic tagged tree that a handler turns into generated text.
//!
//! ```
//! use macten::{Expander, HandlerRegistry, Node, RuleRegistry};
//! use macten::ast::{get, Lookup};
//!
//! let mut expander = Expander::new(RuleRegistry::new(), HandlerRegistry::new());
//! expander
//!     .load_profiles("greet { who { ident } greet_str { hello who ! } }")
//!     .unwrap();
//! expander.handlers_mut().register("greet", |node: &Node| {
//!     let who = get(Some(node), "who", true).map(Lookup::text).unwrap_or_default();
//!     Ok(format!("print(\"hello, {who}\")"))
//! });
//! let out = expander.expand("greet", "hello world !").unwrap();
//! assert_eq!(out[0].text(), "print(\"hello, world\")");
//! ```
//!
//! Pipeline: [`syntax`] (tokens and the forkable stream) → [`rules`] (registry, rule
//! protocol, seed growing, productions) → [`ast`] (nodes, navigation, printing) →
//! [`handlers`] (dispatch). [`macros`] reads grammars written as profiles, along with
//! template macros called as `name![...]`, and [`engine`] ties the pieces into one session.

pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, MactenError};

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod engine;
pub mod handlers;
pub mod macros;
pub mod output;
pub mod rules;
pub mod syntax;

pub use ast::{Node, Tag};
pub use config::ExpanderConfig;
pub use engine::Expander;
pub use handlers::{Dispatch, HandlerRegistry};
pub use macros::{DeclarativeRegistry, Profile};
pub use rules::{Parsed, RuleRegistry};
pub use syntax::{tokenize, Span, Stream, Token};
