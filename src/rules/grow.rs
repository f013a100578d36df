//! Seed growing for left-recursive rules.
//!
//! A rule like `list := list item | item` cannot be parsed by plain recursive descent: the
//! first thing `list` does is call `list` again. Instead, the rule is expressed as a
//! [`RecursiveRule::step`] and driven by a loop:
//!
//! 1. Step with no seed. This can only use the non-recursive alternatives (`item`).
//! 2. Step again with the previous result as the seed, from where the seed ended. A
//!    recursive alternative binds the seed in place of its leading self-call.
//! 3. Keep the new result only if it consumed strictly more input than the seed did;
//!    otherwise stop and return the seed.
//!
//! Consumption strictly increases on every continued iteration and is bounded by the
//! number of tokens left, so the loop runs at most `remaining + 1` steps. Nothing is
//! memoized: each call to the rule grows its own seed.

use crate::rules::{Parsed, ParseResult, RecursiveRule, RuleRegistry};
use crate::syntax::Stream;

/// Grows `rule` from `input` as far as it will go.
///
/// `Ok(None)` when not even the first step matches.
pub fn grow<R>(rule: &R, input: &Stream, rules: &RuleRegistry) -> ParseResult
where
    R: RecursiveRule + ?Sized,
{
    grow_inner(rule, input, rules, |_| {})
}

/// Like [`grow`], also returning the tokens consumed (relative to `input`) by each seed that
/// was kept, in order.
pub fn grow_traced<R>(
    rule: &R,
    input: &Stream,
    rules: &RuleRegistry,
) -> Result<(Option<Parsed>, Vec<usize>), crate::MactenError>
where
    R: RecursiveRule + ?Sized,
{
    let mut trace = Vec::new();
    let result = grow_inner(rule, input, rules, |consumed| trace.push(consumed))?;
    Ok((result, trace))
}

fn grow_inner<R, F>(rule: &R, input: &Stream, rules: &RuleRegistry, mut on_grow: F) -> ParseResult
where
    R: RecursiveRule + ?Sized,
    F: FnMut(usize),
{
    let mut seed: Option<Parsed> = None;
    loop {
        let position = seed.as_ref().map_or(input, |s| &s.stream);
        let seed_node = seed.as_ref().map(|s| &s.node);
        let candidate = rule.step(position, seed_node, rules)?;
        match candidate {
            Some(next) if next.stream.position() > position.position() => {
                on_grow(next.stream.consumed_since(input));
                seed = Some(next);
            }
            _ => return Ok(seed),
        }
    }
}
