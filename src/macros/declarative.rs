//! # Declarative macros
//!
//! A declarative macro is a list of branches, each a pattern over the call's arguments and
//! a template body:
//!
//! ```text
//! defmacten_dec each {
//!   ($x)               => { emit ( $x ) ; }
//!   ($x , $( $rest ))  => { emit ( $x ) ; each![$rest] }
//! }
//! ```
//!
//! It is called as `NAME![arguments]`. The first branch whose pattern matches the
//! arguments is expanded: `$name` in the body is replaced by what the pattern bound, and
//! calls to known macros inside the result are expanded in turn.
//!
//! ## Patterns
//!
//! - `$name` binds one argument: a single token, or a parenthesized group bound without
//!   its parentheses.
//! - Any other token must appear in the arguments as is.
//! - `$( ... $name ... )` may close a pattern. Its items must match the remaining
//!   arguments one or more times over; `$name` is then bound to all of them.
//! - A pattern without a group matches only if it uses up every argument, so `()`
//!   matches an empty call.
//!
//! Expansions are rendered as their tokens separated by single spaces. Text around call
//! sites is kept as written.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{to_error_source, SourceArc};
use crate::syntax::{tokenize, Span, Stream, Token};
use crate::{err_ctx, err_msg, MactenError};

const KEYWORD: &str = "defmacten_dec";

/// Nested calls allowed below one call site.
pub const MAX_DEPTH: usize = 64;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternItem {
    /// A token the arguments must contain as is.
    Token(Token),
    /// `$name`
    Arg(String),
}

/// The closing `$( ... )` group of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeat {
    pub items: Vec<PatternItem>,
    /// Bound to every argument the group matched.
    pub container: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub items: Vec<PatternItem>,
    pub repeat: Option<Repeat>,
}

/// Argument name to the tokens it was bound to.
pub type Bindings = HashMap<String, Vec<Token>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub pattern: Pattern,
    pub body: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarativeMacro {
    name: String,
    branches: Vec<Branch>,
}

/// Declarative macros by name.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeRegistry {
    macros: HashMap<String, DeclarativeMacro>,
}

// ============================================================================
// MATCHING
// ============================================================================

impl Pattern {
    /// Binds `args` against this pattern. `None` when they do not match.
    pub fn bind(&self, args: &[Token]) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        let fixed = match_items(&self.items, args, &mut bindings)?;
        let rest = &args[fixed..];

        let Some(repeat) = &self.repeat else {
            return rest.is_empty().then_some(bindings);
        };
        if rest.is_empty() {
            return None;
        }
        let mut at = 0;
        let mut scratch = Bindings::new();
        while at < rest.len() {
            let used = match_items(&repeat.items, &rest[at..], &mut scratch)?;
            if used == 0 {
                return None;
            }
            at += used;
        }
        bindings.insert(repeat.container.clone(), rest.to_vec());
        Some(bindings)
    }
}

/// Matches `items` at the front of `args`. Returns how many tokens they used.
fn match_items(items: &[PatternItem], args: &[Token], bindings: &mut Bindings) -> Option<usize> {
    let mut at = 0;
    for item in items {
        let rest = &args[at..];
        match item {
            PatternItem::Token(expected) => {
                if rest.first()? != expected {
                    return None;
                }
                at += 1;
            }
            PatternItem::Arg(name) => {
                let len = argument_len(rest)?;
                let value = if rest[0].text() == "(" {
                    &rest[1..len - 1]
                } else {
                    &rest[..len]
                };
                bindings.insert(name.clone(), value.to_vec());
                at += len;
            }
        }
    }
    Some(at)
}

/// Length of the argument at the front of `args`: one token, or a whole parenthesized
/// group.
fn argument_len(args: &[Token]) -> Option<usize> {
    match args.first()?.text() {
        "(" => closing(args, 0, "(", ")").map(|close| close + 1),
        _ => Some(1),
    }
}

/// Index of the token closing the group opened at `tokens[open]`.
fn closing(tokens: &[Token], open: usize, left: &str, right: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.text() == left {
            depth += 1;
        } else if token.text() == right {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Copies `body`, replacing each bound `$name` by its tokens. Unbound names stay as
/// written.
fn substitute(body: &[Token], bindings: &Bindings) -> Vec<Token> {
    let mut out = Vec::with_capacity(body.len());
    let mut tokens = body.iter().peekable();
    while let Some(token) = tokens.next() {
        if token.text() == "$" {
            if let Some(value) = tokens.peek().and_then(|name| bindings.get(name.text())) {
                out.extend(value.iter().cloned());
                tokens.next();
                continue;
            }
        }
        out.push(token.clone());
    }
    out
}

pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::text)
        .collect::<Vec<_>>()
        .join(" ")
}

impl DeclarativeMacro {
    pub fn new(name: &str, branches: Vec<Branch>) -> Self {
        Self {
            name: name.to_string(),
            branches,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Index of the first branch matching `args`, with its bindings.
    pub fn select(&self, args: &[Token]) -> Option<(usize, Bindings)> {
        self.branches
            .iter()
            .enumerate()
            .find_map(|(index, branch)| branch.pattern.bind(args).map(|b| (index, b)))
    }
}

// ============================================================================
// EXPANSION
// ============================================================================

/// A `NAME ! [ ... ]` call of a registered macro.
struct Call<'t> {
    name: &'t Token,
    open: usize,
    /// Index of the closing `]`, `None` when the call is never closed.
    close: Option<usize>,
}

impl DeclarativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `definition`, returning the macro it replaces.
    pub fn register(&mut self, definition: DeclarativeMacro) -> Option<DeclarativeMacro> {
        self.macros.insert(definition.name.clone(), definition)
    }

    /// Reads every macro in `source` and registers it. Returns their names in order.
    pub fn load(&mut self, source: &str) -> Result<Vec<String>, MactenError> {
        let mut names = Vec::new();
        for definition in parse_declarative(source)? {
            names.push(definition.name.clone());
            self.register(definition);
        }
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Option<&DeclarativeMacro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Replaces every call site in `text` by its expansion.
    ///
    /// A call no branch matches, or one missing its `]`, is a `Parse` error pointing at
    /// the call.
    pub fn expand(&self, text: &str) -> Result<String, MactenError> {
        let source = to_error_source("input", text);
        let tokens = tokenize(text);
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;

        while i < tokens.len() {
            let Some(call) = self.call_at(&tokens, i) else {
                i += 1;
                continue;
            };
            let Some(close) = call.close else {
                return Err(err_ctx!(
                    Parse,
                    format!("Unclosed '[' in call to '{}'", call.name),
                    &source,
                    tokens[call.open].span(),
                    "Macro calls look like `name![arguments]`."
                ));
            };
            let args = &tokens[call.open + 1..close];
            let Some(expansion) = self.apply(call.name.text(), args, 0)? else {
                let span = Span {
                    start: call.name.span().start,
                    end: tokens[close].span().end,
                };
                return Err(err_ctx!(
                    Parse,
                    no_branch(call.name.text(), args),
                    &source,
                    span,
                    "Branches are tried in order; the first whose pattern uses every argument wins."
                ));
            };
            out.push_str(&text[copied..call.name.span().start]);
            out.push_str(&render(&expansion));
            copied = tokens[close].span().end;
            i = close + 1;
        }

        out.push_str(&text[copied..]);
        Ok(out)
    }

    /// Expands one call of `name` with the given argument text.
    pub fn invoke(&self, name: &str, args: &str) -> Result<String, MactenError> {
        let args = tokenize(args);
        match self.apply(name, &args, 0)? {
            Some(tokens) => Ok(render(&tokens)),
            None => Err(err_msg!(Parse, no_branch(name, &args))),
        }
    }

    /// `Ok(None)` when no branch of `name` matches `args`.
    fn apply(&self, name: &str, args: &[Token], depth: usize) -> Result<Option<Vec<Token>>, MactenError> {
        if depth >= MAX_DEPTH {
            return Err(err_msg!(
                Parse,
                "Expansion of '{}' exceeded {} nested calls",
                name,
                MAX_DEPTH
            ));
        }
        let definition = self
            .get(name)
            .ok_or_else(|| err_msg!(Parse, "No declarative macro named '{}'", name))?;
        let Some((index, bindings)) = definition.select(args) else {
            return Ok(None);
        };
        let body = substitute(&definition.branches[index].body, &bindings);
        self.expand_tokens(&body, depth + 1).map(Some)
    }

    fn expand_tokens(&self, tokens: &[Token], depth: usize) -> Result<Vec<Token>, MactenError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let Some(call) = self.call_at(tokens, i) else {
                out.push(tokens[i].clone());
                i += 1;
                continue;
            };
            let Some(close) = call.close else {
                return Err(err_msg!(Parse, "Unclosed '[' in call to '{}'", call.name));
            };
            let args = &tokens[call.open + 1..close];
            match self.apply(call.name.text(), args, depth)? {
                Some(expansion) => out.extend(expansion),
                None => return Err(err_msg!(Parse, no_branch(call.name.text(), args))),
            }
            i = close + 1;
        }
        Ok(out)
    }

    fn call_at<'t>(&self, tokens: &'t [Token], at: usize) -> Option<Call<'t>> {
        let name = tokens.get(at)?;
        let is_call = name.is_ident()
            && self.contains(name.text())
            && tokens.get(at + 1).is_some_and(|t| t.text() == "!")
            && tokens.get(at + 2).is_some_and(|t| t.text() == "[");
        if !is_call {
            return None;
        }
        let open = at + 2;
        Some(Call {
            name,
            open,
            close: closing(tokens, open, "[", "]"),
        })
    }
}

fn no_branch(name: &str, args: &[Token]) -> String {
    format!("No branch of '{}' matches '{}'", name, render(args))
}

// =============================
// Definition reading
// =============================

/// Parses every declarative macro in `source`.
///
/// ```text
/// source := macro*
/// macro  := ["defmacten_dec"] NAME "{" branch+ "}"
/// branch := "(" pattern ")" "=" ">" "{" body "}"
/// ```
pub fn parse_declarative(source: &str) -> Result<Vec<DeclarativeMacro>, MactenError> {
    let mut reader = MacroReader::new(source);
    let mut macros = Vec::new();
    while !reader.stream.is_empty() {
        macros.push(reader.definition()?);
    }
    Ok(macros)
}

struct MacroReader {
    stream: Stream,
    source: SourceArc,
    end: Span,
}

impl MacroReader {
    fn new(text: &str) -> Self {
        Self {
            stream: Stream::from_text(text),
            source: to_error_source("macro definition", text),
            end: Span {
                start: text.len(),
                end: text.len(),
            },
        }
    }

    fn definition(&mut self) -> Result<DeclarativeMacro, MactenError> {
        self.stream.pop_if(KEYWORD);
        let name = match self.next() {
            Some(token) if token.is_ident() => self.stream.pop(0)?,
            found => {
                return Err(err_ctx!(
                    Parse,
                    "Expected a macro name",
                    &self.source,
                    found.map_or(self.end, |t| t.span()),
                    "Macros start with `defmacten_dec NAME {`."
                ))
            }
        };
        let open = self.expect("{", &name)?;

        let mut branches = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return Err(err_ctx!(
                    Parse,
                    format!("Macro '{}' is missing its closing '}}'", name),
                    &self.source,
                    open.span()
                ));
            };
            if token.text() == "}" {
                self.stream.pop(0)?;
                break;
            }
            branches.push(self.branch(&name)?);
        }

        if branches.is_empty() {
            return Err(err_ctx!(
                Parse,
                format!("Macro '{}' defines no branches", name),
                &self.source,
                name.span(),
                "Branches look like `(pattern) => { body }`."
            ));
        }
        Ok(DeclarativeMacro::new(name.text(), branches))
    }

    fn branch(&mut self, name: &Token) -> Result<Branch, MactenError> {
        let open = self.expect("(", name)?;
        let (tokens, close) = self.group(&open, "(", ")")?;
        let pattern = self.pattern(&tokens)?;
        let equals = self.expect("=", &close)?;
        let arrow = self.expect(">", &equals)?;
        let open = self.expect("{", &arrow)?;
        let (body, _) = self.group(&open, "{", "}")?;
        Ok(Branch { pattern, body })
    }

    fn pattern(&self, tokens: &[Token]) -> Result<Pattern, MactenError> {
        let mut pattern = Pattern::default();
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if pattern.repeat.is_some() {
                return Err(err_ctx!(
                    Parse,
                    format!("Unexpected '{}' after a repeated group", token),
                    &self.source,
                    token.span(),
                    "A `$( ... )` group must close the pattern."
                ));
            }
            if token.text() != "$" {
                pattern.items.push(PatternItem::Token(token.clone()));
                i += 1;
                continue;
            }
            match tokens.get(i + 1) {
                Some(arg) if arg.is_ident() => {
                    pattern.items.push(PatternItem::Arg(arg.text().to_string()));
                    i += 2;
                }
                Some(open) if open.text() == "(" => {
                    let Some(close) = closing(tokens, i + 1, "(", ")") else {
                        return Err(self.unclosed(open, "(", ")"));
                    };
                    pattern.repeat = Some(self.repeat(&tokens[i + 2..close], open)?);
                    i = close + 1;
                }
                _ => return Err(self.missing_argument(token)),
            }
        }
        Ok(pattern)
    }

    fn repeat(&self, tokens: &[Token], open: &Token) -> Result<Repeat, MactenError> {
        let mut items = Vec::new();
        let mut container: Option<String> = None;
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if token.text() != "$" {
                items.push(PatternItem::Token(token.clone()));
                i += 1;
                continue;
            }
            let Some(arg) = tokens.get(i + 1).filter(|t| t.is_ident()) else {
                return Err(self.missing_argument(token));
            };
            if container.is_some() {
                return Err(err_ctx!(
                    Parse,
                    format!("Second argument '{}' in a repeated group", arg),
                    &self.source,
                    arg.span(),
                    "A repeated group binds exactly one argument."
                ));
            }
            container = Some(arg.text().to_string());
            items.push(PatternItem::Arg(arg.text().to_string()));
            i += 2;
        }
        let Some(container) = container else {
            return Err(err_ctx!(
                Parse,
                "Repeated group without an argument",
                &self.source,
                open.span(),
                "Write the group as `$( , $rest )`."
            ));
        };
        Ok(Repeat { items, container })
    }

    /// Tokens up to the one closing `open`, and that closing token. Both are consumed.
    fn group(&mut self, open: &Token, left: &str, right: &str) -> Result<(Vec<Token>, Token), MactenError> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let Ok(token) = self.stream.pop(0) else {
                return Err(self.unclosed(open, left, right));
            };
            if token.text() == left {
                depth += 1;
            } else if token.text() == right {
                if depth == 0 {
                    return Ok((tokens, token));
                }
                depth -= 1;
            }
            tokens.push(token);
        }
    }

    fn expect(&mut self, text: &str, after: &Token) -> Result<Token, MactenError> {
        if let Some(token) = self.stream.pop_if(text) {
            return Ok(token);
        }
        let span = self.next().map_or(self.end, |t| t.span());
        Err(err_ctx!(
            Parse,
            format!("Expected '{}' after '{}'", text, after),
            &self.source,
            span
        ))
    }

    fn unclosed(&self, open: &Token, left: &str, right: &str) -> MactenError {
        err_ctx!(
            Parse,
            format!("Unclosed '{}'", left),
            &self.source,
            open.span(),
            format!("Every '{}' needs a matching '{}'.", left, right)
        )
    }

    fn missing_argument(&self, dollar: &Token) -> MactenError {
        err_ctx!(
            Parse,
            "Expected an argument name after '$'",
            &self.source,
            dollar.span(),
            "Arguments look like `$name`."
        )
    }

    fn next(&self) -> Option<Token> {
        self.stream.peek(0).ok().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    const EACH: &str = r#"
        defmacten_dec each {
          ($x) => { emit ( $x ) ; }
          ($x , $( $rest )) => { emit ( $x ) ; each![$rest] }
        }
    "#;

    fn registry(source: &str) -> DeclarativeRegistry {
        let mut macros = DeclarativeRegistry::new();
        macros.load(source).unwrap();
        macros
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::text).collect()
    }

    fn first_pattern(source: &str) -> Pattern {
        parse_declarative(source).unwrap()[0].branches()[0]
            .pattern
            .clone()
    }

    #[test]
    fn reads_branches_in_order() {
        let macros = parse_declarative(EACH).unwrap();
        assert_eq!(macros.len(), 1);
        let each = &macros[0];
        assert_eq!(each.name(), "each");
        assert_eq!(each.branches().len(), 2);
        assert_eq!(
            each.branches()[0].pattern.items,
            vec![PatternItem::Arg("x".to_string())]
        );
        let repeat = each.branches()[1].pattern.repeat.as_ref().unwrap();
        assert_eq!(repeat.container, "rest");
        assert_eq!(texts(&each.branches()[0].body), vec!["emit", "(", "$", "x", ")", ";"]);
    }

    #[test]
    fn keyword_is_optional_and_several_macros_load() {
        let macros = registry("one { () => { 1 } } defmacten_dec two { () => { 2 } }");
        assert_eq!(macros.len(), 2);
        assert!(macros.contains("one") && macros.contains("two"));
    }

    #[test]
    fn empty_pattern_matches_only_an_empty_call() {
        let pattern = first_pattern("m { () => { x } }");
        assert!(pattern.bind(&[]).is_some());
        assert!(pattern.bind(&tokenize("a")).is_none());
    }

    #[test]
    fn arguments_bind_a_token_or_a_group() {
        let pattern = first_pattern("m { ($a + $b) => { } }");
        let bindings = pattern.bind(&tokenize("x + (y * z)")).unwrap();
        assert_eq!(texts(&bindings["a"]), vec!["x"]);
        assert_eq!(texts(&bindings["b"]), vec!["y", "*", "z"]);
        assert!(pattern.bind(&tokenize("x - y")).is_none());
        assert!(pattern.bind(&tokenize("x + y z")).is_none());
    }

    #[test]
    fn repeated_group_binds_the_rest() {
        let pattern = first_pattern("m { ($first $( , $item )) => { } }");
        let bindings = pattern.bind(&tokenize("a , b , c")).unwrap();
        assert_eq!(texts(&bindings["first"]), vec!["a"]);
        assert_eq!(texts(&bindings["item"]), vec![",", "b", ",", "c"]);
        // At least one repetition, and every repetition must match.
        assert!(pattern.bind(&tokenize("a")).is_none());
        assert!(pattern.bind(&tokenize("a , b ; c")).is_none());
    }

    #[test]
    fn first_matching_branch_wins() {
        let macros = registry("pick { (one) => { first } ($x) => { second $x } }");
        assert_eq!(macros.invoke("pick", "one").unwrap(), "first");
        assert_eq!(macros.invoke("pick", "two").unwrap(), "second two");
    }

    #[test]
    fn nested_calls_expand_recursively() {
        let macros = registry(EACH);
        assert_eq!(
            macros.invoke("each", "a , b , c").unwrap(),
            "emit ( a ) ; emit ( b ) ; emit ( c ) ;"
        );
    }

    #[test]
    fn expand_keeps_text_around_call_sites() {
        let macros = registry(EACH);
        let out = macros.expand("def f():\n    each![a, b]\n    return").unwrap();
        assert_eq!(out, "def f():\n    emit ( a ) ; emit ( b ) ;\n    return");
        assert_eq!(macros.expand("nothing! [here]").unwrap(), "nothing! [here]");
    }

    #[test]
    fn unmatched_call_points_at_the_call() {
        let macros = registry("pair { ($a , $b) => { $a $b } }");
        let text = "x = pair![1]";
        let err = macros.expand(text).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
        assert!(err.to_string().contains("No branch of 'pair' matches '1'"));
        let MactenError::Parse { ctx, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(ctx.span, Some(Span { start: 4, end: 12 }));
    }

    #[test]
    fn unclosed_call_is_a_parse_error() {
        let macros = registry(EACH);
        let err = macros.expand("each![a, b").unwrap_err();
        assert!(err.to_string().contains("Unclosed '[' in call to 'each'"));
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let macros = registry("loop { ($x) => { loop![$x] } }");
        let err = macros.invoke("loop", "a").unwrap_err();
        assert!(err.to_string().contains("exceeded 64 nested calls"));
    }

    #[test]
    fn malformed_definitions() {
        let cases = [
            ("m { }", "defines no branches"),
            ("m { ($x) { } }", "Expected '=' after ')'"),
            ("m { ($x => { }", "Unclosed '('"),
            ("m { ($) => { } }", "Expected an argument name after '$'"),
            ("m { ($( , )) => { } }", "Repeated group without an argument"),
            ("m { ($( $a ) b) => { } }", "Unexpected 'b' after a repeated group"),
            ("m { () => { x }", "missing its closing '}'"),
        ];
        for (source, message) in cases {
            let err = parse_declarative(source).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Parse, "{source}");
            assert!(err.to_string().contains(message), "{source}: {err}");
        }
    }

    #[test]
    fn re_registering_replaces_the_macro() {
        let mut macros = registry("m { () => { old } }");
        let replaced = macros.register(parse_declarative("m { () => { new } }").unwrap().remove(0));
        assert!(replaced.is_some());
        assert_eq!(macros.invoke("m", "").unwrap(), "new");
    }
}
