//! Reads profiles from definition text.
//!
//! ```text
//! source      := profile*
//! profile     := ["defmacten_proc"] NAME "{" rule* "}"
//! rule        := RULE alternative ("|" alternative)*
//! alternative := "{" balanced-tokens "}"
//! ```
//!
//! The text is tokenized by the engine's own tokenizer. Malformed definitions are `Parse`
//! errors pointing into the definition text.

use crate::diagnostics::{to_error_source, SourceArc};
use crate::err_ctx;
use crate::macros::Profile;
use crate::syntax::{Span, Stream, Token};
use crate::MactenError;

const KEYWORD: &str = "defmacten_proc";

// =============================
// Public API for profile loading
// =============================

/// Parses every profile in `source`.
pub fn parse_profiles(source: &str) -> Result<Vec<Profile>, MactenError> {
    let mut reader = DefinitionReader::new(source);
    let mut profiles = Vec::new();
    while !reader.stream.is_empty() {
        profiles.push(reader.profile()?);
    }
    Ok(profiles)
}

/// Parses a source holding exactly one profile.
pub fn parse_profile(source: &str) -> Result<Profile, MactenError> {
    let mut reader = DefinitionReader::new(source);
    let profile = reader.profile()?;
    if let Ok(extra) = reader.stream.peek(0) {
        return Err(err_ctx!(
            Parse,
            format!("Unexpected '{}' after profile '{}'", extra, profile.name()),
            &reader.source,
            extra.span(),
            "Use parse_profiles to read several profiles at once."
        ));
    }
    Ok(profile)
}

// =============================
// Internal parsing helpers
// =============================

struct DefinitionReader {
    stream: Stream,
    source: SourceArc,
    end: Span,
}

impl DefinitionReader {
    fn new(text: &str) -> Self {
        Self {
            stream: Stream::from_text(text),
            source: to_error_source("profile definition", text),
            end: Span {
                start: text.len(),
                end: text.len(),
            },
        }
    }

    fn profile(&mut self) -> Result<Profile, MactenError> {
        self.stream.pop_if(KEYWORD);
        let name = self.name("Expected a profile name", "Profiles start with `defmacten_proc NAME {`.")?;
        let open = self.open_brace(&name)?;
        let mut profile = Profile::new(name.text());

        loop {
            let Some(token) = self.next() else {
                return Err(err_ctx!(
                    Parse,
                    format!("Profile '{}' is missing its closing '}}'", name),
                    &self.source,
                    open.span()
                ));
            };
            if token.text() == "}" {
                self.stream.pop(0)?;
                break;
            }
            let rule = self.name("Expected a rule name or '}'", "Rules look like `name { symbols }`.")?;
            let alternatives = self.alternatives(&rule)?;
            profile.define(rule.text(), alternatives);
        }

        if profile.top_level().is_none() {
            return Err(err_ctx!(
                Parse,
                format!("Profile '{}' defines no rules", name),
                &self.source,
                name.span(),
                "The last rule of a profile parses the whole construct."
            ));
        }
        Ok(profile)
    }

    fn alternatives(&mut self, rule: &Token) -> Result<Vec<Vec<String>>, MactenError> {
        let mut alternatives = vec![self.alternative(rule)?];
        while self.stream.pop_if("|").is_some() {
            alternatives.push(self.alternative(rule)?);
        }
        Ok(alternatives)
    }

    /// One brace-delimited alternative. Inner braces are kept as literal symbols.
    fn alternative(&mut self, rule: &Token) -> Result<Vec<String>, MactenError> {
        let open = self.open_brace(rule)?;
        let mut symbols = Vec::new();
        let mut depth = 0usize;
        loop {
            let Ok(token) = self.stream.pop(0) else {
                return Err(err_ctx!(
                    Parse,
                    format!("Unclosed '{{' in rule '{}'", rule),
                    &self.source,
                    open.span(),
                    "Every '{' in a rule body needs a matching '}'."
                ));
            };
            match token.text() {
                "{" => depth += 1,
                "}" if depth == 0 => return Ok(symbols),
                "}" => depth -= 1,
                _ => {}
            }
            symbols.push(token.text().to_string());
        }
    }

    fn name(&mut self, message: &str, help: &str) -> Result<Token, MactenError> {
        match self.next() {
            Some(token) if token.is_ident() => Ok(self.stream.pop(0)?),
            Some(token) => Err(err_ctx!(Parse, message, &self.source, token.span(), help)),
            None => Err(err_ctx!(Parse, message, &self.source, self.end, help)),
        }
    }

    fn open_brace(&mut self, after: &Token) -> Result<Token, MactenError> {
        if let Some(token) = self.stream.pop_if("{") {
            return Ok(token);
        }
        let span = self.next().map_or(self.end, |t| t.span());
        Err(err_ctx!(
            Parse,
            format!("Expected '{{' after '{}'", after),
            &self.source,
            span
        ))
    }

    fn next(&self) -> Option<Token> {
        self.stream.peek(0).ok().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    const SWITCH: &str = r#"
        defmacten_proc switch {
          case_name { ident }
          body { ident }
          branch { case "case_name": { body } }
          branches { branches branch } | { branch }
          target { ident }
          switch_str { switch target { branches } }
        }
    "#;

    #[test]
    fn reads_the_switch_profile() {
        let profile = parse_profile(SWITCH).unwrap();
        assert_eq!(profile.name(), "switch");
        assert_eq!(profile.rules().len(), 6);
        assert_eq!(profile.top_level(), Some("switch_str"));
        let branches = profile.rule("branches").unwrap();
        assert_eq!(
            branches.alternatives,
            vec![vec!["branches", "branch"], vec!["branch"]]
        );
        let branch = profile.rule("branch").unwrap();
        assert_eq!(
            branch.alternatives[0],
            vec!["case", "\"", "case_name", "\"", ":", "{", "body", "}"]
        );
    }

    #[test]
    fn keyword_is_optional() {
        let profile = parse_profile("digit { d { number } }").unwrap();
        assert_eq!(profile.name(), "digit");
        assert_eq!(profile.rules().len(), 1);
    }

    #[test]
    fn reads_several_profiles() {
        let profiles = parse_profiles("a { x { ident } } defmacten_proc b { y { number } }").unwrap();
        let names: Vec<&str> = profiles.iter().map(Profile::name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn unclosed_alternative_points_at_its_brace() {
        let source = "p { r { a { b }";
        let err = parse_profile(source).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
        assert!(err.to_string().contains("Unclosed '{' in rule 'r'"));
        let MactenError::Parse { ctx, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(ctx.span, Some(Span { start: 6, end: 7 }));
    }

    #[test]
    fn missing_profile_brace() {
        let err = parse_profile("p r { a }").unwrap_err();
        assert!(err.to_string().contains("Expected '{' after 'p'"));
    }

    #[test]
    fn rule_names_must_be_identifiers() {
        let err = parse_profile("p { ( { a } }").unwrap_err();
        assert!(err.to_string().contains("Expected a rule name"));
    }

    #[test]
    fn profile_without_rules() {
        let err = parse_profile("p { }").unwrap_err();
        assert!(err.to_string().contains("defines no rules"));
    }

    #[test]
    fn trailing_text_after_a_single_profile() {
        let err = parse_profile("p { r { a } } q").unwrap_err();
        assert!(err.to_string().contains("Unexpected 'q'"));
    }
}
