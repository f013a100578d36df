//! Rule registry for storage and lookup of rule implementations.
//!
//! # Lifecycle
//!
//! One registry per expansion session. The grammar author fills it before parsing; parsing
//! only ever borrows it immutably, so it cannot change while a parse is running.
//!
//! # Built-ins
//!
//! A new registry already holds `ident` and `number` (see [`Builtin`]). They can be
//! replaced like any other binding.
//!
//! # Summary Table
//! | Method               | Overwrites | Error on Duplicate | Notes                          |
//! |----------------------|------------|--------------------|--------------------------------|
//! | register             | Yes        | No                 | Plain rule                     |
//! | register_recursive   | Yes        | No                 | Parsed through the grow loop   |
//! | register_def         | Yes        | No                 | Any prepared `RuleDef`         |
//! | register_or_error    | No         | Yes                | Any prepared `RuleDef`         |
//! | unregister           | N/A        | N/A                | Removes by name                |
//! | lookup               | N/A        | N/A                | `UnknownRule` when missing     |
//! | get/contains         | N/A        | N/A                | Case-sensitive lookup          |

use std::collections::HashMap;
use std::sync::Arc;

use crate::err_msg;
use crate::rules::{Builtin, ParseResult, RecursiveRule, Rule, RuleDef};
use crate::syntax::Stream;
use crate::MactenError;

#[derive(Debug, Clone)]
pub struct RuleRegistry {
    /// Map from rule name to implementation.
    pub rules: HashMap<String, RuleDef>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    /// Creates a registry holding only the built-in rules.
    pub fn new() -> Self {
        let rules = Builtin::ALL
            .into_iter()
            .map(|b| (b.name().to_string(), RuleDef::Builtin(b)))
            .collect();
        Self { rules }
    }

    /// Registers a plain rule, replacing any previous binding.
    ///
    /// Returns the replaced binding, if there was one.
    pub fn register<R: Rule + 'static>(&mut self, name: &str, rule: R) -> Option<RuleDef> {
        self.register_def(name, RuleDef::Plain(Arc::new(rule)))
    }

    /// Registers a self-referential rule, replacing any previous binding.
    pub fn register_recursive<R: RecursiveRule + 'static>(
        &mut self,
        name: &str,
        rule: R,
    ) -> Option<RuleDef> {
        self.register_def(name, RuleDef::Recursive(Arc::new(rule)))
    }

    pub fn register_def(&mut self, name: &str, def: RuleDef) -> Option<RuleDef> {
        self.rules.insert(name.to_string(), def)
    }

    /// Registers a rule, returning an error if the name is taken.
    pub fn register_or_error(&mut self, name: &str, def: RuleDef) -> Result<(), MactenError> {
        if self.rules.contains_key(name) {
            return Err(err_msg!(Validation, "Rule '{}' is already registered", name));
        }
        self.rules.insert(name.to_string(), def);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<RuleDef> {
        self.rules.remove(name)
    }

    /// Looks up a rule by name. A missing rule is a configuration defect.
    pub fn lookup(&self, name: &str) -> Result<&RuleDef, MactenError> {
        self.rules
            .get(name)
            .ok_or_else(|| MactenError::unknown_rule(name))
    }

    pub fn get(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.rules.keys()
    }

    /// Runs the rule registered as `name` against `input`.
    pub fn parse(&self, name: &str, input: &Stream) -> ParseResult {
        self.lookup(name)?.parse(input, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;
    use crate::rules::{attempt, literal as expect};

    fn literal(text: &'static str) -> impl Rule {
        move |input: &Stream, _: &RuleRegistry| attempt(input, |s| Ok(expect(s, text)))
    }

    #[test]
    fn new_registry_holds_builtins() {
        let rules = RuleRegistry::new();
        assert_eq!(rules.len(), 2);
        assert!(rules.contains("ident"));
        assert!(rules.contains("number"));
        assert!(matches!(rules.lookup("ident"), Ok(RuleDef::Builtin(Builtin::Ident))));
    }

    #[test]
    fn lookup_of_missing_rule_is_unknown_rule() {
        let rules = RuleRegistry::new();
        let err = rules.lookup("switch").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownRule);
        assert!(rules.parse("switch", &Stream::from_text("x")).is_err());
    }

    #[test]
    fn re_registration_replaces_silently() {
        let mut rules = RuleRegistry::new();
        assert!(rules.register("kw", literal("if")).is_none());
        assert!(rules.register("kw", literal("else")).is_some());
        let input = Stream::from_text("else");
        assert!(rules.parse("kw", &input).unwrap().is_some());
        assert!(rules.parse("kw", &Stream::from_text("if")).unwrap().is_none());
    }

    #[test]
    fn register_or_error_refuses_duplicates() {
        let mut rules = RuleRegistry::new();
        let err = rules
            .register_or_error("ident", RuleDef::Builtin(Builtin::Number))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(rules
            .register_or_error("digit", RuleDef::Builtin(Builtin::Number))
            .is_ok());
    }

    #[test]
    fn unregister_removes_binding() {
        let mut rules = RuleRegistry::new();
        rules.register("kw", literal("if"));
        assert!(rules.unregister("kw").is_some());
        assert!(!rules.contains("kw"));
        assert!(rules.unregister("kw").is_none());
    }
}
