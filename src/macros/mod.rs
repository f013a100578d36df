//! # Procedural macro profiles
//!
//! A profile is a named set of rule definitions written in the definition language:
//!
//! ```text
//! defmacten_proc switch {
//!   case_name { ident }
//!   body { ident }
//!   branch { case " case_name " : { body } }
//!   branches { branches branch } | { branch }
//!   target { ident }
//!   switch_str { switch target { branches } }
//! }
//! ```
//!
//! Each rule is a list of alternatives in braces separated by `|`. Inside an alternative:
//!
//! - a name defined by the same profile calls that rule, stored under the rule's own name;
//! - `ident` and `number` call the built-ins;
//! - anything else, nested braces included, is a literal token.
//!
//! Installing a profile registers every rule as `PROFILE_RULE`. The last rule defined is
//! the top-level construct: it is tagged with the profile name and registered under the
//! profile name as well, which is also the name handlers are looked up by.
//!
//! Definitions are read by [`loader`]; this module turns them into [`Production`]s.
//! Template macros called as `name![...]` live in [`declarative`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::err_msg;
use crate::rules::{Builtin, Production, RuleRegistry, Symbol};
use crate::MactenError;

pub mod declarative;
pub mod loader;

pub use declarative::{parse_declarative, DeclarativeMacro, DeclarativeRegistry};
pub use loader::{parse_profile, parse_profiles};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// One rule of a profile, as written: alternatives of raw symbol names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub alternatives: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    /// In definition order. A redefined rule keeps its original slot.
    rules: Vec<RuleDefinition>,
    /// The most recently defined rule.
    top: Option<String>,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
            top: None,
        }
    }

    /// Defines a rule, replacing an earlier definition of the same name.
    ///
    /// Returns the replaced definition, if there was one.
    pub fn define(&mut self, rule: &str, alternatives: Vec<Vec<String>>) -> Option<RuleDefinition> {
        self.top = Some(rule.to_string());
        let definition = RuleDefinition {
            name: rule.to_string(),
            alternatives,
        };
        match self.rules.iter_mut().find(|r| r.name == rule) {
            Some(slot) => Some(std::mem::replace(slot, definition)),
            None => {
                self.rules.push(definition);
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The rule that parses a whole construct.
    pub fn top_level(&self) -> Option<&str> {
        self.top.as_deref()
    }

    /// Registry name of one of this profile's rules.
    pub fn qualified(&self, rule: &str) -> String {
        format!("{}_{}", self.name, rule)
    }

    /// Builds the productions of every rule, keyed by registry name.
    pub fn productions(&self) -> Vec<(String, Production)> {
        let local: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        self.rules
            .iter()
            .map(|definition| {
                let qualified = self.qualified(&definition.name);
                let mut production = Production::new(&qualified);
                if self.top.as_deref() == Some(definition.name.as_str()) {
                    production = production.with_tag(&self.name);
                }
                for alternative in &definition.alternatives {
                    let symbols = alternative
                        .iter()
                        .map(|symbol| self.resolve(symbol, &local))
                        .collect();
                    production.push_alternative(symbols);
                }
                (qualified, production)
            })
            .collect()
    }

    /// Registers every rule, replacing existing bindings of the same names.
    ///
    /// Returns the registered names, the top-level alias last.
    pub fn install(&self, rules: &mut RuleRegistry) -> Result<Vec<String>, MactenError> {
        let Some(top) = self.top_level() else {
            return Err(err_msg!(Validation, "Profile '{}' defines no rules", self.name));
        };
        let top = self.qualified(top);
        let mut installed = Vec::new();
        for (name, production) in self.productions() {
            let def = production.into_def();
            if name == top {
                rules.register_def(&self.name, def.clone());
            }
            rules.register_def(&name, def);
            installed.push(name);
        }
        installed.push(self.name.clone());
        Ok(installed)
    }

    fn resolve(&self, symbol: &str, local: &HashSet<&str>) -> Symbol {
        if local.contains(symbol) {
            Symbol::field(symbol, &self.qualified(symbol))
        } else if Builtin::from_name(symbol).is_some() {
            Symbol::call(symbol)
        } else {
            Symbol::literal(symbol)
        }
    }
}
