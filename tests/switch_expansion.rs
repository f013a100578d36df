//! End-to-end tests: the switch profile, from definition text to generated code.

use macten::ast::{get, into_list, Lookup};
use macten::emit::CodeEmitter;
use macten::output::OutputBuffer;
use macten::rules::{Production, Symbol};
use macten::{
    Dispatch, ErrorType, Expander, ExpanderConfig, HandlerRegistry, MactenError, Node,
    RuleRegistry, Stream,
};
use predicates::prelude::*;
use predicates::str::contains;

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

const INPUT: &str = r#"switch name { case "C1": { B1 } case "C2": { B2 } }"#;

fn expander() -> Expander<OutputBuffer> {
    let mut expander = Expander::with_sink(
        RuleRegistry::new(),
        HandlerRegistry::new(),
        ExpanderConfig::default(),
        OutputBuffer::new(),
    );
    expander.load_profiles(SWITCH).expect("switch profile loads");
    expander
}

fn text_of(node: Option<&Node>, field: &str) -> Option<String> {
    get(node, field, true).map(Lookup::text)
}

/// Generates an if/elif chain over the case labels.
fn switch_handler(root: &Node) -> Result<String, MactenError> {
    let target = text_of(Some(root), "target")
        .ok_or_else(|| macten::err_msg!(Handler, "switch without a target"))?;
    let branches = get(Some(root), "branches", false)
        .and_then(Lookup::node)
        .and_then(into_list)
        .ok_or_else(|| macten::err_msg!(Handler, "switch without branches"))?;

    let mut out = CodeEmitter::new();
    for (i, entry) in branches.iter().enumerate() {
        let label = text_of(Some(entry), "case_name").unwrap_or_default();
        let body = text_of(Some(entry), "body").unwrap_or_default();
        let keyword = if i == 0 { "if" } else { "elif" };
        out.writeln(&format!("{keyword} {target} == \"{label}\":"));
        let mut block = out.indent();
        block.writeln(&format!("{body}()"));
    }
    Ok(out.finish())
}

#[test]
fn switch_profile_installs_every_rule() {
    let expander = expander();
    for name in [
        "switch",
        "switch_case_name",
        "switch_body",
        "switch_branch",
        "switch_branches",
        "switch_target",
        "switch_switch_str",
    ] {
        assert!(expander.rules().contains(name), "missing rule {name}");
    }
    assert!(expander.rules().lookup("switch_branches").unwrap().is_recursive());
    assert!(!expander.rules().lookup("switch_branch").unwrap().is_recursive());
}

#[test]
fn switch_parses_to_a_tagged_root() {
    let expander = expander();
    let root = expander.parse_text("switch", INPUT).unwrap().expect("switch matches");
    assert_eq!(root.tag().name(), "switch");
    assert_eq!(text_of(Some(&root), "target").as_deref(), Some("name"));

    let branches = get(Some(&root), "branches", false)
        .and_then(Lookup::node)
        .unwrap();
    let entries = into_list(branches).unwrap();
    let pairs: Vec<(String, String)> = entries
        .iter()
        .map(|entry| {
            (
                text_of(Some(entry), "case_name").unwrap(),
                text_of(Some(entry), "body").unwrap(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("C1".to_string(), "B1".to_string()),
            ("C2".to_string(), "B2".to_string())
        ]
    );
}

#[test]
fn list_entries_are_the_branch_nodes() {
    let expander = expander();
    let root = expander.parse_text("switch", INPUT).unwrap().unwrap();
    let entries = into_list(root.field("branches").unwrap()).unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.tag().name(), "switch_branch");
        assert!(entry.field("branches").is_none());
    }

    let labels: Vec<String> = entries
        .iter()
        .filter_map(|entry| get(Some(entry), "case_name", true))
        .map(Lookup::text)
        .collect();
    assert_eq!(labels, vec!["C1", "C2"]);
    let bodies: Vec<String> = entries
        .iter()
        .filter_map(|entry| get(Some(entry), "body", true).and_then(Lookup::token))
        .map(|token| token.text().to_string())
        .collect();
    assert_eq!(bodies, vec!["B1", "B2"]);
}

#[test]
fn single_branch_is_a_one_entry_list() {
    let expander = expander();
    let root = expander
        .parse_text("switch", r#"switch x { case "only": { go } }"#)
        .unwrap()
        .unwrap();
    let branches = root.field("branches").unwrap();
    assert_eq!(into_list(branches).unwrap().len(), 1);
}

#[test]
fn missing_closing_brace_is_no_match() {
    let expander = expander();
    let broken = r#"switch name { case "C1": { B1 } case "C2": { B2 }"#;
    assert!(expander.parse_text("switch", broken).unwrap().is_none());

    let input = Stream::from_text(broken);
    assert!(expander.parse("switch", &input).unwrap().is_none());
    assert_eq!(input.position(), 0);
}

#[test]
fn handler_generates_code_for_each_construct() {
    let mut expander = expander();
    expander.handlers_mut().register("switch", switch_handler);
    let text = format!("{INPUT}\n{}", r#"switch other { case "x": { X } }"#);
    let outputs = expander.expand("switch", &text).unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(
        outputs[0],
        Dispatch::Generated(
            "if name == \"C1\":\n    B1()\nelif name == \"C2\":\n    B2()\n".to_string()
        )
    );
    assert_eq!(outputs[1].text(), "if other == \"x\":\n    X()\n");
    assert!(expander.sink().as_str().is_empty());
}

#[test]
fn construct_without_handler_prints_the_tree_and_warns() {
    let mut expander = expander();
    let outputs = expander.expand("switch", INPUT).unwrap();
    assert!(outputs[0].is_fallback());

    let tree = outputs[0].text();
    let tree_shape = contains("switch\n")
        .and(contains("target: switch_target \"name\""))
        .and(contains("case_name: switch_case_name \"C2\""));
    assert!(tree_shape.eval(tree));

    let warning = contains("warning: no handler registered for 'switch'");
    assert!(warning.eval(expander.sink().as_str()));
}

#[test]
fn trailing_garbage_is_a_parse_error() {
    let mut expander = expander();
    expander.handlers_mut().register("switch", switch_handler);
    let err = expander
        .expand("switch", &format!("{INPUT} switch"))
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Parse);
    assert!(contains("Could not parse 'switch' at 'switch'").eval(&err.to_string()));
}

#[test]
fn re_registering_a_rule_replaces_it() {
    let mut expander = expander();
    let replaced = expander.rules_mut().register(
        "switch_target",
        Production::new("switch_target").alternative(vec![Symbol::call("number")]),
    );
    assert!(replaced.is_some());

    assert!(expander
        .parse_text("switch", r#"switch 7 { case "a": { b } }"#)
        .unwrap()
        .is_some());
    assert!(expander.parse_text("switch", INPUT).unwrap().is_none());
}
