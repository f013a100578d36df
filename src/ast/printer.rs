//! Tree printer for parse results. A debugging aid; nothing in the parser reads its output.

use serde::{Deserialize, Serialize};

use crate::ast::{Node, NodeValue};

/// Connector set used when rendering a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeStyle {
    #[default]
    Unicode,
    Ascii,
}

impl TreeStyle {
    fn branch(self) -> &'static str {
        match self {
            TreeStyle::Unicode => "├─",
            TreeStyle::Ascii => "|-",
        }
    }

    fn last(self) -> &'static str {
        match self {
            TreeStyle::Unicode => "└─",
            TreeStyle::Ascii => "`-",
        }
    }

    fn pipe(self) -> &'static str {
        match self {
            TreeStyle::Unicode => "│ ",
            TreeStyle::Ascii => "| ",
        }
    }
}

/// Renders `node` one line per node.
///
/// The root line is its tag. Below it each child is `field: tag`, with leaves adding their
/// token in quotes, e.g. `target: switch_target "name"`.
pub fn render_tree(node: &Node, style: TreeStyle) -> String {
    let mut out = String::new();
    out.push_str(&label(node));
    out.push('\n');
    render_children(node, "", style, &mut out);
    out
}

pub fn print_tree(node: &Node, style: TreeStyle) {
    print!("{}", render_tree(node, style));
}

fn label(node: &Node) -> String {
    match node.value() {
        NodeValue::Token(token) => format!("{} \"{}\"", node.tag(), token),
        NodeValue::Fields(_) => node.tag().to_string(),
    }
}

fn render_children(node: &Node, prefix: &str, style: TreeStyle, out: &mut String) {
    let Some(fields) = node.fields() else {
        return;
    };
    let count = fields.len();
    for (i, (name, child)) in fields.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { style.last() } else { style.branch() };
        out.push_str(&format!("{prefix}{connector}{name}: {}\n", label(child)));
        let extension = if is_last { "  " } else { style.pipe() };
        render_children(child, &format!("{prefix}{extension}"), style, out);
    }
}
