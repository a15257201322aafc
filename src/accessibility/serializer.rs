//! Line-oriented text form of an accessibility tree.
//!
//! Each kept node becomes a `[role]` line followed by its properties, one per
//! line and indented one level deeper:
//!
//! ```text
//! [form]
//!   Name: Sign in
//!   [textbox]
//!     Name: Email
//!   [button]
//!     Name: Log in
//! ```
//!
//! Output is a pure function of the tree, so the same page state always yields
//! byte-identical text.

use super::node::AccessibilityNode;

const INDENT: &str = "  ";

pub fn serialize(root: &AccessibilityNode) -> String {
    let mut lines = Vec::new();
    write_node(root, 0, &mut lines);
    lines.join("\n")
}

fn write_node(node: &AccessibilityNode, depth: usize, lines: &mut Vec<String>) {
    if node.is_prunable() {
        return;
    }

    let prefix = INDENT.repeat(depth);
    let role = match node.role.trim() {
        "" => "generic",
        role => role,
    };
    lines.push(format!("{prefix}[{}]", single_line(role)));

    let mut property = |label: &str, value: &str| {
        let value = single_line(value);
        if !value.is_empty() {
            lines.push(format!("{prefix}{INDENT}{label}: {value}"));
        }
    };

    if let Some(name) = &node.name {
        property("Name", name);
    }
    if let Some(description) = &node.description {
        property("Description", description);
    }
    if let Some(value) = &node.value {
        property("Value", value);
    }
    if let Some(checked) = node.checked {
        property("Checked", if checked { "true" } else { "false" });
    }
    if let Some(selected) = node.selected {
        property("Selected", if selected { "true" } else { "false" });
    }

    for child in &node.children {
        write_node(child, depth + 1, lines);
    }
}

/// Collapse whitespace so a property can never spill onto a second line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
