use serde::{Deserialize, Serialize};

/// Roles that only group other nodes and carry no meaning of their own.
pub const STRUCTURAL_ROLES: &[&str] = &["", "generic", "none", "presentation"];

/// One node of a page's accessibility tree, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityNode {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub children: Vec<AccessibilityNode>,
}

impl AccessibilityNode {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn with_child(mut self, child: AccessibilityNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_meaningful_role(&self) -> bool {
        let role = self.role.trim();
        !STRUCTURAL_ROLES.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the node itself carries a name, description or state.
    pub fn has_content(&self) -> bool {
        non_blank(&self.name)
            || non_blank(&self.description)
            || non_blank(&self.value)
            || self.checked.is_some()
            || self.selected.is_some()
    }

    /// An empty structural wrapper whose whole subtree is empty too.
    pub fn is_prunable(&self) -> bool {
        !self.has_meaningful_role()
            && !self.has_content()
            && self.children.iter().all(AccessibilityNode::is_prunable)
    }

    /// Number of nodes in the subtree, this one included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(AccessibilityNode::len).sum::<usize>()
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
