use super::node::AccessibilityNode;
use super::serializer;
use crate::core::Page;
use crate::errors::{Result, SnapshotError};
use serde::Deserialize;
use tracing::debug;

/// What the in-page tree walker returns. `truncated` is set when a subtree
/// was cut off at the walker's depth limit.
#[derive(Debug, Default, Deserialize)]
pub struct TreePayload {
    #[serde(default)]
    pub tree: Option<AccessibilityNode>,
    #[serde(default)]
    pub truncated: bool,
}

impl TreePayload {
    /// A cut-off tree counts as a failed extraction.
    pub fn into_tree(self) -> Result<Option<AccessibilityNode>> {
        if self.truncated {
            return Err(SnapshotError::ExtractionFailed(
                "accessibility tree exceeds the walker's depth limit".to_string(),
            ));
        }
        Ok(self.tree)
    }
}

/// Read the accessibility tree of a loaded page.
///
/// Fails with `ExtractionFailed` rather than returning a partial tree, so an
/// incomplete snapshot can never reach the cache.
pub fn extract<P: Page + ?Sized>(page: &P) -> Result<AccessibilityNode> {
    let root = page
        .accessibility_tree()?
        .ok_or_else(|| SnapshotError::ExtractionFailed("page has no document body".to_string()))?;

    // A bare root over nothing is a blank or unrendered page.
    let empty = !root.has_content() && root.children.iter().all(AccessibilityNode::is_prunable);
    if empty {
        return Err(SnapshotError::ExtractionFailed(
            "accessibility tree is empty".to_string(),
        ));
    }

    debug!(nodes = root.len(), role = %root.role, "extracted accessibility tree");
    Ok(root)
}

/// Extract and serialize in one step.
pub fn snapshot_text<P: Page + ?Sized>(page: &P) -> Result<String> {
    let root = extract(page)?;
    Ok(serializer::serialize(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakeSite};
    use crate::core::BrowserEngine;
    use std::time::Duration;

    fn loaded_page(site: FakeSite) -> <FakeEngine as BrowserEngine>::Page {
        let engine = FakeEngine::new().with_site("https://example.com/", site);
        let page = engine.new_page().unwrap();
        page.navigate("https://example.com/", Duration::from_secs(1)).unwrap();
        page
    }

    #[test]
    fn extracts_and_serializes_loaded_page() {
        let tree = AccessibilityNode::new("main")
            .with_child(AccessibilityNode::new("heading").with_name("Example Domain"));
        let page = loaded_page(FakeSite::new(tree));

        let text = snapshot_text(&page).unwrap();
        assert_eq!(text, "[main]\n  [heading]\n    Name: Example Domain");
    }

    #[test]
    fn same_page_state_gives_identical_text() {
        let tree = AccessibilityNode::new("navigation")
            .with_child(AccessibilityNode::new("link").with_name("Home"))
            .with_child(AccessibilityNode::new("link").with_name("About"));
        let page = loaded_page(FakeSite::new(tree));

        assert_eq!(snapshot_text(&page).unwrap(), snapshot_text(&page).unwrap());
    }

    #[test]
    fn missing_tree_is_an_extraction_failure() {
        let page = loaded_page(FakeSite::without_tree());
        let err = extract(&page).unwrap_err();
        assert!(matches!(err, SnapshotError::ExtractionFailed(_)));
    }

    #[test]
    fn blank_document_is_an_extraction_failure() {
        let page = loaded_page(FakeSite::new(AccessibilityNode::new("document")));
        let err = snapshot_text(&page).unwrap_err();
        assert!(matches!(err, SnapshotError::ExtractionFailed(_)));

        let page = loaded_page(FakeSite::new(
            AccessibilityNode::new("document").with_child(AccessibilityNode::new("generic")),
        ));
        assert!(extract(&page).is_err());
    }

    #[test]
    fn named_root_alone_is_kept() {
        let page = loaded_page(FakeSite::new(AccessibilityNode::new("document").with_name("Welcome")));
        assert_eq!(snapshot_text(&page).unwrap(), "[document]\n  Name: Welcome");
    }

    #[test]
    fn walker_payload_is_decoded() {
        let payload: TreePayload = serde_json::from_str(
            r#"{"tree": {"role": "main", "children": [{"role": "button", "name": "Go"}]}, "truncated": false}"#,
        )
        .unwrap();
        let root = payload.into_tree().unwrap().unwrap();
        assert_eq!(root.children[0].name.as_deref(), Some("Go"));

        let payload: TreePayload = serde_json::from_str(r#"{"tree": null}"#).unwrap();
        assert!(payload.into_tree().unwrap().is_none());
    }

    #[test]
    fn truncated_walker_payload_is_rejected() {
        let payload: TreePayload =
            serde_json::from_str(r#"{"tree": {"role": "main"}, "truncated": true}"#).unwrap();
        let err = payload.into_tree().unwrap_err();
        assert!(matches!(err, SnapshotError::ExtractionFailed(_)));
    }

    #[test]
    fn empty_tree_is_an_extraction_failure() {
        let page = loaded_page(FakeSite::new(
            AccessibilityNode::new("generic").with_child(AccessibilityNode::new("none")),
        ));
        let err = snapshot_text(&page).unwrap_err();
        assert!(matches!(err, SnapshotError::ExtractionFailed(_)));
    }
}
