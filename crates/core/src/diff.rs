//! Structural comparison of two wireframe versions
//!
//! Nodes are matched by `componentName`. The counts are exact; the
//! human-readable description is advisory and makes no wording guarantees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::WireframeNode;

/// Coarse summary of the changes between two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Nodes present in the new version only.
    pub nodes_added: usize,
    /// Nodes present in the old version only.
    pub nodes_removed: usize,
    /// Matched nodes whose type or props differ.
    pub nodes_modified: usize,
    /// Prop keys that changed on modified nodes, sorted and deduplicated.
    pub changed_props: Vec<String>,
    /// Advisory one-line description.
    pub description: String,
}

impl ChangeSummary {
    /// Total number of changed nodes.
    pub fn total_changed(&self) -> usize {
        self.nodes_added + self.nodes_removed + self.nodes_modified
    }

    pub fn is_empty(&self) -> bool {
        self.total_changed() == 0
    }
}

/// Compare two documents node-by-node.
///
/// Duplicate `componentName`s are matched on first occurrence in pre-order.
pub fn diff(old: &WireframeNode, new: &WireframeNode) -> ChangeSummary {
    let old_nodes = index_by_name(old);
    let new_nodes = index_by_name(new);

    let mut nodes_added = 0;
    let mut nodes_removed = 0;
    let mut nodes_modified = 0;
    let mut changed_props: Vec<String> = Vec::new();

    for (name, new_node) in &new_nodes {
        match old_nodes.get(name) {
            None => nodes_added += 1,
            Some(old_node) => {
                let mut keys = changed_prop_keys(old_node, new_node);
                let type_changed = !old_node.node_type.eq_ignore_ascii_case(&new_node.node_type);
                if type_changed || !keys.is_empty() {
                    nodes_modified += 1;
                    changed_props.append(&mut keys);
                }
            }
        }
    }
    for name in old_nodes.keys() {
        if !new_nodes.contains_key(name) {
            nodes_removed += 1;
        }
    }

    changed_props.sort();
    changed_props.dedup();

    let description = describe(nodes_added, nodes_removed, nodes_modified, &changed_props);
    ChangeSummary {
        nodes_added,
        nodes_removed,
        nodes_modified,
        changed_props,
        description,
    }
}

fn index_by_name(root: &WireframeNode) -> BTreeMap<&str, &WireframeNode> {
    let mut index = BTreeMap::new();
    for node in root.flatten() {
        index.entry(node.component_name.as_str()).or_insert(node);
    }
    index
}

fn changed_prop_keys(old: &WireframeNode, new: &WireframeNode) -> Vec<String> {
    let mut keys = Vec::new();
    for (key, value) in &new.props {
        if old.props.get(key) != Some(value) {
            keys.push(key.clone());
        }
    }
    for key in old.props.keys() {
        if !new.props.contains_key(key) {
            keys.push(key.clone());
        }
    }
    keys
}

fn describe(added: usize, removed: usize, modified: usize, props: &[String]) -> String {
    if added + removed + modified == 0 {
        return "no structural changes".to_string();
    }
    let mut parts = Vec::new();
    if added > 0 {
        parts.push(format!("{} added", added));
    }
    if removed > 0 {
        parts.push(format!("{} removed", removed));
    }
    if modified > 0 {
        if props.is_empty() {
            parts.push(format!("{} modified", modified));
        } else {
            parts.push(format!("{} modified ({})", modified, props.join(", ")));
        }
    }
    format!("nodes: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WireframeNode;

    fn base() -> WireframeNode {
        WireframeNode::new("frame", "Root")
            .with_child(WireframeNode::new("button", "Submit").with_prop("color", "grey"))
            .with_child(WireframeNode::new("text", "Title"))
    }

    #[test]
    fn test_identical_documents_have_empty_summary() {
        let summary = diff(&base(), &base());
        assert!(summary.is_empty());
        assert_eq!(summary.description, "no structural changes");
    }

    #[test]
    fn test_prop_change_counts_one_modified_node() {
        let new = WireframeNode::new("frame", "Root")
            .with_child(WireframeNode::new("button", "Submit").with_prop("color", "blue"))
            .with_child(WireframeNode::new("text", "Title"));

        let summary = diff(&base(), &new);
        assert_eq!(summary.nodes_modified, 1);
        assert_eq!(summary.nodes_added, 0);
        assert_eq!(summary.nodes_removed, 0);
        assert_eq!(summary.changed_props, vec!["color".to_string()]);
    }

    #[test]
    fn test_added_and_removed_nodes() {
        let new = WireframeNode::new("frame", "Root")
            .with_child(WireframeNode::new("button", "Submit").with_prop("color", "grey"))
            .with_child(WireframeNode::new("input", "Email"));

        let summary = diff(&base(), &new);
        assert_eq!(summary.nodes_added, 1);
        assert_eq!(summary.nodes_removed, 1);
        assert_eq!(summary.nodes_modified, 0);
        assert_eq!(summary.total_changed(), 2);
    }

    #[test]
    fn test_type_change_counts_as_modified() {
        let new = WireframeNode::new("frame", "Root")
            .with_child(WireframeNode::new("input", "Submit").with_prop("color", "grey"))
            .with_child(WireframeNode::new("text", "Title"));

        let summary = diff(&base(), &new);
        assert_eq!(summary.nodes_modified, 1);
        assert!(summary.changed_props.is_empty());
    }

    #[test]
    fn test_removed_prop_is_reported() {
        let new = WireframeNode::new("frame", "Root")
            .with_child(WireframeNode::new("button", "Submit"))
            .with_child(WireframeNode::new("text", "Title"));

        let summary = diff(&base(), &new);
        assert_eq!(summary.nodes_modified, 1);
        assert_eq!(summary.changed_props, vec!["color".to_string()]);
    }
}
