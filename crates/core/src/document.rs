//! Wireframe document tree
//!
//! The wireframe is an opaque structured document with a thin addressable
//! schema: each node carries a `type`, a `componentName`, a `props` map and
//! an ordered `children` sequence. The engine never interprets the tree
//! beyond these fields; everything else round-trips untouched through
//! `props`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum tree depth accepted from the model.
pub const MAX_DEPTH: usize = 64;

/// Maximum total node count accepted from the model.
pub const MAX_NODES: usize = 10_000;

/// Node types the engine accepts, matched case-insensitively.
pub const NODE_TYPES: &[&str] = &[
    "frame",
    "text",
    "button",
    "input",
    "rectangle",
    "image",
    "list",
    "navigation",
    "card",
    "avatar",
    "vector",
];

/// Structural violations found while validating a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("root node has no type")]
    MissingRootType,

    #[error("unsupported node type: {0:?}")]
    UnsupportedType(String),

    #[error("document deeper than 64 levels")]
    TooDeep,

    #[error("document has more than 10000 nodes")]
    TooManyNodes,
}

/// A single node in the wireframe tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireframeNode {
    /// Stable identifier used for reference resolution and diffing.
    #[serde(rename = "componentName", default)]
    pub component_name: String,

    /// Node type, matched case-insensitively against [`NODE_TYPES`].
    #[serde(rename = "type", default)]
    pub node_type: String,

    /// Opaque properties (colours, sizes, copy text, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,

    /// Ordered child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WireframeNode>,
}

impl WireframeNode {
    /// Create a node with a type and component name.
    pub fn new(node_type: impl Into<String>, component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            node_type: node_type.into(),
            props: Map::new(),
            children: Vec::new(),
        }
    }

    /// Set a property (builder style).
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Append a child (builder style).
    pub fn with_child(mut self, child: WireframeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Case-insensitive type check.
    pub fn is_type(&self, node_type: &str) -> bool {
        self.node_type.eq_ignore_ascii_case(node_type)
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(WireframeNode::node_count).sum::<usize>()
    }

    /// Depth of this subtree (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(WireframeNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// All nodes in pre-order (self first).
    pub fn flatten(&self) -> Vec<&WireframeNode> {
        let mut nodes = Vec::with_capacity(self.children.len() + 1);
        self.collect(&mut nodes);
        nodes
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a WireframeNode>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }

    /// Find a node by exact `componentName` (pre-order, first match).
    pub fn find_by_name(&self, name: &str) -> Option<&WireframeNode> {
        self.flatten().into_iter().find(|n| n.component_name == name)
    }

    /// The last node of the given type in pre-order.
    ///
    /// Generated documents grow by appending, so the last match is the most
    /// recently introduced node of that type.
    pub fn last_of_type(&self, node_type: &str) -> Option<&WireframeNode> {
        self.flatten()
            .into_iter()
            .filter(|n| n.is_type(node_type))
            .last()
    }

    /// The last node of the given type strictly below an ancestor whose
    /// `componentName` contains `region` (case-insensitive).
    pub fn last_of_type_within(&self, node_type: &str, region: &str) -> Option<&WireframeNode> {
        let region = region.to_lowercase();
        let mut found = None;
        self.search_region(node_type, &region, false, &mut found);
        found
    }

    fn search_region<'a>(
        &'a self,
        node_type: &str,
        region: &str,
        in_region: bool,
        found: &mut Option<&'a WireframeNode>,
    ) {
        if in_region && self.is_type(node_type) {
            *found = Some(self);
        }
        let child_in_region =
            in_region || self.component_name.to_lowercase().contains(region);
        for child in &self.children {
            child.search_region(node_type, region, child_in_region, found);
        }
    }

    /// Validate the structural limits and the node-type allowlist.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.node_type.is_empty() {
            return Err(DocumentError::MissingRootType);
        }

        let mut count = 0usize;
        let mut stack: Vec<(&WireframeNode, usize)> = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            if depth > MAX_DEPTH {
                return Err(DocumentError::TooDeep);
            }
            count += 1;
            if count > MAX_NODES {
                return Err(DocumentError::TooManyNodes);
            }
            if !NODE_TYPES.iter().any(|t| node.is_type(t)) {
                return Err(DocumentError::UnsupportedType(node.node_type.clone()));
            }
            for child in &node.children {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    /// Parse a raw document value, applying the sanitization pass first.
    pub fn from_document(mut value: Value) -> Result<Self, serde_json::Error> {
        sanitize(&mut value);
        serde_json::from_value(value)
    }
}

/// Sanitize a raw document in place.
///
/// Two repairs for common model output quirks: a single-object `children`
/// is coerced into a one-element sequence, and a Text node whose `children`
/// is a bare string has it migrated into `props.text`.
pub fn sanitize(value: &mut Value) {
    let Value::Object(obj) = value else { return };

    let is_text = obj
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.eq_ignore_ascii_case("text"))
        .unwrap_or(false);

    match obj.get("children") {
        Some(Value::Object(_)) => {
            if let Some(child) = obj.remove("children") {
                obj.insert("children".to_string(), Value::Array(vec![child]));
            }
        }
        Some(Value::String(_)) if is_text => {
            if let Some(Value::String(text)) = obj.remove("children") {
                let props = obj
                    .entry("props")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(props) = props {
                    props.entry("text").or_insert(Value::String(text));
                }
            }
        }
        _ => {}
    }

    if let Some(Value::Array(children)) = obj.get_mut("children") {
        for child in children.iter_mut() {
            sanitize(child);
        }
    }
}
