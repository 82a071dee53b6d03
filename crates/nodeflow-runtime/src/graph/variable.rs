//! Introspection view of graph entries.

use nodeflow_core::{Node, NodeRole, Tags, ValueType};
use serde::Serialize;

use super::input::ExternalInput;

/// A node or external input as seen from outside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Name of the node or input.
    pub name: String,
    /// Declared output or input type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Node tags; empty for external inputs.
    pub tags: Tags,
    /// Documentation string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Whether this is a caller-supplied input rather than a node.
    pub is_external_input: bool,
    /// Role of the node; external inputs report [`NodeRole::Function`].
    pub role: NodeRole,
    /// Function descriptor the node came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl From<&Node> for Variable {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name().to_owned(),
            value_type: node.output_type(),
            tags: node.tags().clone(),
            documentation: node.documentation().map(str::to_owned),
            is_external_input: false,
            role: node.role().clone(),
            origin: node.origin().map(str::to_owned),
        }
    }
}

impl From<&ExternalInput> for Variable {
    fn from(input: &ExternalInput) -> Self {
        Self {
            name: input.name.clone(),
            value_type: input.value_type,
            tags: Tags::new(),
            documentation: None,
            is_external_input: true,
            role: NodeRole::Function,
            origin: None,
        }
    }
}
