//! Node types.

use std::collections::BTreeMap;
use std::sync::Arc;

use derive_more::Debug;
use serde::{Deserialize, Serialize};

use crate::error::BoxedError;
use crate::inputs::Inputs;
use crate::validation::Importance;
use crate::value::{Value, ValueType};

/// Tag set on every validator node.
pub const TAG_VALIDATOR: &str = "validator";
/// Tag naming the node a validator checks.
pub const TAG_TARGET: &str = "target";
/// Tag carrying a validator's importance.
pub const TAG_IMPORTANCE: &str = "importance";
/// Tag carrying the most restrictive importance of the checks on a node.
pub const TAG_QUALITY_IMPORTANCE: &str = "quality.importance";
/// Tag opting a node into memoization by caching adapters.
pub const TAG_CACHE: &str = "cache";

/// Key-value metadata attached to a node.
pub type Tags = BTreeMap<String, String>;

/// Callable capability of a node.
pub type NodeFn = Arc<dyn Fn(&Inputs) -> Result<Value, BoxedError> + Send + Sync>;

/// A declared input of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the node or external input this dependency resolves to.
    pub name: String,
    /// Declared type, checked against upstream outputs at build time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Optional dependencies may stay unresolved.
    #[serde(default)]
    pub optional: bool,
}

impl Dependency {
    /// Creates a required, untyped dependency.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
            optional: false,
        }
    }

    /// Sets the declared type.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Marks the dependency as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Dependency {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Binding between a validator node and the node it checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorBinding {
    /// Name of the checked node.
    pub target: String,
    /// Name of the validator that produced this node.
    pub validator: String,
    /// Whether a failure halts execution.
    pub importance: Importance,
}

/// Role of a node in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRole {
    /// A user function.
    #[default]
    Function,
    /// A quality check consuming another node's output.
    Validator(ValidatorBinding),
}

/// A named, pure computation.
///
/// Nodes are immutable values: every `with_*` method consumes the node and
/// returns a new one, which is how decorators rewrite them.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    dependencies: Vec<Dependency>,
    #[debug(skip)]
    callable: NodeFn,
    tags: Tags,
    documentation: Option<String>,
    output_type: Option<ValueType>,
    role: NodeRole,
    origin: Option<String>,
}

impl Node {
    /// Creates a function node.
    pub fn new<F>(name: impl Into<String>, dependencies: Vec<Dependency>, callable: F) -> Self
    where
        F: Fn(&Inputs) -> Result<Value, BoxedError> + Send + Sync + 'static,
    {
        Self::from_callable(name, dependencies, Arc::new(callable))
    }

    /// Creates a function node from a shared callable.
    pub fn from_callable(
        name: impl Into<String>,
        dependencies: Vec<Dependency>,
        callable: NodeFn,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies,
            callable,
            tags: Tags::new(),
            documentation: None,
            output_type: None,
            role: NodeRole::Function,
            origin: None,
        }
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared inputs in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Returns the shared callable.
    pub fn callable(&self) -> &NodeFn {
        &self.callable
    }

    /// Returns the tags.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns the documentation string.
    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Returns the declared output type.
    pub fn output_type(&self) -> Option<ValueType> {
        self.output_type
    }

    /// Returns the node role.
    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    /// Returns the name of the function descriptor this node came from.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns the validator binding if this is a validator node.
    pub fn validator_binding(&self) -> Option<&ValidatorBinding> {
        match &self.role {
            NodeRole::Validator(binding) => Some(binding),
            NodeRole::Function => None,
        }
    }

    /// Returns whether this is a validator node.
    pub fn is_validator(&self) -> bool {
        matches!(self.role, NodeRole::Validator(_))
    }

    /// Invokes the callable.
    pub fn call(&self, inputs: &Inputs) -> Result<Value, BoxedError> {
        (self.callable)(inputs)
    }

    /// Sets a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merges a set of tags, overwriting existing keys.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Sets the documentation string.
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    /// Sets the declared output type.
    pub fn with_output_type(mut self, output_type: ValueType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    /// Records the originating function descriptor.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Replaces the callable, keeping every other attribute.
    pub fn with_callable(mut self, callable: NodeFn) -> Self {
        self.callable = callable;
        self
    }
}
