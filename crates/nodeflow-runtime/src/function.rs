//! Function descriptors registered with a graph builder.

use std::sync::Arc;

use derive_more::Debug;
use nodeflow_core::{BoxedError, Dependency, Inputs, Node, NodeFn, Tags, Value, ValueType};

use crate::decorator::Decorator;

/// A declared parameter of a function.
///
/// Parameters are matched by name against other nodes, external inputs and
/// config keys.
pub type Param = Dependency;

/// A user function as registered with the graph builder.
///
/// Each descriptor yields one node named after the function, whose declared
/// inputs are the function's parameters in order. Decorators run in
/// declaration order when the graph is built.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    name: String,
    params: Vec<Param>,
    #[debug(skip)]
    callable: NodeFn,
    decorators: Vec<Arc<dyn Decorator>>,
    documentation: Option<String>,
    output_type: Option<ValueType>,
    tags: Tags,
    overrides: bool,
}

impl FunctionDef {
    /// Creates a descriptor from a name, parameters and a callable.
    pub fn new<F>(name: impl Into<String>, params: Vec<Param>, callable: F) -> Self
    where
        F: Fn(&Inputs) -> Result<Value, BoxedError> + Send + Sync + 'static,
    {
        Self::from_callable(name, params, Arc::new(callable))
    }

    /// Creates a descriptor from a shared callable.
    pub fn from_callable(name: impl Into<String>, params: Vec<Param>, callable: NodeFn) -> Self {
        Self {
            name: name.into(),
            params,
            callable,
            decorators: Vec::new(),
            documentation: None,
            output_type: None,
            tags: Tags::new(),
            overrides: false,
        }
    }

    /// Appends a decorator.
    pub fn decorate(mut self, decorator: impl Decorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Appends a shared decorator.
    pub fn decorate_shared(mut self, decorator: Arc<dyn Decorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Sets the documentation string.
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    /// Declares the output type.
    pub fn with_output_type(mut self, output_type: ValueType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Attaches a tag to the produced node.
    ///
    /// Keys the framework writes itself (`validator`, `target`, `importance`,
    /// `quality.importance`) fail the graph build.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Marks this descriptor as replacing an earlier one of the same name.
    ///
    /// The earlier node and every auxiliary node it injected are removed.
    pub fn overriding(mut self) -> Self {
        self.overrides = true;
        self
    }

    /// Returns the function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameters in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the decorators in declaration order.
    pub fn decorators(&self) -> &[Arc<dyn Decorator>] {
        &self.decorators
    }

    /// Returns the tags set on the descriptor.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns whether this descriptor replaces an earlier one.
    pub fn is_override(&self) -> bool {
        self.overrides
    }

    /// Produces the undecorated node.
    pub fn to_node(&self) -> Node {
        let mut node = Node::from_callable(&self.name, self.params.clone(), self.callable.clone())
            .with_tags(self.tags.clone())
            .with_origin(&self.name);

        if let Some(documentation) = &self.documentation {
            node = node.with_documentation(documentation);
        }
        if let Some(output_type) = self.output_type {
            node = node.with_output_type(output_type);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn node_mirrors_the_descriptor() {
        let def = FunctionDef::new("b", vec![Param::new("a").with_type(ValueType::Integer)], |i| {
            Ok(json!(i.get_i64("a")? + 1))
        })
        .with_documentation("a plus one")
        .with_output_type(ValueType::Integer)
        .with_tag("owner", "metrics");

        let node = def.to_node();
        assert_eq!(node.name(), "b");
        assert_eq!(node.dependencies(), def.params());
        assert_eq!(node.documentation(), Some("a plus one"));
        assert_eq!(node.output_type(), Some(ValueType::Integer));
        assert_eq!(node.tag("owner"), Some("metrics"));
        assert_eq!(node.origin(), Some("b"));
        assert_eq!(node.call(&Inputs::new().with("a", json!(1))).unwrap(), json!(2));
    }

    #[test]
    fn override_flag_defaults_to_false() {
        let def = FunctionDef::new("a", Vec::new(), |_| Ok(json!(1)));
        assert!(!def.is_override());
        assert!(def.overriding().is_override());
    }
}
