//! Graph construction from function descriptors.

use std::collections::{BTreeMap, HashMap};

use nodeflow_core::{Node, Value, ValueMap, ValueType};

use super::TRACING_TARGET;
use super::cycle::find_cycle;
use super::graph::FunctionGraph;
use super::input::ExternalInput;
use crate::decorator::{apply_decorators, reserved_tag_key};
use crate::error::{GraphConstructionError, Result};
use crate::function::FunctionDef;

/// Collects function descriptors, external inputs and config, and builds a
/// validated [`FunctionGraph`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    functions: Vec<FunctionDef>,
    external_inputs: Vec<ExternalInput>,
    config: ValueMap,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function descriptor.
    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    /// Registers function descriptors in order.
    pub fn with_functions(mut self, functions: impl IntoIterator<Item = FunctionDef>) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Declares an external input.
    pub fn with_external_input(mut self, input: impl Into<ExternalInput>) -> Self {
        self.external_inputs.push(input.into());
        self
    }

    /// Sets a build-time config value.
    pub fn with_config(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config.insert(name.into(), value);
        self
    }

    /// Builds the graph.
    ///
    /// Decorators run per descriptor in declaration order; symbol resolution,
    /// type checks and the cycle check run once every node is registered.
    pub fn build(self) -> Result<FunctionGraph> {
        let mut registry = Registry::default();
        for function in &self.functions {
            registry.register(function)?;
        }

        let external_inputs = self.declared_inputs();
        registry.resolve(&external_inputs)?;

        let graph = FunctionGraph::assemble(registry.nodes, external_inputs, self.config);
        if let Some(path) = find_cycle(graph.inner()) {
            return Err(GraphConstructionError::CycleDetected { path }.into());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            function_count = self.functions.len(),
            node_count = graph.node_count(),
            edge_count = graph.edge_count(),
            "Function graph built"
        );

        Ok(graph)
    }

    /// External inputs plus config keys typed after their values.
    fn declared_inputs(&self) -> BTreeMap<String, ExternalInput> {
        let declared = self
            .external_inputs
            .iter()
            .map(|input| (input.name.clone(), input.clone()));
        let config = self.config.iter().map(|(name, value)| {
            let input = ExternalInput::config(name.clone(), ValueType::of(value));
            (name.clone(), input)
        });
        declared.chain(config).collect()
    }
}

/// Nodes registered so far, in registration order.
#[derive(Default)]
struct Registry {
    nodes: Vec<Node>,
    positions: HashMap<String, usize>,
}

impl Registry {
    fn register(&mut self, function: &FunctionDef) -> Result<()> {
        if function.name().is_empty() {
            return Err(GraphConstructionError::InvalidName.into());
        }

        if function.is_override() {
            self.remove_origin(function.name());
        } else if self.positions.contains_key(function.name()) {
            return Err(GraphConstructionError::DuplicateNode {
                name: function.name().to_owned(),
            }
            .into());
        }

        if let Some(key) = reserved_tag_key(function.tags()) {
            return Err(GraphConstructionError::ReservedTag {
                node: function.name().to_owned(),
                key: key.to_owned(),
            }
            .into());
        }

        let decorated = apply_decorators(function.to_node(), function.decorators())?;
        for node in decorated.into_nodes() {
            if node.name().is_empty() {
                return Err(GraphConstructionError::InvalidName.into());
            }
            if self.positions.contains_key(node.name()) {
                return Err(GraphConstructionError::DuplicateNode {
                    name: node.name().to_owned(),
                }
                .into());
            }
            self.positions.insert(node.name().to_owned(), self.nodes.len());
            self.nodes.push(node);
        }
        Ok(())
    }

    /// Removes every node produced by the descriptor called `origin`.
    fn remove_origin(&mut self, origin: &str) {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| node.name() != origin && node.origin() != Some(origin));

        if self.nodes.len() != before {
            tracing::debug!(
                target: TRACING_TARGET,
                function = origin,
                removed = before - self.nodes.len(),
                "Overriding function"
            );
            self.positions = self
                .nodes
                .iter()
                .enumerate()
                .map(|(position, node)| (node.name().to_owned(), position))
                .collect();
        }
    }

    fn output_type(&self, name: &str) -> Option<ValueType> {
        self.positions
            .get(name)
            .and_then(|&position| self.nodes[position].output_type())
    }

    /// Checks that every dependency resolves and that declared types agree.
    fn resolve(&self, external_inputs: &BTreeMap<String, ExternalInput>) -> Result<()> {
        for node in &self.nodes {
            for dependency in node.dependencies() {
                let produced = if self.positions.contains_key(&dependency.name) {
                    self.output_type(&dependency.name)
                } else if let Some(input) = external_inputs.get(&dependency.name) {
                    input.value_type
                } else if dependency.optional {
                    continue;
                } else {
                    return Err(GraphConstructionError::UnresolvedDependency {
                        node: node.name().to_owned(),
                        dependency: dependency.name.clone(),
                    }
                    .into());
                };

                if let (Some(expected), Some(found)) = (dependency.value_type, produced)
                    && !expected.is_assignable_from(found)
                {
                    return Err(GraphConstructionError::TypeMismatch {
                        node: node.name().to_owned(),
                        dependency: dependency.name.clone(),
                        expected,
                        found,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nodeflow_core::{Importance, TAG_CACHE, TAG_QUALITY_IMPORTANCE};
    use nodeflow_test::MockValidator;
    use serde_json::json;

    use super::*;
    use crate::decorator::{CheckOutput, CheckOutputCustom};
    use crate::error::Error;
    use crate::function::Param;

    fn constant(name: &str, value: Value) -> FunctionDef {
        FunctionDef::new(name, Vec::new(), move |_| Ok(value.clone()))
    }

    fn depends(name: &str, deps: &[&str]) -> FunctionDef {
        let params = deps.iter().map(|d| Param::new(*d)).collect();
        FunctionDef::new(name, params, |_| Ok(Value::Null))
    }

    fn construction_error(result: Result<FunctionGraph>) -> GraphConstructionError {
        match result.unwrap_err() {
            Error::GraphConstruction(error) => error,
            other => panic!("expected a construction error, got {other:?}"),
        }
    }

    #[test]
    fn node_count_includes_injected_validators() {
        let graph = GraphBuilder::new()
            .with_function(constant("a", json!(5)))
            .with_function(depends("b", &["a"]).decorate(CheckOutput::new().range(0.0, 10.0).not_null()))
            .build()
            .unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(
            graph.validators_of("b"),
            ["b_range_validator", "b_not_null_validator"]
        );
    }

    #[test]
    fn duplicates_are_rejected_unless_overridden() {
        let duplicate = GraphBuilder::new()
            .with_function(constant("a", json!(1)))
            .with_function(constant("a", json!(2)))
            .build();
        assert_eq!(
            construction_error(duplicate),
            GraphConstructionError::DuplicateNode { name: "a".into() }
        );

        let overridden = GraphBuilder::new()
            .with_function(constant("a", json!(1)).decorate(CheckOutput::new().not_null()))
            .with_function(constant("a", json!(2)).overriding())
            .build()
            .unwrap();
        assert_eq!(overridden.node_count(), 1);
    }

    #[test]
    fn unresolved_dependencies_are_rejected() {
        let result = GraphBuilder::new().with_function(depends("b", &["a"])).build();
        assert_eq!(
            construction_error(result),
            GraphConstructionError::UnresolvedDependency {
                node: "b".into(),
                dependency: "a".into(),
            }
        );
    }

    #[test]
    fn inputs_and_config_resolve_dependencies() {
        let graph = GraphBuilder::new()
            .with_function(depends("b", &["a", "factor"]))
            .with_function(FunctionDef::new("c", vec![Param::new("z").optional()], |_| {
                Ok(Value::Null)
            }))
            .with_external_input("a")
            .with_config("factor", json!(2))
            .build()
            .unwrap();

        let factor = graph.external_input("factor").unwrap();
        assert_eq!(factor.value_type, Some(ValueType::Integer));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn cycles_are_rejected() {
        let result = GraphBuilder::new()
            .with_function(depends("a", &["c"]))
            .with_function(depends("b", &["a"]))
            .with_function(depends("c", &["b"]))
            .build();
        assert!(matches!(
            construction_error(result),
            GraphConstructionError::CycleDetected { .. }
        ));
    }

    #[test]
    fn declared_types_must_agree() {
        let result = GraphBuilder::new()
            .with_function(constant("a", json!("x")).with_output_type(ValueType::String))
            .with_function(FunctionDef::new(
                "b",
                vec![Param::new("a").with_type(ValueType::Integer)],
                |_| Ok(Value::Null),
            ))
            .build();
        assert_eq!(
            construction_error(result),
            GraphConstructionError::TypeMismatch {
                node: "b".into(),
                dependency: "a".into(),
                expected: ValueType::Integer,
                found: ValueType::String,
            }
        );
    }

    #[test]
    fn empty_names_are_invalid() {
        let result = GraphBuilder::new().with_function(constant("", json!(1))).build();
        assert_eq!(construction_error(result), GraphConstructionError::InvalidName);
    }

    #[test]
    fn descriptor_tags_cannot_use_reserved_keys() {
        let result = GraphBuilder::new()
            .with_function(constant("a", json!(1)).with_tag(TAG_QUALITY_IMPORTANCE, "warn"))
            .build();
        assert_eq!(
            construction_error(result),
            GraphConstructionError::ReservedTag {
                node: "a".into(),
                key: TAG_QUALITY_IMPORTANCE.into(),
            }
        );

        let graph = GraphBuilder::new()
            .with_function(constant("a", json!(1)).with_tag(TAG_CACHE, "json"))
            .build()
            .unwrap();
        assert_eq!(graph.node("a").unwrap().tag(TAG_CACHE), Some("json"));
    }

    #[test]
    fn decorator_failures_abort_the_build() {
        let validator = MockValidator::passing()
            .with_importance(Importance::Warn)
            .rejecting("not applicable");
        let result = GraphBuilder::new()
            .with_function(
                constant("a", json!(1)).decorate(CheckOutputCustom::default().with_validator(validator)),
            )
            .build();
        assert!(matches!(result, Err(Error::DecoratorApplication(_))));
    }
}
