//! Execution context.

use std::collections::HashMap;

use nodeflow_core::{Inputs, Node, Value, ValueMap};

use crate::error::ExecutionError;

/// Values available during one execution.
///
/// Seeded from provided inputs; every computed value is written exactly once.
/// Two contexts are equal when they hold the same values, regardless of the
/// order nodes completed in.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
    computed: Vec<String>,
}

impl ExecutionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context holding the provided inputs.
    pub fn seeded(provided: &ValueMap) -> Self {
        Self {
            values: provided.clone(),
            computed: Vec::new(),
        }
    }

    /// Records a computed value.
    ///
    /// Fails if `name` already holds a value.
    pub fn record(&mut self, name: impl Into<String>, value: Value) -> Result<(), ExecutionError> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(ExecutionError::AlreadyRecorded { node: name });
        }
        self.values.insert(name.clone(), value);
        self.computed.push(name);
        Ok(())
    }

    /// Returns a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns whether `name` holds a value.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the names computed in this execution, in completion order.
    pub fn computed(&self) -> &[String] {
        &self.computed
    }

    /// Returns the number of values, provided ones included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the context holds no value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all values in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Resolves the arguments of `node`.
    ///
    /// Required dependencies must hold a value; optional ones are passed only
    /// when present.
    pub fn inputs_for(&self, node: &Node) -> Result<Inputs, ExecutionError> {
        let mut inputs = Inputs::new();
        for dependency in node.dependencies() {
            match self.values.get(&dependency.name) {
                Some(value) => {
                    inputs.insert(dependency.name.clone(), value.clone());
                }
                None if dependency.optional => {}
                None => {
                    return Err(ExecutionError::MissingValue {
                        node: node.name().to_owned(),
                        dependency: dependency.name.clone(),
                    });
                }
            }
        }
        Ok(inputs)
    }

    /// Consumes the context and returns its values.
    pub fn into_values(self) -> ValueMap {
        self.values
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
