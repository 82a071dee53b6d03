//! Requested outputs of one execution.

use derive_more::IntoIterator;
use nodeflow_core::Value;

use crate::adapter::ExecutionContext;
use crate::error::ResultBuildError;

/// Requested outputs in requested order.
#[derive(Debug, Clone, Default, PartialEq, IntoIterator)]
pub struct Outputs {
    #[into_iterator(owned, ref)]
    entries: Vec<(String, Value)>,
}

impl Outputs {
    /// Creates an empty set of outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects `requested` from an execution context.
    pub fn collect(requested: &[String], context: &ExecutionContext) -> Result<Self, ResultBuildError> {
        requested
            .iter()
            .map(|name| {
                context
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
                    .ok_or_else(|| ResultBuildError::MissingOutput { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|entries| Self { entries })
    }

    /// Appends an output.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Returns an output by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    /// Returns the output names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of outputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the outputs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Outputs {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use nodeflow_core::ValueMap;
    use serde_json::json;

    use super::*;

    #[test]
    fn collects_in_requested_order() {
        let context = ExecutionContext::seeded(&ValueMap::from([
            ("a".to_owned(), json!(1)),
            ("b".to_owned(), json!(2)),
        ]));
        let outputs = Outputs::collect(&["b".to_owned(), "a".to_owned()], &context).unwrap();
        let names: Vec<&str> = outputs.names().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn absent_outputs_are_reported() {
        let outputs = Outputs::collect(&["zzz".to_owned()], &ExecutionContext::new());
        assert_eq!(
            outputs,
            Err(ResultBuildError::MissingOutput { name: "zzz".into() })
        );
    }
}
