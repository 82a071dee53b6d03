//! Resolved arguments for a single node call.

use std::collections::HashMap;

use crate::error::InputError;
use crate::value::{Value, ValueType};

/// Arguments handed to a node callable, keyed by dependency name.
///
/// Only dependencies that were resolved for this call are present; optional
/// dependencies that were neither computed nor provided are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: HashMap<String, Value>,
}

impl Inputs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an argument, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    /// Adds an argument and returns `self`.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the argument, or [`InputError::Missing`].
    pub fn get(&self, name: &str) -> Result<&Value, InputError> {
        self.values.get(name).ok_or_else(|| InputError::Missing {
            name: name.to_owned(),
        })
    }

    /// Returns the argument if it was resolved.
    pub fn get_opt(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the argument as an `i64`.
    pub fn get_i64(&self, name: &str) -> Result<i64, InputError> {
        let value = self.get(name)?;
        value
            .as_i64()
            .ok_or_else(|| mismatch(name, ValueType::Integer, value))
    }

    /// Returns the argument as an `f64`; integers are widened.
    pub fn get_f64(&self, name: &str) -> Result<f64, InputError> {
        let value = self.get(name)?;
        value
            .as_f64()
            .ok_or_else(|| mismatch(name, ValueType::Float, value))
    }

    /// Returns the argument as a string slice.
    pub fn get_str(&self, name: &str) -> Result<&str, InputError> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(name, ValueType::String, value))
    }

    /// Returns the argument as a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, InputError> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(name, ValueType::Bool, value))
    }

    /// Returns the argument as an array.
    pub fn get_array(&self, name: &str) -> Result<&[Value], InputError> {
        let value = self.get(name)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| mismatch(name, ValueType::Array, value))
    }

    /// Returns whether the argument was resolved.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of resolved arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no argument was resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the arguments in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Consumes the arguments and returns the underlying map.
    pub fn into_inner(self) -> HashMap<String, Value> {
        self.values
    }
}

impl FromIterator<(String, Value)> for Inputs {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, Value>> for Inputs {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

fn mismatch(name: &str, expected: ValueType, found: &Value) -> InputError {
    InputError::TypeMismatch {
        name: name.to_owned(),
        expected,
        found: ValueType::of(found),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn typed_getters_read_matching_values() {
        let inputs = Inputs::new()
            .with("a", json!(5))
            .with("b", json!("x"))
            .with("c", json!([1, 2]));

        assert_eq!(inputs.get_i64("a"), Ok(5));
        assert_eq!(inputs.get_f64("a"), Ok(5.0));
        assert_eq!(inputs.get_str("b"), Ok("x"));
        assert_eq!(inputs.get_array("c").map(<[Value]>::len), Ok(2));
    }

    #[test]
    fn missing_and_mismatched_arguments_are_reported() {
        let inputs = Inputs::new().with("a", json!("five"));

        assert_eq!(
            inputs.get_i64("b"),
            Err(InputError::Missing { name: "b".into() })
        );
        assert_eq!(
            inputs.get_i64("a"),
            Err(InputError::TypeMismatch {
                name: "a".into(),
                expected: ValueType::Integer,
                found: ValueType::String,
            })
        );
    }
}
