//! Built-in validators and the predicates that select them.

mod allowed_values;
mod data_type;
mod nulls;
mod range;

use std::sync::Arc;

pub use allowed_values::AllowedValuesValidator;
pub use data_type::DataTypeValidator;
use nodeflow_core::{Importance, Node, ValidationOutcome, ValidatorBinding, Validator, Value, ValueType};
pub use nulls::NullValidator;
pub use range::RangeValidator;

/// A built-in check declared through [`CheckOutput`](crate::decorator::CheckOutput).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The value conforms to a type descriptor.
    DataType(ValueType),
    /// Every number lies in the closed range `[min, max]`.
    Range {
        /// Lower bound, inclusive.
        min: f64,
        /// Upper bound, inclusive.
        max: f64,
    },
    /// The value, or no element of an array, is null.
    NotNull,
    /// At most this fraction of an array's elements are null.
    MaxNullFraction(f64),
    /// The value, or every element of an array, is one of these.
    AllowedValues(Vec<Value>),
}

impl Predicate {
    /// Builds the validator implementing this predicate.
    pub fn into_validator(self, importance: Importance) -> Arc<dyn Validator> {
        match self {
            Self::DataType(expected) => Arc::new(DataTypeValidator::new(expected, importance)),
            Self::Range { min, max } => Arc::new(RangeValidator::new(min, max, importance)),
            Self::NotNull => Arc::new(NullValidator::not_null(importance)),
            Self::MaxNullFraction(fraction) => {
                Arc::new(NullValidator::max_fraction(fraction, importance))
            }
            Self::AllowedValues(values) => Arc::new(AllowedValuesValidator::new(values, importance)),
        }
    }
}

/// Returns the binding and outcome of a validator node whose output failed.
///
/// Outputs that do not decode as an outcome count as failures.
pub(crate) fn failed_check<'a>(
    node: &'a Node,
    value: &Value,
) -> Option<(&'a ValidatorBinding, ValidationOutcome)> {
    let binding = node.validator_binding()?;
    let outcome = ValidationOutcome::from_value(value)
        .unwrap_or_else(|| ValidationOutcome::failed("validator produced a malformed outcome"));

    (!outcome.passed).then_some((binding, outcome))
}

/// Iterates over the array elements of a value, or the value itself.
fn elements(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    }
}
