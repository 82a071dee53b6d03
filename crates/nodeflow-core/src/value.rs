//! Value model and type descriptors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Dynamically typed value passed between nodes.
///
/// Arrays are the column-like shape understood by table result builders.
pub use serde_json::Value;

/// Values keyed by node or input name.
pub type ValueMap = HashMap<String, Value>;

/// Type descriptor for parameters, outputs and external inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueType {
    /// Any value, including null.
    Any,
    /// The null value.
    Null,
    /// A boolean.
    Bool,
    /// An integral number.
    Integer,
    /// Any number; integers are accepted where floats are expected.
    Float,
    /// A string.
    String,
    /// An array, the column-like shape.
    Array,
    /// A JSON object.
    Object,
}

impl ValueType {
    /// Returns the most specific descriptor for a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Float,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns whether `value` conforms to this descriptor.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Returns whether values produced as `produced` can be consumed as `self`.
    pub fn is_assignable_from(self, produced: ValueType) -> bool {
        self == produced
            || self == Self::Any
            || produced == Self::Any
            || (self == Self::Float && produced == Self::Integer)
    }

    /// Returns whether this descriptor is numeric.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}
