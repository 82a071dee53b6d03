//! External input declarations.

use nodeflow_core::ValueType;
use serde::{Deserialize, Serialize};

/// A name that callers supply when executing the graph.
///
/// Config values are registered as external inputs whose type is taken from
/// the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalInput {
    /// Input name.
    pub name: String,
    /// Declared type, checked against provided values and consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Whether the value is fixed by build-time config.
    #[serde(default)]
    pub from_config: bool,
}

impl ExternalInput {
    /// Declares an untyped input.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
            from_config: false,
        }
    }

    /// Sets the declared type.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub(crate) fn config(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            from_config: true,
            ..Self::new(name).with_type(value_type)
        }
    }
}

impl From<&str> for ExternalInput {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
