//! Validation capability shared by built-in and user-supplied checks.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::value::{Value, ValueType};

/// How a failed validation is handled.
///
/// Ordered from least to most restrictive, so `max` picks the stricter level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Importance {
    /// Recorded as a warning; execution continues.
    Warn,
    /// Halts execution.
    #[default]
    Fail,
}

impl Importance {
    /// Returns the more restrictive of two levels.
    pub fn most_restrictive(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the value passed.
    pub passed: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationOutcome {
    /// Creates a passing outcome.
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    /// Creates a failing outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// Encodes the outcome as the output value of a validator node.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "passed": self.passed, "message": self.message })
    }

    /// Decodes the output value of a validator node.
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

/// A check run against a node's computed value.
///
/// Applicability is checked once at graph-build time through
/// [`Validator::applies_to`]; values are checked at execution time.
pub trait Validator: Send + Sync + fmt::Debug {
    /// Short name used to derive the validator node name.
    fn name(&self) -> &str;

    /// Importance of a failure.
    fn importance(&self) -> Importance;

    /// Validates a computed value.
    fn validate(&self, value: &Value) -> ValidationOutcome;

    /// Returns an explanation if this validator cannot check values of the
    /// given declared output type.
    fn applies_to(&self, output_type: Option<ValueType>) -> Result<(), String> {
        let _ = output_type;
        Ok(())
    }
}
