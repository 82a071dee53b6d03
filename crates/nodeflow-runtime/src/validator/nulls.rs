use nodeflow_core::{Importance, ValidationOutcome, Validator, Value, ValueType};

/// Checks the fraction of null values.
///
/// A scalar counts as fully null or not null at all; an empty array has no
/// nulls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullValidator {
    max_fraction: f64,
    importance: Importance,
}

impl NullValidator {
    /// Rejects any null value.
    pub fn not_null(importance: Importance) -> Self {
        Self::max_fraction(0.0, importance)
    }

    /// Rejects values with more than `max_fraction` nulls.
    pub fn max_fraction(max_fraction: f64, importance: Importance) -> Self {
        Self {
            max_fraction,
            importance,
        }
    }

    fn null_fraction(value: &Value) -> f64 {
        match value {
            Value::Array(items) if items.is_empty() => 0.0,
            Value::Array(items) => {
                let nulls = items.iter().filter(|item| item.is_null()).count();
                nulls as f64 / items.len() as f64
            }
            Value::Null => 1.0,
            _ => 0.0,
        }
    }
}

impl Validator for NullValidator {
    fn name(&self) -> &str {
        if self.max_fraction == 0.0 {
            "not_null"
        } else {
            "max_null_fraction"
        }
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn validate(&self, value: &Value) -> ValidationOutcome {
        let fraction = Self::null_fraction(value);
        let message = format!("null fraction {fraction:.3}, allowed {:.3}", self.max_fraction);
        if fraction <= self.max_fraction {
            ValidationOutcome::passed(message)
        } else {
            ValidationOutcome::failed(message)
        }
    }

    fn applies_to(&self, _output_type: Option<ValueType>) -> Result<(), String> {
        if (0.0..=1.0).contains(&self.max_fraction) {
            Ok(())
        } else {
            Err(format!(
                "null fraction {} is outside [0, 1]",
                self.max_fraction
            ))
        }
    }
}
