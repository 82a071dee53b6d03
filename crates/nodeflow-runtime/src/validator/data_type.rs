use nodeflow_core::{Importance, ValidationOutcome, Validator, Value, ValueType};

/// Checks that a value conforms to a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTypeValidator {
    expected: ValueType,
    importance: Importance,
}

impl DataTypeValidator {
    /// Creates a new data type validator.
    pub fn new(expected: ValueType, importance: Importance) -> Self {
        Self {
            expected,
            importance,
        }
    }
}

impl Validator for DataTypeValidator {
    fn name(&self) -> &str {
        "data_type"
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn validate(&self, value: &Value) -> ValidationOutcome {
        let found = ValueType::of(value);
        if self.expected.accepts(value) {
            ValidationOutcome::passed(format!("value is {found}"))
        } else {
            ValidationOutcome::failed(format!("expected {}, got {found}", self.expected))
        }
    }

    fn applies_to(&self, output_type: Option<ValueType>) -> Result<(), String> {
        match output_type {
            Some(declared) if !self.expected.is_assignable_from(declared) => Err(format!(
                "node declares {declared} output, which can never be {}",
                self.expected
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn checks_the_runtime_type() {
        let validator = DataTypeValidator::new(ValueType::Integer, Importance::Fail);
        assert!(validator.validate(&json!(3)).passed);

        let outcome = validator.validate(&json!("3"));
        assert!(!outcome.passed);
        assert_eq!(outcome.message, "expected integer, got string");
    }

    #[test]
    fn rejects_incompatible_declared_outputs() {
        let validator = DataTypeValidator::new(ValueType::Float, Importance::Fail);
        assert!(validator.applies_to(Some(ValueType::Integer)).is_ok());
        assert!(validator.applies_to(None).is_ok());
        assert!(validator.applies_to(Some(ValueType::String)).is_err());
    }
}
