use nodeflow_core::{Importance, ValidationOutcome, Validator, Value, ValueType};

use super::elements;

/// Checks that a value, or every array element, is one of a fixed set.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowedValuesValidator {
    allowed: Vec<Value>,
    importance: Importance,
}

impl AllowedValuesValidator {
    /// Creates a new allowed-values validator.
    pub fn new(allowed: Vec<Value>, importance: Importance) -> Self {
        Self {
            allowed,
            importance,
        }
    }
}

impl Validator for AllowedValuesValidator {
    fn name(&self) -> &str {
        "allowed_values"
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn validate(&self, value: &Value) -> ValidationOutcome {
        match elements(value).find(|element| !self.allowed.contains(element)) {
            Some(rejected) => ValidationOutcome::failed(format!("{rejected} is not allowed")),
            None => ValidationOutcome::passed("all values allowed"),
        }
    }

    fn applies_to(&self, _output_type: Option<ValueType>) -> Result<(), String> {
        if self.allowed.is_empty() {
            return Err("the set of allowed values is empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_members_only() {
        let validator = AllowedValuesValidator::new(vec![json!("a"), json!("b")], Importance::Fail);
        assert!(validator.validate(&json!("a")).passed);
        assert!(validator.validate(&json!(["a", "b", "a"])).passed);

        let outcome = validator.validate(&json!(["a", "c"]));
        assert_eq!(outcome.message, "\"c\" is not allowed");
    }

    #[test]
    fn empty_sets_do_not_apply() {
        let validator = AllowedValuesValidator::new(Vec::new(), Importance::Fail);
        assert!(validator.applies_to(None).is_err());
    }
}
