use nodeflow_core::{Importance, ValidationOutcome, Validator, Value, ValueType};

use super::elements;

/// Checks that numbers lie in a closed range.
///
/// Arrays are checked elementwise; null elements are skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeValidator {
    min: f64,
    max: f64,
    importance: Importance,
}

impl RangeValidator {
    /// Creates a new range validator over `[min, max]`.
    pub fn new(min: f64, max: f64, importance: Importance) -> Self {
        Self {
            min,
            max,
            importance,
        }
    }

    fn contains(&self, number: f64) -> bool {
        (self.min..=self.max).contains(&number)
    }
}

impl Validator for RangeValidator {
    fn name(&self) -> &str {
        "range"
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn validate(&self, value: &Value) -> ValidationOutcome {
        let mut outside = 0_usize;
        for element in elements(value).filter(|element| !element.is_null()) {
            match element.as_f64() {
                Some(number) if self.contains(number) => {}
                Some(_) => outside += 1,
                None => {
                    return ValidationOutcome::failed(format!(
                        "{} is not numeric",
                        ValueType::of(element)
                    ));
                }
            }
        }

        match (value, outside) {
            (_, 0) => ValidationOutcome::passed(format!(
                "all values in [{}, {}]",
                self.min, self.max
            )),
            (Value::Array(_), count) => ValidationOutcome::failed(format!(
                "{count} values outside [{}, {}]",
                self.min, self.max
            )),
            (scalar, _) => ValidationOutcome::failed(format!(
                "{scalar} is outside [{}, {}]",
                self.min, self.max
            )),
        }
    }

    fn applies_to(&self, output_type: Option<ValueType>) -> Result<(), String> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(format!("[{}, {}] is not a valid range", self.min, self.max));
        }

        let Some(declared) = output_type else {
            return Ok(());
        };
        if declared.is_numeric() || matches!(declared, ValueType::Array | ValueType::Any) {
            Ok(())
        } else {
            Err(format!(
                "range checks need numeric output, node declares {declared}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let validator = RangeValidator::new(0.0, 100.0, Importance::Fail);
        assert!(validator.validate(&json!(0)).passed);
        assert!(validator.validate(&json!(100.0)).passed);

        let outcome = validator.validate(&json!(150));
        assert!(!outcome.passed);
        assert_eq!(outcome.message, "150 is outside [0, 100]");
    }

    #[test]
    fn arrays_are_checked_elementwise() {
        let validator = RangeValidator::new(0.0, 1.0, Importance::Warn);
        assert!(validator.validate(&json!([0.1, null, 0.9])).passed);

        let outcome = validator.validate(&json!([0.5, 2, -1]));
        assert_eq!(outcome.message, "2 values outside [0, 1]");
        assert!(!validator.validate(&json!(["x"])).passed);
    }

    #[test]
    fn applicability_needs_a_valid_range_and_numeric_output() {
        let validator = RangeValidator::new(0.0, 1.0, Importance::Fail);
        assert!(validator.applies_to(Some(ValueType::Float)).is_ok());
        assert!(validator.applies_to(Some(ValueType::Array)).is_ok());
        assert!(validator.applies_to(Some(ValueType::String)).is_err());

        let empty = RangeValidator::new(2.0, 1.0, Importance::Fail);
        assert!(empty.applies_to(None).is_err());
    }
}
