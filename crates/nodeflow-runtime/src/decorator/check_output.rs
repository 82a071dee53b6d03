use nodeflow_core::{Importance, Value, ValueType};

use super::{Decorated, Decorator};
use crate::error::DecoratorApplicationError;
use crate::validator::Predicate;

/// Attaches built-in checks to a function's output.
///
/// Each predicate becomes one validator node. Importance defaults to
/// [`Importance::Fail`] and can be set for the whole decorator or per
/// predicate.
#[derive(Debug, Clone, Default)]
pub struct CheckOutput {
    checks: Vec<(Predicate, Option<Importance>)>,
    importance: Importance,
}

impl CheckOutput {
    /// Creates a decorator without checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the importance of checks declared without their own.
    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Adds a predicate with the decorator-wide importance.
    pub fn check(mut self, predicate: Predicate) -> Self {
        self.checks.push((predicate, None));
        self
    }

    /// Adds a predicate with its own importance.
    pub fn check_with(mut self, predicate: Predicate, importance: Importance) -> Self {
        self.checks.push((predicate, Some(importance)));
        self
    }

    /// Requires the output to conform to `value_type`.
    pub fn data_type(self, value_type: ValueType) -> Self {
        self.check(Predicate::DataType(value_type))
    }

    /// Requires every number of the output to lie in `[min, max]`.
    pub fn range(self, min: f64, max: f64) -> Self {
        self.check(Predicate::Range { min, max })
    }

    /// Rejects null outputs and null array elements.
    pub fn not_null(self) -> Self {
        self.check(Predicate::NotNull)
    }

    /// Bounds the fraction of null array elements.
    pub fn max_null_fraction(self, fraction: f64) -> Self {
        self.check(Predicate::MaxNullFraction(fraction))
    }

    /// Restricts the output to a set of values.
    pub fn allowed_values(self, values: impl IntoIterator<Item = Value>) -> Self {
        self.check(Predicate::AllowedValues(values.into_iter().collect()))
    }
}

impl Decorator for CheckOutput {
    fn name(&self) -> &str {
        "check_output"
    }

    fn apply(&self, mut decorated: Decorated) -> Result<Decorated, DecoratorApplicationError> {
        let target = decorated.node.name().to_owned();
        if self.checks.is_empty() {
            return Err(DecoratorApplicationError::new(
                self.name(),
                target,
                "no checks declared",
            ));
        }

        for (predicate, importance) in &self.checks {
            let validator = predicate
                .clone()
                .into_validator(importance.unwrap_or(self.importance));
            decorated.attach_validator(self.name(), &target, validator)?;
        }
        Ok(decorated)
    }
}
