//! Mock validator for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nodeflow_core::{Importance, ValidationOutcome, Validator, Value, ValueType};

/// Validator returning a fixed outcome.
///
/// Reports itself as `mock`, so decorators name its node
/// `{target}_mock_validator`.
#[derive(Debug, Clone)]
pub struct MockValidator {
    passes: bool,
    message: String,
    importance: Importance,
    rejection: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockValidator {
    /// Creates a validator that accepts every value.
    pub fn passing() -> Self {
        Self::scripted(true, "ok")
    }

    /// Creates a validator that rejects every value with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(false, message)
    }

    fn scripted(passes: bool, message: impl Into<String>) -> Self {
        Self {
            passes,
            message: message.into(),
            importance: Importance::Fail,
            rejection: None,
            calls: Arc::default(),
        }
    }

    /// Sets the importance. Defaults to [`Importance::Fail`].
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Makes the validator inapplicable to every output type.
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.rejection = Some(reason.into());
        self
    }

    /// Returns how many values were validated, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Validator for MockValidator {
    fn name(&self) -> &str {
        "mock"
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn validate(&self, _value: &Value) -> ValidationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.passes {
            ValidationOutcome::passed(self.message.clone())
        } else {
            ValidationOutcome::failed(self.message.clone())
        }
    }

    fn applies_to(&self, _output_type: Option<ValueType>) -> Result<(), String> {
        match &self.rejection {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }
}
