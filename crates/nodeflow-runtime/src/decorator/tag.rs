use nodeflow_core::Tags;

use super::{Decorated, Decorator, reserved_tag_key};
use crate::error::DecoratorApplicationError;

/// Attaches user metadata to the decorated node.
#[derive(Debug, Clone, Default)]
pub struct Tag {
    tags: Tags,
}

impl Tag {
    /// Creates an empty tag decorator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key-value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Decorator for Tag {
    fn name(&self) -> &str {
        "tag"
    }

    fn apply(&self, mut decorated: Decorated) -> Result<Decorated, DecoratorApplicationError> {
        if let Some(key) = reserved_tag_key(&self.tags) {
            return Err(DecoratorApplicationError::new(
                self.name(),
                decorated.node.name(),
                format!("tag key '{key}' is reserved"),
            ));
        }

        decorated.node = decorated.node.with_tags(self.tags.clone());
        Ok(decorated)
    }
}
