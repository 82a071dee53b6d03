use std::sync::Arc;

use nodeflow_core::Validator;

use super::{Decorated, Decorator};
use crate::error::DecoratorApplicationError;

/// Selects the nodes a custom check applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Target {
    /// The decorated node only.
    #[default]
    Decorated,
    /// The decorated node and every non-validator auxiliary node.
    All,
    /// Named nodes among the decorated node and its auxiliary nodes.
    Nodes(Vec<String>),
}

/// Attaches user-supplied validators.
#[derive(Debug, Clone, Default)]
pub struct CheckOutputCustom {
    validators: Vec<Arc<dyn Validator>>,
    target: Target,
}

impl CheckOutputCustom {
    /// Creates a decorator from shared validators.
    pub fn new(validators: impl IntoIterator<Item = Arc<dyn Validator>>) -> Self {
        Self {
            validators: validators.into_iter().collect(),
            target: Target::Decorated,
        }
    }

    /// Adds a validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Sets the target selector.
    pub fn targeting(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    fn targets(&self, decorated: &Decorated) -> Result<Vec<String>, DecoratorApplicationError> {
        match &self.target {
            Target::Decorated => Ok(vec![decorated.node.name().to_owned()]),
            Target::All => Ok(decorated
                .nodes()
                .filter(|node| !node.is_validator())
                .map(|node| node.name().to_owned())
                .collect()),
            Target::Nodes(names) => names
                .iter()
                .map(|name| match decorated.find(name) {
                    Some(node) if !node.is_validator() => Ok(name.clone()),
                    Some(_) => Err(DecoratorApplicationError::new(
                        self.name(),
                        decorated.node.name(),
                        format!("target '{name}' is a validator node"),
                    )),
                    None => Err(DecoratorApplicationError::new(
                        self.name(),
                        decorated.node.name(),
                        format!("unknown target '{name}'"),
                    )),
                })
                .collect(),
        }
    }
}

impl Decorator for CheckOutputCustom {
    fn name(&self) -> &str {
        "check_output_custom"
    }

    fn apply(&self, mut decorated: Decorated) -> Result<Decorated, DecoratorApplicationError> {
        if self.validators.is_empty() {
            return Err(DecoratorApplicationError::new(
                self.name(),
                decorated.node.name(),
                "no validators supplied",
            ));
        }

        for target in self.targets(&decorated)? {
            for validator in &self.validators {
                decorated.attach_validator(self.name(), &target, Arc::clone(validator))?;
            }
        }
        Ok(decorated)
    }
}

impl From<Vec<Arc<dyn Validator>>> for CheckOutputCustom {
    fn from(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self::new(validators)
    }
}
