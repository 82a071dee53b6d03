//! Decorators: node transformers applied while a graph is built.
//!
//! A decorator receives the node produced so far together with any auxiliary
//! nodes earlier decorators injected, and returns a new [`Decorated`] value.
//! Decorators of one function compose left to right.

mod check_output;
mod check_output_custom;
mod tag;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub use check_output::CheckOutput;
pub use check_output_custom::{CheckOutputCustom, Target};
use nodeflow_core::{
    Dependency, Importance, Node, NodeRole, TAG_IMPORTANCE, TAG_QUALITY_IMPORTANCE, TAG_TARGET,
    TAG_VALIDATOR, Tags, ValidatorBinding, Validator,
};
pub use tag::Tag;

use crate::error::DecoratorApplicationError;

/// Tracing target for decorator application.
const TRACING_TARGET: &str = "nodeflow_runtime::decorator";

/// Tag keys written by the framework itself.
const RESERVED_TAG_KEYS: [&str; 4] =
    [TAG_VALIDATOR, TAG_TARGET, TAG_IMPORTANCE, TAG_QUALITY_IMPORTANCE];

/// Returns the first reserved key among user-supplied `tags`.
pub(crate) fn reserved_tag_key(tags: &Tags) -> Option<&str> {
    tags.keys()
        .map(String::as_str)
        .find(|key| RESERVED_TAG_KEYS.contains(key))
}

/// A node transformer.
pub trait Decorator: Send + Sync + fmt::Debug {
    /// Name reported in application errors.
    fn name(&self) -> &str;

    /// Transforms the decorated node and its auxiliary nodes.
    fn apply(&self, decorated: Decorated) -> Result<Decorated, DecoratorApplicationError>;
}

/// A node plus the auxiliary nodes injected for it.
#[derive(Debug, Clone)]
pub struct Decorated {
    /// The primary node, named after the function.
    pub node: Node,
    /// Nodes injected by decorators, in injection order.
    pub auxiliary: Vec<Node>,
}

impl Decorated {
    /// Wraps an undecorated node.
    pub fn new(node: Node) -> Self {
        Self {
            node,
            auxiliary: Vec::new(),
        }
    }

    /// Iterates over the primary node followed by the auxiliary nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.node).chain(self.auxiliary.iter())
    }

    /// Finds a node by name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes().find(|node| node.name() == name)
    }

    /// Consumes the value, returning the primary node first.
    pub fn into_nodes(self) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(self.auxiliary.len() + 1);
        nodes.push(self.node);
        nodes.extend(self.auxiliary);
        nodes
    }

    /// Rewrites the node called `name` in place.
    fn update(&mut self, name: &str, rewrite: impl FnOnce(Node) -> Node) {
        let slot = if self.node.name() == name {
            Some(&mut self.node)
        } else {
            self.auxiliary.iter_mut().find(|node| node.name() == name)
        };

        if let Some(slot) = slot {
            let node = slot.clone();
            *slot = rewrite(node);
        }
    }

    /// Injects a validator node checking `target`.
    ///
    /// The applicability of the validator is checked against the target's
    /// declared output type, the validator node gets a name unique within
    /// this value, and the target's `quality.importance` tag is raised to the
    /// most restrictive importance attached to it.
    pub fn attach_validator(
        &mut self,
        decorator: &str,
        target: &str,
        validator: Arc<dyn Validator>,
    ) -> Result<(), DecoratorApplicationError> {
        let Some(checked) = self.find(target) else {
            return Err(DecoratorApplicationError::new(
                decorator,
                target,
                "no such node among the decorated nodes",
            ));
        };

        validator
            .applies_to(checked.output_type())
            .map_err(|reason| DecoratorApplicationError::new(decorator, target, reason))?;

        let origin = checked.origin().unwrap_or(target).to_owned();
        let importance = validator.importance();
        let name = self.unique_name(&format!("{target}_{}_validator", validator.name()));
        let binding = ValidatorBinding {
            target: target.to_owned(),
            validator: validator.name().to_owned(),
            importance,
        };

        let checked_name = target.to_owned();
        let documentation = format!("Checks `{target}` with `{}`.", validator.name());
        let node = Node::new(name, vec![Dependency::new(target)], move |inputs| {
            let value = inputs.get(&checked_name)?;
            Ok(validator.validate(value).to_value())
        })
        .with_role(NodeRole::Validator(binding))
        .with_tag(TAG_VALIDATOR, "true")
        .with_tag(TAG_TARGET, target)
        .with_tag(TAG_IMPORTANCE, importance.to_string())
        .with_documentation(documentation)
        .with_origin(origin);

        tracing::trace!(
            target: TRACING_TARGET,
            decorator,
            node = target,
            validator = node.name(),
            importance = %importance,
            "Attached validator"
        );

        self.update(target, |checked| {
            let current = checked
                .tag(TAG_QUALITY_IMPORTANCE)
                .and_then(|tag| tag.parse::<Importance>().ok());
            let raised = current.map_or(importance, |level| level.most_restrictive(importance));
            checked.with_tag(TAG_QUALITY_IMPORTANCE, raised.to_string())
        });
        self.auxiliary.push(node);
        Ok(())
    }

    fn unique_name(&self, base: &str) -> String {
        let taken: HashSet<&str> = self.nodes().map(Node::name).collect();
        if !taken.contains(base) {
            return base.to_owned();
        }

        (1..)
            .map(|suffix| format!("{base}_{suffix}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_owned())
    }
}

/// Runs `decorators` over `node` in declaration order.
pub fn apply_decorators(
    node: Node,
    decorators: &[Arc<dyn Decorator>],
) -> Result<Decorated, DecoratorApplicationError> {
    decorators
        .iter()
        .try_fold(Decorated::new(node), |decorated, decorator| {
            tracing::trace!(
                target: TRACING_TARGET,
                decorator = decorator.name(),
                node = decorated.node.name(),
                "Applying decorator"
            );
            decorator.apply(decorated)
        })
}
