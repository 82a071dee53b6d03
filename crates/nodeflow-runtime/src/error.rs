//! Runtime error types.
//!
//! Construction-time errors ([`GraphConstructionError`],
//! [`DecoratorApplicationError`]) abort graph creation. Every other error
//! aborts a single driver call and leaves the graph and driver reusable.

use std::path::PathBuf;
use std::time::Duration;

use nodeflow_core::{BoxedError, ValueType};
use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of runtime errors, used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The graph could not be built.
    GraphConstruction,
    /// A decorator could not be applied to a node.
    DecoratorApplication,
    /// A request could not be planned.
    Planning,
    /// A `Fail` validator rejected a value.
    Validation,
    /// A node callable failed.
    Execution,
    /// Outputs could not be assembled.
    ResultBuild,
    /// The execution exceeded its time budget.
    Timeout,
    /// The driver was configured inconsistently.
    Configuration,
    /// Internal invariant violated.
    Internal,
}

/// Errors that can occur while building, planning or executing a graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph construction failed.
    #[error(transparent)]
    GraphConstruction(#[from] GraphConstructionError),

    /// A decorator could not be applied.
    #[error(transparent)]
    DecoratorApplication(#[from] DecoratorApplicationError),

    /// The request could not be planned.
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// A `Fail` validator rejected a value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A node failed during execution.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The result could not be built.
    #[error(transparent)]
    ResultBuild(#[from] ResultBuildError),

    /// Execution exceeded the configured timeout.
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    /// The driver was configured inconsistently.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GraphConstruction(_) => ErrorKind::GraphConstruction,
            Self::DecoratorApplication(_) => ErrorKind::DecoratorApplication,
            Self::Planning(_) => ErrorKind::Planning,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Execution(_) => ErrorKind::Execution,
            Self::ResultBuild(_) => ErrorKind::ResultBuild,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error category as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind().into()
    }
}

/// Errors raised while building a function graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphConstructionError {
    /// Node names must be non-empty.
    #[error("node names must not be empty")]
    InvalidName,

    /// Two definitions produced the same node name without an override.
    #[error("duplicate node '{name}'")]
    DuplicateNode {
        /// The duplicated name.
        name: String,
    },

    /// A required dependency matches no node, external input or config key.
    #[error("node '{node}' depends on unknown name '{dependency}'")]
    UnresolvedDependency {
        /// The dependent node.
        node: String,
        /// The unresolved name.
        dependency: String,
    },

    /// A declared parameter type does not accept the upstream output type.
    #[error("node '{node}' expects '{dependency}' as {expected}, but it produces {found}")]
    TypeMismatch {
        /// The dependent node.
        node: String,
        /// The dependency name.
        dependency: String,
        /// Type declared on the parameter.
        expected: ValueType,
        /// Type declared by the upstream node or external input.
        found: ValueType,
    },

    /// A descriptor sets a tag key written by the framework itself.
    #[error("node '{node}' sets reserved tag key '{key}'")]
    ReservedTag {
        /// The offending node.
        node: String,
        /// The reserved key.
        key: String,
    },

    /// The dependency graph contains a cycle.
    #[error("cycle detected: {}", path.join(" -> "))]
    CycleDetected {
        /// Node names along the cycle; the first name is repeated at the end.
        path: Vec<String>,
    },
}

/// A decorator could not be applied to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decorator '{decorator}' cannot be applied to node '{node}': {reason}")]
pub struct DecoratorApplicationError {
    /// Name of the decorator.
    pub decorator: String,
    /// Name of the node being decorated.
    pub node: String,
    /// Why the decorator does not apply.
    pub reason: String,
}

impl DecoratorApplicationError {
    /// Creates a new decorator application error.
    pub fn new(
        decorator: impl Into<String>,
        node: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            decorator: decorator.into(),
            node: node.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while planning a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// A requested output is neither a node nor a declared input.
    #[error("requested output '{name}' is not in the graph")]
    UnknownOutput {
        /// The requested name.
        name: String,
    },

    /// A queried node does not exist.
    #[error("node '{name}' is not in the graph")]
    UnknownNode {
        /// The queried name.
        name: String,
    },

    /// A required external input was not provided.
    #[error("required input '{name}' not provided for nodes: {}", required_by.join(", "))]
    MissingInput {
        /// The missing input.
        name: String,
        /// Nodes of the subgraph that need it.
        required_by: Vec<String>,
    },

    /// A node of the subgraph depends on a name that cannot be satisfied.
    #[error("node '{node}' depends on '{dependency}', which is neither a node nor provided")]
    MissingDependency {
        /// The dependent node.
        node: String,
        /// The unsatisfiable name.
        dependency: String,
    },

    /// A runtime input clashes with a build-time config value.
    #[error("input '{name}' conflicts with a config value of the same name")]
    ConflictsWithConfig {
        /// The conflicting name.
        name: String,
    },

    /// A typed external input received a value of another type.
    #[error("input '{name}' expected {expected}, got {found}")]
    InputTypeMismatch {
        /// The input name.
        name: String,
        /// Declared type.
        expected: ValueType,
        /// Type of the provided value.
        found: ValueType,
    },
}

/// A `Fail` validator rejected a computed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation of '{target}' failed in '{validator}': {message}")]
pub struct ValidationError {
    /// Name of the validator node.
    pub validator: String,
    /// Name of the checked node.
    pub target: String,
    /// Message reported by the validator.
    pub message: String,
}

/// Errors raised while executing node callables.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A node callable returned an error.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        /// The failing node.
        node: String,
        /// The callable's error.
        #[source]
        source: BoxedError,
    },

    /// A node value was written twice within one execution.
    #[error("value for '{node}' was already recorded")]
    AlreadyRecorded {
        /// The node written twice.
        node: String,
    },

    /// A dependency value was not available when the node ran.
    #[error("node '{node}' ran before '{dependency}' was available")]
    MissingValue {
        /// The dependent node.
        node: String,
        /// The unavailable dependency.
        dependency: String,
    },

    /// A worker running a node panicked.
    #[error("worker running node '{node}' panicked: {message}")]
    WorkerPanicked {
        /// The node being run.
        node: String,
        /// Panic or join error description.
        message: String,
    },

    /// A persisted cache entry could not be read or written.
    #[error("cache access for node '{node}' at {} failed: {source}", path.display())]
    CacheAccess {
        /// The cached node.
        node: String,
        /// The cache file.
        path: PathBuf,
        /// The reader or writer error.
        #[source]
        source: BoxedError,
    },

    /// Execution was cancelled before completion.
    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Wraps a callable error for `node`.
    pub fn node_failed(node: impl Into<String>, source: BoxedError) -> Self {
        Self::NodeFailed {
            node: node.into(),
            source,
        }
    }
}

/// Errors raised while assembling a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultBuildError {
    /// A requested output is absent from the execution context.
    #[error("requested output '{name}' was not produced")]
    MissingOutput {
        /// The missing name.
        name: String,
    },

    /// A value cannot be used as a table column.
    #[error("output '{name}' is {found}, not column-like")]
    NotColumnar {
        /// The offending output.
        name: String,
        /// Its type.
        found: ValueType,
    },

    /// Column lengths differ and the policy forbids padding.
    #[error("column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        /// The offending column.
        name: String,
        /// Length of the longest column.
        expected: usize,
        /// Length of this column.
        found: usize,
    },

    /// A single-value builder received another number of outputs.
    #[error("expected exactly one output, got {count}")]
    ExpectedSingleOutput {
        /// Number of outputs received.
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_snake_case() {
        let error = Error::from(PlanningError::UnknownOutput { name: "x".into() });
        assert_eq!(error.kind(), ErrorKind::Planning);
        assert_eq!(error.kind_str(), "planning");

        let error = Error::Timeout(Duration::from_secs(1));
        assert_eq!(error.kind_str(), "timeout");
    }

    #[test]
    fn cycle_message_lists_the_path() {
        let error = GraphConstructionError::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(error.to_string(), "cycle detected: a -> b -> a");
    }

    #[test]
    fn node_failure_keeps_the_source() {
        let error = ExecutionError::node_failed("b", "boom".into());
        assert_eq!(error.to_string(), "node 'b' failed: boom");
        assert!(std::error::Error::source(&error).is_some());
    }
}
