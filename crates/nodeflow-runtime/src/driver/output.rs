//! Driver call results.

use serde::Serialize;
use uuid::Uuid;

use crate::planner::ExecutionPlan;
use crate::result::Outputs;

/// A `Warn` validator that reported a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    /// Name of the validator node.
    pub validator: String,
    /// Name of the checked node.
    pub target: String,
    /// Message reported by the validator.
    pub message: String,
}

/// Result of a driver call.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOutput<T> {
    /// Identifier of the execution, used in logs.
    pub run_id: Uuid,
    /// Output of the result builder.
    pub result: T,
    /// Downgraded validation failures, in plan order.
    pub warnings: Vec<ValidationWarning>,
}

impl<T> DriverOutput<T> {
    /// Returns whether any `Warn` validator failed.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Discards the metadata and returns the built result.
    pub fn into_result(self) -> T {
        self.result
    }
}

/// Outputs of a driver call before any result builder ran.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    /// Identifier of the execution, used in logs.
    pub run_id: Uuid,
    /// Requested outputs in requested order.
    pub outputs: Outputs,
    /// Downgraded validation failures, in plan order.
    pub warnings: Vec<ValidationWarning>,
    /// The plan that was executed.
    pub plan: ExecutionPlan,
}
