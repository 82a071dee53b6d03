//! Execution strategies.
//!
//! A [`GraphAdapter`] runs the steps of an [`ExecutionPlan`] and returns the
//! resulting [`ExecutionContext`]. The driver depends only on this trait:
//! - [`SequentialAdapter`]: plan order, one node at a time
//! - [`ParallelAdapter`]: tokio worker pool bounded by a semaphore
//! - [`CachingAdapter`]: sequential with memoization in memory or on disk
//!
//! Every adapter inspects a validator's outcome right after it runs and stops
//! on a failing `Fail` validator. Adapters yield to the runtime between
//! nodes so an execution timeout can stop them.

mod cache_format;
mod caching;
mod config;
mod context;
mod parallel;
mod sequential;

use std::fmt;

use async_trait::async_trait;
pub use cache_format::{CacheFormat, CacheReader, CacheWriter, DEFAULT_CACHE_FORMAT};
pub use caching::{CacheStats, CachingAdapter};
pub use config::{
    CacheConfig, CacheConfigBuilder, CacheConfigBuilderError, DEFAULT_CACHE_CAPACITY,
    DEFAULT_MAX_WORKERS, ParallelConfig, ParallelConfigBuilder, ParallelConfigBuilderError,
};
pub use context::ExecutionContext;
use nodeflow_core::{Importance, Node, Value, ValueMap};
pub use parallel::ParallelAdapter;
pub use sequential::SequentialAdapter;

use crate::error::{Error, ExecutionError, Result, ValidationError};
use crate::graph::FunctionGraph;
use crate::planner::ExecutionPlan;
use crate::validator::failed_check;

/// Tracing target for adapters.
const TRACING_TARGET: &str = "nodeflow_runtime::adapter";

/// A pluggable execution strategy.
#[async_trait]
pub trait GraphAdapter: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Executes the plan's steps against `graph`.
    ///
    /// `inputs` seed the returned context.
    async fn execute(
        &self,
        plan: &ExecutionPlan,
        graph: &FunctionGraph,
        inputs: &ValueMap,
    ) -> Result<ExecutionContext>;
}

/// Looks up a planned node.
fn planned_node<'g>(graph: &'g FunctionGraph, name: &str) -> Result<&'g Node> {
    graph
        .node(name)
        .ok_or_else(|| Error::Internal(format!("planned node '{name}' is not in the graph")))
}

/// Resolves the arguments of `node` and invokes it.
fn run_node(node: &Node, context: &ExecutionContext) -> Result<Value> {
    let inputs = context.inputs_for(node)?;
    let value = node
        .call(&inputs)
        .map_err(|source| ExecutionError::node_failed(node.name(), source))?;
    Ok(value)
}

/// Fails if `node` is a `Fail` validator whose output reports a failure.
fn halt_on_failed_check(node: &Node, value: &Value) -> Result<(), ValidationError> {
    match failed_check(node, value) {
        Some((binding, outcome)) if binding.importance == Importance::Fail => {
            tracing::debug!(
                target: TRACING_TARGET,
                validator = node.name(),
                node = %binding.target,
                message = %outcome.message,
                "Validation failed, halting execution"
            );
            Err(ValidationError {
                validator: node.name().to_owned(),
                target: binding.target.clone(),
                message: outcome.message,
            })
        }
        _ => Ok(()),
    }
}
