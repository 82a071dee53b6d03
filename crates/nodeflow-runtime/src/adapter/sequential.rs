use std::time::Instant;

use async_trait::async_trait;
use nodeflow_core::ValueMap;

use super::{
    ExecutionContext, GraphAdapter, TRACING_TARGET, halt_on_failed_check, planned_node, run_node,
};
use crate::error::Result;
use crate::graph::FunctionGraph;
use crate::planner::ExecutionPlan;

/// Executes plan steps one at a time, in plan order.
///
/// Nodes run on the calling task; the adapter yields after each node.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialAdapter;

#[async_trait]
impl GraphAdapter for SequentialAdapter {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        graph: &FunctionGraph,
        inputs: &ValueMap,
    ) -> Result<ExecutionContext> {
        let mut context = ExecutionContext::seeded(inputs);

        for name in plan.steps() {
            let node = planned_node(graph, name)?;
            let started = Instant::now();
            let value = run_node(node, &context)?;

            tracing::trace!(
                target: TRACING_TARGET,
                node = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Node completed"
            );

            halt_on_failed_check(node, &value)?;
            context.record(name.clone(), value)?;
            tokio::task::yield_now().await;
        }

        Ok(context)
    }
}
