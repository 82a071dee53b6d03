use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use nodeflow_core::{BoxedError, Importance, Node, Value, ValueMap};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use super::{
    ExecutionContext, GraphAdapter, ParallelConfig, TRACING_TARGET, halt_on_failed_check,
    planned_node,
};
use crate::error::{Error, ExecutionError, Result};
use crate::graph::FunctionGraph;
use crate::planner::ExecutionPlan;

/// Executes independent nodes concurrently on blocking worker threads.
///
/// A node is dispatched once every dependency it has in the plan is recorded
/// and every `Fail` validator of those dependencies has passed, so a failed
/// check never feeds downstream nodes. The coordinating task is the only writer of the execution context, and the
/// join of a node's task is its single completion signal. After the first
/// failure no further node is dispatched; running nodes are drained before
/// the error is returned.
#[derive(Debug, Clone, Default)]
pub struct ParallelAdapter {
    config: ParallelConfig,
    cancellation: Option<CancellationToken>,
}

impl ParallelAdapter {
    /// Creates a parallel adapter.
    pub fn new(config: ParallelConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Stops dispatching new nodes once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }
}

/// Dependency bookkeeping for the steps of one plan.
struct Schedule<'p> {
    nodes: HashMap<&'p str, &'p Node>,
    pending: HashMap<&'p str, usize>,
    dependents: HashMap<&'p str, Vec<&'p str>>,
    ready: VecDeque<&'p str>,
}

impl<'p> Schedule<'p> {
    fn new(plan: &'p ExecutionPlan, graph: &'p FunctionGraph) -> Result<Self> {
        let planned: HashSet<&str> = plan.steps().iter().map(String::as_str).collect();

        // Fail validators of each planned target.
        let mut gates: HashMap<&str, Vec<&str>> = HashMap::new();
        for name in plan.steps() {
            let binding = planned_node(graph, name)?.validator_binding();
            if let Some(binding) = binding
                && binding.importance == Importance::Fail
                && planned.contains(binding.target.as_str())
            {
                gates
                    .entry(binding.target.as_str())
                    .or_default()
                    .push(name.as_str());
            }
        }

        let mut nodes = HashMap::with_capacity(plan.len());
        let mut pending = HashMap::with_capacity(plan.len());
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut ready = VecDeque::new();

        for name in plan.steps() {
            let node = planned_node(graph, name)?;
            let mut dependencies: BTreeSet<&str> = node
                .dependencies()
                .iter()
                .map(|dependency| dependency.name.as_str())
                .filter(|dependency| planned.contains(dependency))
                .collect();
            if !node.is_validator() {
                let checks: Vec<&str> = dependencies
                    .iter()
                    .filter_map(|dependency| gates.get(dependency))
                    .flatten()
                    .copied()
                    .collect();
                dependencies.extend(checks);
            }

            if dependencies.is_empty() {
                ready.push_back(name.as_str());
            }
            for dependency in &dependencies {
                dependents.entry(*dependency).or_default().push(name.as_str());
            }
            pending.insert(name.as_str(), dependencies.len());
            nodes.insert(name.as_str(), node);
        }

        Ok(Self {
            nodes,
            pending,
            dependents,
            ready,
        })
    }

    /// Marks `name` as recorded and queues the dependents it unblocked.
    fn complete(&mut self, name: &str) {
        let Some(dependents) = self.dependents.get(name) else {
            return;
        };
        for dependent in dependents {
            if let Some(count) = self.pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    self.ready.push_back(*dependent);
                }
            }
        }
    }
}

type WorkerOutput = (String, std::result::Result<Value, BoxedError>);

#[async_trait]
impl GraphAdapter for ParallelAdapter {
    fn name(&self) -> &'static str {
        "parallel"
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        graph: &FunctionGraph,
        inputs: &ValueMap,
    ) -> Result<ExecutionContext> {
        self.config.validate()?;
        let mut context = ExecutionContext::seeded(inputs);
        let mut schedule = Schedule::new(plan, graph)?;

        let cancel = match &self.cancellation {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut workers: JoinSet<WorkerOutput> = JoinSet::new();
        let mut running: HashMap<Id, String> = HashMap::new();
        let mut failure: Option<Error> = None;

        tracing::debug!(
            target: TRACING_TARGET,
            step_count = plan.len(),
            max_workers = self.config.max_workers,
            "Starting parallel execution"
        );

        loop {
            while !cancel.is_cancelled()
                && let Some(name) = schedule.ready.pop_front()
            {
                let Some(node) = schedule.nodes.get(name).copied() else {
                    continue;
                };
                let arguments = match context.inputs_for(node) {
                    Ok(arguments) => arguments,
                    Err(error) => {
                        failure.get_or_insert(error.into());
                        cancel.cancel();
                        break;
                    }
                };
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(error) => {
                        failure.get_or_insert(Error::Internal(format!("semaphore closed: {error}")));
                        cancel.cancel();
                        break;
                    }
                };

                let callable = node.callable().clone();
                let owned = name.to_owned();
                tracing::trace!(target: TRACING_TARGET, node = name, "Dispatching node");

                let handle = workers.spawn_blocking(move || {
                    let _permit = permit;
                    let result = callable(&arguments);
                    (owned, result)
                });
                running.insert(handle.id(), name.to_owned());
            }

            let Some(joined) = workers.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, (name, Ok(value)))) => {
                    running.remove(&id);
                    if cancel.is_cancelled() {
                        continue;
                    }
                    let Some(node) = schedule.nodes.get(name.as_str()).copied() else {
                        continue;
                    };

                    tracing::trace!(target: TRACING_TARGET, node = %name, "Node completed");
                    let outcome = match halt_on_failed_check(node, &value) {
                        Ok(()) => context.record(name.clone(), value).map_err(Error::from),
                        Err(error) => Err(Error::from(error)),
                    };

                    match outcome {
                        Ok(()) => schedule.complete(&name),
                        Err(error) => {
                            failure.get_or_insert(error);
                            cancel.cancel();
                        }
                    }
                }
                Ok((id, (name, Err(source)))) => {
                    running.remove(&id);
                    failure.get_or_insert(ExecutionError::node_failed(name, source).into());
                    cancel.cancel();
                }
                Err(error) => {
                    let node = running.remove(&error.id()).unwrap_or_default();
                    failure.get_or_insert(
                        ExecutionError::WorkerPanicked {
                            node,
                            message: error.to_string(),
                        }
                        .into(),
                    );
                    cancel.cancel();
                }
            }
        }

        if let Some(error) = failure {
            tracing::debug!(
                target: TRACING_TARGET,
                error = %error,
                "Parallel execution stopped"
            );
            return Err(error);
        }
        if context.computed().len() < plan.len() {
            return Err(ExecutionError::Cancelled.into());
        }

        Ok(context)
    }
}
