//! The driver: end-user entry point for executing a function graph.
//!
//! A driver call plans the request, runs the plan through the configured
//! [`GraphAdapter`], inspects validator outcomes and hands the requested
//! outputs to a [`ResultBuilder`]. Calls share nothing but the immutable
//! graph and the adapter.

mod builder;
mod config;
mod output;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

pub use builder::DriverBuilder;
pub use config::{DEFAULT_MAX_CONCURRENT_RUNS, DriverConfig, DriverConfigBuilder, DriverConfigBuilderError};
use nodeflow_core::{Importance, Node, Value, ValueMap, ValueType};
pub use output::{DriverOutput, RawOutput, ValidationWarning};
use serde_json::Map;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::adapter::{ExecutionContext, GraphAdapter};
use crate::error::{Error, PlanningError, Result, ValidationError};
use crate::graph::{FunctionGraph, Variable};
use crate::planner::{ExecutionPlan, Planner};
use crate::result::{DictResult, Outputs, ResultBuilder};
use crate::validator::failed_check;

/// Tracing target for driver operations.
const TRACING_TARGET: &str = "nodeflow_runtime::driver";

/// Executes requests against an immutable function graph.
///
/// Cloning a driver is cheap; clones share the graph, the adapter and the
/// limit on concurrent executions.
#[derive(Debug, Clone)]
pub struct Driver {
    graph: Arc<FunctionGraph>,
    adapter: Arc<dyn GraphAdapter>,
    config: DriverConfig,
    permits: Arc<Semaphore>,
}

impl Driver {
    /// Creates a driver over a built graph.
    ///
    /// Fails with [`Error::Configuration`] if `config` sets a zero limit.
    pub fn new(
        graph: FunctionGraph,
        adapter: Arc<dyn GraphAdapter>,
        config: DriverConfig,
    ) -> Result<Self> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent_runs));

        tracing::info!(
            target: TRACING_TARGET,
            node_count = graph.node_count(),
            adapter = adapter.name(),
            max_concurrent_runs = config.max_concurrent_runs,
            execution_timeout_secs = config.execution_timeout_secs,
            "Driver initialized"
        );

        Ok(Self {
            graph: Arc::new(graph),
            adapter,
            config,
            permits,
        })
    }

    /// Returns a builder.
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Returns the function graph.
    pub fn graph(&self) -> &FunctionGraph {
        &self.graph
    }

    /// Returns the execution adapter.
    pub fn adapter(&self) -> &dyn GraphAdapter {
        self.adapter.as_ref()
    }

    /// Returns the driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Computes `requested` and returns them as a JSON object.
    pub async fn execute<I, S>(
        &self,
        requested: I,
        inputs: ValueMap,
    ) -> Result<DriverOutput<Map<String, Value>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute_with(requested, inputs, &DictResult).await
    }

    /// Computes `requested` and assembles them with `builder`.
    pub async fn execute_with<B, I, S>(
        &self,
        requested: I,
        inputs: ValueMap,
        builder: &B,
    ) -> Result<DriverOutput<B::Output>>
    where
        B: ResultBuilder + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw = self.raw_execute(requested, inputs).await?;
        let result = builder.build(raw.outputs).inspect_err(|error| {
            tracing::warn!(
                target: TRACING_TARGET,
                run_id = %raw.run_id,
                error = %error,
                "Result build failed"
            );
        })?;

        Ok(DriverOutput {
            run_id: raw.run_id,
            result,
            warnings: raw.warnings,
        })
    }

    /// Computes `requested` without running a result builder.
    pub async fn raw_execute<I, S>(&self, requested: I, inputs: ValueMap) -> Result<RawOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let run_id = Uuid::now_v7();
        let requested = deduplicate(requested);

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Internal(format!("semaphore closed: {e}")))?;

        let started = Instant::now();
        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run_id,
            adapter = self.adapter.name(),
            requested = ?requested,
            "Starting execution"
        );

        let result = self.run(run_id, &requested, inputs).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(raw) => tracing::info!(
                target: TRACING_TARGET,
                run_id = %run_id,
                step_count = raw.plan.len(),
                warning_count = raw.warnings.len(),
                elapsed_ms,
                "Execution completed"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET,
                run_id = %run_id,
                error_kind = error.kind_str(),
                error = %error,
                elapsed_ms,
                "Execution failed"
            ),
        }
        result
    }

    /// Plans `requested` against `inputs` without executing anything.
    ///
    /// Runs every check an execution would run before the adapter starts.
    pub fn validate_execution<I, S>(&self, requested: I, inputs: ValueMap) -> Result<ExecutionPlan>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested = deduplicate(requested);
        let provided = self.resolve_inputs(inputs)?;
        Ok(Planner::new(&self.graph).plan(&requested, &provided)?)
    }

    /// Returns every node and external input of the graph.
    pub fn list_available_variables(&self) -> Vec<Variable> {
        self.graph.variables()
    }

    /// Returns the given nodes and everything they depend on.
    pub fn what_is_upstream_of(&self, names: &[&str]) -> Result<Vec<Variable>> {
        Ok(variables(self.graph.upstream_of(names)?))
    }

    /// Returns the given nodes and everything depending on them.
    pub fn what_is_downstream_of(&self, names: &[&str]) -> Result<Vec<Variable>> {
        Ok(variables(self.graph.downstream_of(names)?))
    }

    /// Returns the nodes on any path from `from` to `to`.
    pub fn what_is_the_path_between(&self, from: &str, to: &str) -> Result<Vec<Variable>> {
        Ok(variables(self.graph.path_between(from, to)?))
    }

    async fn run(&self, run_id: Uuid, requested: &[String], inputs: ValueMap) -> Result<RawOutput> {
        let provided = self.resolve_inputs(inputs)?;
        let plan = Planner::new(&self.graph).plan(requested, &provided)?;

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = %run_id,
            step_count = plan.len(),
            satisfied = ?plan.satisfied(),
            "Plan ready"
        );

        let started = Instant::now();
        let execution = self.adapter.execute(&plan, &self.graph, &provided);
        let context = match self.config.execution_timeout() {
            Some(limit) => {
                let context = tokio::time::timeout(limit, execution)
                    .await
                    .map_err(|_| Error::Timeout(limit))??;
                // A node that overruns the budget can finish within a single poll.
                if started.elapsed() > limit {
                    return Err(Error::Timeout(limit));
                }
                context
            }
            None => execution.await?,
        };

        let warnings = self.inspect(run_id, &plan, &context)?;
        let outputs = Outputs::collect(requested, &context)?;

        Ok(RawOutput {
            run_id,
            outputs,
            warnings,
            plan,
        })
    }

    /// Merges config into the inputs and checks declared input types.
    fn resolve_inputs(&self, inputs: ValueMap) -> Result<ValueMap, PlanningError> {
        let mut names: Vec<&String> = inputs.keys().collect();
        names.sort();

        for name in &names {
            if self.graph.config_value(name).is_some() {
                return Err(PlanningError::ConflictsWithConfig {
                    name: (*name).clone(),
                });
            }

            let declared = self
                .graph
                .external_input(name)
                .and_then(|input| input.value_type)
                .or_else(|| self.graph.node(name).and_then(Node::output_type));
            if let Some(expected) = declared
                && let Some(value) = inputs.get(*name)
                && !expected.accepts(value)
            {
                return Err(PlanningError::InputTypeMismatch {
                    name: (*name).clone(),
                    expected,
                    found: ValueType::of(value),
                });
            }
        }

        let mut merged = self.graph.config().clone();
        merged.extend(inputs);
        Ok(merged)
    }

    /// Collects validator outcomes: `Fail` failures abort, `Warn` failures
    /// become warnings.
    fn inspect(
        &self,
        run_id: Uuid,
        plan: &ExecutionPlan,
        context: &ExecutionContext,
    ) -> Result<Vec<ValidationWarning>, ValidationError> {
        let mut warnings = Vec::new();

        for name in plan.steps() {
            let (Some(node), Some(value)) = (self.graph.node(name), context.get(name)) else {
                continue;
            };
            let Some((binding, outcome)) = failed_check(node, value) else {
                continue;
            };

            match binding.importance {
                Importance::Fail => {
                    return Err(ValidationError {
                        validator: name.clone(),
                        target: binding.target.clone(),
                        message: outcome.message,
                    });
                }
                Importance::Warn => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        run_id = %run_id,
                        validator = %name,
                        node = %binding.target,
                        message = %outcome.message,
                        "Validation warning"
                    );
                    warnings.push(ValidationWarning {
                        validator: name.clone(),
                        target: binding.target.clone(),
                        message: outcome.message,
                    });
                }
            }
        }

        Ok(warnings)
    }
}

/// Converts requested names, dropping repeats and keeping first occurrences.
fn deduplicate<I, S>(requested: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    requested
        .into_iter()
        .map(Into::into)
        .filter(|name: &String| seen.insert(name.clone()))
        .collect()
}

fn variables(nodes: Vec<&Node>) -> Vec<Variable> {
    nodes.into_iter().map(Variable::from).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nodeflow_test::{CallCounter, MockValidator, init_tracing};
    use serde_json::json;

    use super::*;
    use crate::adapter::{
        CacheConfig, CachingAdapter, ParallelAdapter, ParallelConfig, SequentialAdapter,
    };
    use crate::decorator::{CheckOutput, CheckOutputCustom};
    use crate::error::ExecutionError;
    use crate::function::{FunctionDef, Param};
    use crate::result::{SingleValueResult, TableResult};

    fn a_plus_one() -> DriverBuilder {
        Driver::builder()
            .with_function(FunctionDef::new("a", Vec::new(), |_| Ok(json!(5))))
            .with_function(FunctionDef::new("b", vec![Param::new("a")], |inputs| {
                Ok(json!(inputs.get_i64("a")? + 1))
            }))
    }

    fn slow_driver(adapter: Arc<dyn GraphAdapter>) -> Driver {
        let config = DriverConfigBuilder::default()
            .execution_timeout_secs(1_u64)
            .build()
            .unwrap();
        Driver::builder()
            .with_function(FunctionDef::new("slow", Vec::new(), |_| {
                std::thread::sleep(Duration::from_millis(1500));
                Ok(json!(1))
            }))
            .with_shared_adapter(adapter)
            .with_driver_config(config)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn computes_requested_outputs() {
        init_tracing();
        let driver = a_plus_one().build().unwrap();
        let output = driver.execute(["b"], ValueMap::new()).await.unwrap();
        assert_eq!(output.into_result().get("b"), Some(&json!(6)));
    }

    #[tokio::test]
    async fn failing_checks_abort_the_call() {
        let driver = Driver::builder()
            .with_function(
                FunctionDef::new("c", Vec::new(), |_| Ok(json!(150)))
                    .decorate(CheckOutput::new().range(0.0, 100.0)),
            )
            .build()
            .unwrap();

        match driver.execute(["c"], ValueMap::new()).await {
            Err(Error::Validation(error)) => {
                assert_eq!(error.target, "c");
                assert_eq!(error.message, "150 is outside [0, 100]");
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provided_values_short_circuit_nodes() {
        let calls = CallCounter::new();
        let counted = calls.clone();
        let driver = Driver::builder()
            .with_function(FunctionDef::new("a", Vec::new(), move |_| {
                counted.hit();
                Ok(json!(5))
            }))
            .build()
            .unwrap();

        let inputs = ValueMap::from([("a".to_owned(), json!(42))]);
        let output = driver.execute(["a"], inputs).await.unwrap();

        assert_eq!(output.result.get("a"), Some(&json!(42)));
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn parallel_joins_see_both_inputs() {
        let driver = Driver::builder()
            .with_function(FunctionDef::new("x", Vec::new(), |_| Ok(json!(1))))
            .with_function(FunctionDef::new("y", Vec::new(), |_| Ok(json!(2))))
            .with_function(FunctionDef::new(
                "z",
                vec![Param::new("x"), Param::new("y")],
                |inputs| Ok(json!(inputs.get_i64("x")? * 10 + inputs.get_i64("y")?)),
            ))
            .with_adapter(ParallelAdapter::new(ParallelConfig::default()))
            .build()
            .unwrap();

        let value = driver
            .execute_with(["z"], ValueMap::new(), &SingleValueResult)
            .await
            .unwrap()
            .into_result();
        assert_eq!(value, json!(12));
    }

    #[tokio::test]
    async fn warnings_are_reported_with_the_result() {
        let driver = a_plus_one()
            .with_function(
                FunctionDef::new("c", vec![Param::new("b")], |inputs| {
                    Ok(json!(inputs.get_i64("b")?))
                })
                .decorate(
                    CheckOutputCustom::default()
                        .with_validator(MockValidator::failing("odd").with_importance(Importance::Warn)),
                ),
            )
            .build()
            .unwrap();

        let output = driver
            .execute(["c"], ValueMap::new())
            .await
            .expect("warn validators must not abort the call");

        assert!(output.has_warnings());
        assert_eq!(
            output.warnings,
            [ValidationWarning {
                validator: "c_mock_validator".into(),
                target: "c".into(),
                message: "odd".into(),
            }]
        );
        assert_eq!(output.result.get("c"), Some(&json!(6)));
    }

    #[tokio::test]
    async fn repeated_calls_are_idempotent() {
        let driver = a_plus_one().build().unwrap();
        let first = driver.execute(["b", "a", "b"], ValueMap::new()).await.unwrap();
        let second = driver.execute(["b", "a"], ValueMap::new()).await.unwrap();

        let first = first.into_result();
        assert_eq!(first, second.into_result());
        let names: Vec<&String> = first.keys().collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn config_values_feed_nodes_and_reject_overrides() {
        let driver = Driver::builder()
            .with_function(FunctionDef::new("scaled", vec![Param::new("factor")], |inputs| {
                Ok(json!(inputs.get_i64("factor")? * 3))
            }))
            .with_config("factor", json!(2))
            .build()
            .unwrap();

        let output = driver.execute(["scaled"], ValueMap::new()).await.unwrap();
        assert_eq!(output.result.get("scaled"), Some(&json!(6)));

        let clash = ValueMap::from([("factor".to_owned(), json!(3))]);
        assert!(matches!(
            driver.execute(["scaled"], clash).await,
            Err(Error::Planning(PlanningError::ConflictsWithConfig { .. }))
        ));
    }

    #[tokio::test]
    async fn typed_inputs_are_checked() {
        let driver = Driver::builder()
            .with_function(FunctionDef::new("echo", vec![Param::new("n")], |inputs| {
                Ok(inputs.get("n")?.clone())
            }))
            .with_external_input(crate::graph::ExternalInput::new("n").with_type(ValueType::Integer))
            .build()
            .unwrap();

        let inputs = ValueMap::from([("n".to_owned(), json!("seven"))]);
        let error = driver.validate_execution(["echo"], inputs).unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Planning);

        let inputs = ValueMap::from([("n".to_owned(), json!(7))]);
        let plan = driver.validate_execution(["echo"], inputs).unwrap();
        assert_eq!(plan.steps(), ["echo"]);
    }

    #[tokio::test]
    async fn table_results_merge_columns() {
        let driver = Driver::builder()
            .with_function(FunctionDef::new("ids", Vec::new(), |_| Ok(json!([1, 2, 3]))))
            .with_function(FunctionDef::new("scores", vec![Param::new("ids")], |inputs| {
                let ids = inputs.get_array("ids")?;
                Ok(json!(ids.iter().filter_map(Value::as_i64).map(|id| id * 10).collect::<Vec<_>>()))
            }))
            .build()
            .unwrap();

        let table = driver
            .execute_with(["ids", "scores"], ValueMap::new(), &TableResult::new())
            .await
            .unwrap()
            .into_result();
        assert_eq!(table.row_count(), 3);
        let row = table.row(2).expect("third row should exist");
        assert_eq!(row.get("scores"), Some(&json!(30)));
    }

    #[tokio::test]
    async fn node_failures_carry_the_node_name() {
        let driver = Driver::builder()
            .with_function(FunctionDef::new("broken", Vec::new(), |_| Err("boom".into())))
            .build()
            .unwrap();

        match driver.execute(["broken"], ValueMap::new()).await {
            Err(Error::Execution(ExecutionError::NodeFailed { node, .. })) => {
                assert_eq!(node, "broken");
            }
            other => panic!("expected a node failure, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_executions_time_out() {
        let driver = slow_driver(Arc::new(ParallelAdapter::default()));
        let result = driver.execute(["slow"], ValueMap::new()).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn sequential_executions_respect_the_timeout() {
        let driver = slow_driver(Arc::new(SequentialAdapter));
        let result = driver.execute(["slow"], ValueMap::new()).await;
        assert!(matches!(result, Err(Error::Timeout(limit)) if limit == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn caching_executions_respect_the_timeout() {
        let driver = slow_driver(Arc::new(CachingAdapter::new(CacheConfig::default())));
        let result = driver.execute(["slow"], ValueMap::new()).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn timeouts_stop_at_the_next_node() {
        let calls = CallCounter::new();
        let counted = calls.clone();
        let config = DriverConfigBuilder::default()
            .execution_timeout_secs(1_u64)
            .build()
            .unwrap();
        let driver = Driver::builder()
            .with_function(FunctionDef::new("slow", Vec::new(), |_| {
                std::thread::sleep(Duration::from_millis(1500));
                Ok(json!(1))
            }))
            .with_function(FunctionDef::new("after", vec![Param::new("slow")], move |_| {
                counted.hit();
                Ok(json!(2))
            }))
            .with_driver_config(config)
            .build()
            .unwrap();

        let result = driver.execute(["after"], ValueMap::new()).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(calls.count(), 0);
    }

    #[test]
    fn deserialized_zero_limits_are_rejected() {
        let config: DriverConfig = serde_json::from_str(r#"{"max_concurrent_runs":0}"#).unwrap();
        let result = a_plus_one().with_driver_config(config).build();
        assert!(matches!(result, Err(Error::Configuration(_))));

        let config: DriverConfig = serde_json::from_str(r#"{"execution_timeout_secs":0}"#).unwrap();
        let graph = a_plus_one().build().unwrap().graph().clone();
        let result = Driver::new(graph, Arc::new(SequentialAdapter), config);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn adapters_can_only_be_set_once() {
        let result = a_plus_one()
            .with_adapter(ParallelAdapter::default())
            .with_adapter(ParallelAdapter::default())
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn introspection_queries_follow_edges() {
        let driver = a_plus_one()
            .with_function(FunctionDef::new("c", vec![Param::new("b")], |_| Ok(json!(0))))
            .build()
            .unwrap();

        let names = |variables: Result<Vec<Variable>>| -> Vec<String> {
            variables.unwrap().into_iter().map(|v| v.name).collect()
        };

        assert_eq!(driver.list_available_variables().len(), 3);
        assert_eq!(names(driver.what_is_upstream_of(&["b"])), ["a", "b"]);
        assert_eq!(names(driver.what_is_downstream_of(&["b"])), ["b", "c"]);
        assert_eq!(
            names(driver.what_is_the_path_between("a", "c")),
            ["a", "b", "c"]
        );
        assert!(driver.what_is_upstream_of(&["missing"]).is_err());
    }
}
