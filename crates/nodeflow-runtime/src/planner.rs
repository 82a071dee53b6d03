//! Execution planning.
//!
//! A plan is the minimal set of nodes needed to produce the requested
//! outputs, ordered so that every node comes after its dependencies. Ties
//! are broken by discovery order, so the same request always yields the same
//! plan.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

use nodeflow_core::ValueMap;

use crate::error::PlanningError;
use crate::graph::FunctionGraph;

/// Tracing target for planning.
const TRACING_TARGET: &str = "nodeflow_runtime::planner";

/// Ordered node names to execute for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    steps: Vec<String>,
    satisfied: Vec<String>,
    requested: Vec<String>,
}

impl ExecutionPlan {
    /// Returns the nodes to execute, dependencies first.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Returns the names satisfied by provided inputs, in discovery order.
    pub fn satisfied(&self) -> &[String] {
        &self.satisfied
    }

    /// Returns the requested outputs.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// Returns whether `name` will be executed.
    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|step| step == name)
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns whether nothing needs to be executed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A pending visit of the backward walk.
struct Visit<'a> {
    name: &'a str,
    required_by: Option<&'a str>,
    optional: bool,
}

/// Computes execution plans over a function graph.
pub struct Planner<'a> {
    graph: &'a FunctionGraph,
}

impl<'a> Planner<'a> {
    /// Creates a planner for `graph`.
    pub fn new(graph: &'a FunctionGraph) -> Self {
        Self { graph }
    }

    /// Plans the execution of `requested` given `provided` inputs.
    pub fn plan(
        &self,
        requested: &[String],
        provided: &ValueMap,
    ) -> Result<ExecutionPlan, PlanningError> {
        let mut queue = VecDeque::with_capacity(requested.len());
        for name in requested {
            if !self.graph.contains_node(name) && !self.graph.is_external_input(name) {
                return Err(PlanningError::UnknownOutput { name: name.clone() });
            }
            queue.push_back(Visit {
                name,
                required_by: None,
                optional: false,
            });
        }

        let mut discovered: Vec<&'a str> = Vec::new();
        let mut discovery: HashMap<&'a str, usize> = HashMap::new();
        let mut satisfied: Vec<String> = Vec::new();
        let mut missing: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        while let Some(visit) = queue.pop_front() {
            if provided.contains_key(visit.name) {
                if !satisfied.iter().any(|name| name == visit.name) {
                    satisfied.push(visit.name.to_owned());
                }
                continue;
            }

            if let Some(node) = self.graph.node(visit.name) {
                if discovery.contains_key(node.name()) {
                    continue;
                }
                discovery.insert(node.name(), discovered.len());
                discovered.push(node.name());

                for dependency in node.dependencies() {
                    queue.push_back(Visit {
                        name: &dependency.name,
                        required_by: Some(node.name()),
                        optional: dependency.optional,
                    });
                }
                continue;
            }

            if visit.optional {
                continue;
            }

            match visit.required_by {
                None => {
                    return Err(PlanningError::MissingInput {
                        name: visit.name.to_owned(),
                        required_by: Vec::new(),
                    });
                }
                Some(node) if self.graph.is_external_input(visit.name) => {
                    missing.entry(visit.name).or_default().insert(node);
                }
                Some(node) => {
                    return Err(PlanningError::MissingDependency {
                        node: node.to_owned(),
                        dependency: visit.name.to_owned(),
                    });
                }
            }
        }

        if let Some((name, required_by)) = missing.into_iter().next() {
            return Err(PlanningError::MissingInput {
                name: name.to_owned(),
                required_by: required_by.into_iter().map(str::to_owned).collect(),
            });
        }

        self.add_validators(&mut discovered, &mut discovery, provided);
        let steps = self.order(&discovered, &discovery);

        tracing::debug!(
            target: TRACING_TARGET,
            requested = requested.len(),
            step_count = steps.len(),
            satisfied_count = satisfied.len(),
            "Execution planned"
        );

        Ok(ExecutionPlan {
            steps,
            satisfied,
            requested: requested.to_vec(),
        })
    }

    /// Appends the validators of every node that will be computed.
    fn add_validators(
        &self,
        discovered: &mut Vec<&'a str>,
        discovery: &mut HashMap<&'a str, usize>,
        provided: &ValueMap,
    ) {
        let computed = discovered.clone();
        for target in computed {
            for validator in self.graph.validators_of(target) {
                let Some(node) = self.graph.node(validator) else {
                    continue;
                };
                if discovery.contains_key(node.name()) || provided.contains_key(node.name()) {
                    continue;
                }

                let runnable = node.dependencies().iter().all(|dependency| {
                    dependency.optional
                        || discovery.contains_key(dependency.name.as_str())
                        || provided.contains_key(&dependency.name)
                });
                if runnable {
                    discovery.insert(node.name(), discovered.len());
                    discovered.push(node.name());
                }
            }
        }
    }

    /// Kahn's algorithm, breaking ties by discovery index.
    fn order(&self, discovered: &[&'a str], discovery: &HashMap<&'a str, usize>) -> Vec<String> {
        let mut indegree = vec![0_usize; discovered.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); discovered.len()];

        for (index, name) in discovered.iter().enumerate() {
            let Some(node) = self.graph.node(name) else {
                continue;
            };
            let dependencies: HashSet<usize> = node
                .dependencies()
                .iter()
                .filter_map(|dependency| discovery.get(dependency.name.as_str()).copied())
                .collect();

            indegree[index] = dependencies.len();
            for dependency in dependencies {
                dependents[dependency].push(index);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut steps = Vec::with_capacity(discovered.len());
        while let Some(Reverse(index)) = ready.pop() {
            steps.push(discovered[index].to_owned());
            for &dependent in &dependents[index] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        debug_assert_eq!(steps.len(), discovered.len(), "function graphs are acyclic");
        steps
    }
}

#[cfg(test)]
mod tests {
    use nodeflow_core::Value;
    use serde_json::json;

    use super::*;
    use crate::decorator::CheckOutput;
    use crate::function::{FunctionDef, Param};
    use crate::graph::GraphBuilder;

    fn depends(name: &str, deps: &[&str]) -> FunctionDef {
        let params = deps.iter().map(|d| Param::new(*d)).collect();
        FunctionDef::new(name, params, |_| Ok(Value::Null))
    }

    fn request(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn graph() -> FunctionGraph {
        GraphBuilder::new()
            .with_function(depends("a", &[]))
            .with_function(depends("b", &["a"]))
            .with_function(depends("c", &["a", "x"]).decorate(CheckOutput::new().not_null()))
            .with_function(depends("d", &["b", "c"]))
            .with_function(depends("unrelated", &["a"]))
            .with_external_input("x")
            .build()
            .unwrap()
    }

    #[test]
    fn plans_the_dependency_closure_in_order() {
        let graph = graph();
        let provided = ValueMap::from([("x".to_owned(), json!(1))]);
        let plan = Planner::new(&graph).plan(&request(&["d"]), &provided);

        let plan = plan.unwrap();
        assert_eq!(plan.steps(), ["a", "b", "c", "d", "c_not_null_validator"]);
        assert_eq!(plan.satisfied(), ["x"]);
        assert!(!plan.contains("unrelated"));
    }

    #[test]
    fn provided_outputs_are_not_executed() {
        let graph = graph();
        let provided = ValueMap::from([("a".to_owned(), json!(42))]);
        let plan = Planner::new(&graph)
            .plan(&request(&["a", "b"]), &provided)
            .unwrap();

        assert_eq!(plan.steps(), ["b"]);
        assert_eq!(plan.satisfied(), ["a"]);
    }

    #[test]
    fn validators_of_provided_values_are_skipped() {
        let graph = graph();
        let provided = ValueMap::from([("c".to_owned(), json!(1))]);
        let plan = Planner::new(&graph)
            .plan(&request(&["c"]), &provided)
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn missing_inputs_name_their_consumers() {
        let graph = graph();
        let result = Planner::new(&graph).plan(&request(&["d"]), &ValueMap::new());
        assert_eq!(
            result,
            Err(PlanningError::MissingInput {
                name: "x".into(),
                required_by: vec!["c".into()],
            })
        );
    }

    #[test]
    fn unknown_outputs_are_rejected() {
        let graph = graph();
        let result = Planner::new(&graph).plan(&request(&["zzz"]), &ValueMap::new());
        assert_eq!(
            result,
            Err(PlanningError::UnknownOutput { name: "zzz".into() })
        );
    }

    #[test]
    fn plans_are_deterministic() {
        let graph = graph();
        let provided = ValueMap::from([("x".to_owned(), json!(1))]);
        let planner = Planner::new(&graph);
        let first = planner.plan(&request(&["d", "unrelated"]), &provided);
        let second = planner.plan(&request(&["d", "unrelated"]), &provided);
        assert_eq!(first, second);
    }
}
