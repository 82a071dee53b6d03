//! Function graph runtime representation.

use std::collections::{BTreeMap, HashMap, HashSet};

use nodeflow_core::{Node, Value, ValueMap};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::input::ExternalInput;
use super::variable::Variable;
use crate::error::PlanningError;

/// An immutable, acyclic graph of nodes.
///
/// Edges point from a dependency to its dependent. Nodes are stored in
/// registration order, which is also the order of petgraph indices since
/// nodes are never removed after construction.
#[derive(Debug, Clone, Default)]
pub struct FunctionGraph {
    /// The underlying directed graph.
    graph: DiGraph<Node, ()>,
    /// Mapping from node name to petgraph's NodeIndex.
    node_indices: HashMap<String, NodeIndex>,
    /// Declared external inputs and config keys.
    external_inputs: BTreeMap<String, ExternalInput>,
    /// Build-time config values.
    config: ValueMap,
    /// Validator node names per checked node, in registration order.
    validators: HashMap<String, Vec<String>>,
}

impl FunctionGraph {
    /// Wires already-resolved nodes into a graph.
    pub(super) fn assemble(
        nodes: Vec<Node>,
        external_inputs: BTreeMap<String, ExternalInput>,
        config: ValueMap,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        let mut node_indices = HashMap::with_capacity(nodes.len());
        let mut validators: HashMap<String, Vec<String>> = HashMap::new();

        for node in nodes {
            if let Some(binding) = node.validator_binding() {
                validators
                    .entry(binding.target.clone())
                    .or_default()
                    .push(node.name().to_owned());
            }
            let name = node.name().to_owned();
            let index = graph.add_node(node);
            node_indices.insert(name, index);
        }

        let mut edges = HashSet::new();
        for to in graph.node_indices() {
            for dependency in graph[to].dependencies() {
                if let Some(&from) = node_indices.get(&dependency.name) {
                    edges.insert((from, to));
                }
            }
        }
        let mut edges: Vec<_> = edges.into_iter().collect();
        edges.sort_unstable();
        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        Self {
            graph,
            node_indices,
            external_inputs,
            config,
            validators,
        }
    }

    /// Returns the underlying petgraph graph.
    pub(crate) fn inner(&self) -> &DiGraph<Node, ()> {
        &self.graph
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        let index = self.node_indices.get(name)?;
        self.graph.node_weight(*index)
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Returns an iterator over all nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Returns a declared external input or config key.
    pub fn external_input(&self, name: &str) -> Option<&ExternalInput> {
        self.external_inputs.get(name)
    }

    /// Returns whether `name` is a declared external input or config key.
    pub fn is_external_input(&self, name: &str) -> bool {
        self.external_inputs.contains_key(name)
    }

    /// Returns an iterator over external inputs sorted by name.
    pub fn external_inputs(&self) -> impl Iterator<Item = &ExternalInput> {
        self.external_inputs.values()
    }

    /// Returns the build-time config values.
    pub fn config(&self) -> &ValueMap {
        &self.config
    }

    /// Returns a build-time config value.
    pub fn config_value(&self, name: &str) -> Option<&Value> {
        self.config.get(name)
    }

    /// Returns the names of the validator nodes checking `name`.
    pub fn validators_of(&self, name: &str) -> &[String] {
        self.validators
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the names of the nodes `name` directly depends on.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Returns the names of the nodes directly depending on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Returns the given nodes and everything they transitively depend on.
    pub fn upstream_of(&self, names: &[&str]) -> Result<Vec<&Node>, PlanningError> {
        let reached = self.reachable(names, Direction::Incoming)?;
        Ok(self.collect(&reached))
    }

    /// Returns the given nodes and everything that transitively depends on them.
    pub fn downstream_of(&self, names: &[&str]) -> Result<Vec<&Node>, PlanningError> {
        let reached = self.reachable(names, Direction::Outgoing)?;
        Ok(self.collect(&reached))
    }

    /// Returns the nodes on any path from `from` to `to`, both included.
    ///
    /// The result is empty when `to` does not depend on `from`.
    pub fn path_between(&self, from: &str, to: &str) -> Result<Vec<&Node>, PlanningError> {
        let downstream = self.reachable(&[from], Direction::Outgoing)?;
        let upstream = self.reachable(&[to], Direction::Incoming)?;
        let on_path: HashSet<NodeIndex> = downstream.intersection(&upstream).copied().collect();
        Ok(self.collect(&on_path))
    }

    /// Returns every node, followed by external inputs that are not nodes.
    pub fn variables(&self) -> Vec<Variable> {
        let nodes = self.nodes().map(Variable::from);
        let inputs = self
            .external_inputs()
            .filter(|input| !self.contains_node(&input.name))
            .map(Variable::from);
        nodes.chain(inputs).collect()
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&index) = self.node_indices.get(name) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, direction)
            .collect();
        neighbors.sort_unstable();
        neighbors
            .into_iter()
            .map(|index| self.graph[index].name())
            .collect()
    }

    fn reachable(
        &self,
        names: &[&str],
        direction: Direction,
    ) -> Result<HashSet<NodeIndex>, PlanningError> {
        let mut stack = names
            .iter()
            .map(|name| {
                self.node_indices
                    .get(*name)
                    .copied()
                    .ok_or_else(|| PlanningError::UnknownNode {
                        name: (*name).to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut visited = HashSet::new();
        while let Some(index) = stack.pop() {
            if visited.insert(index) {
                stack.extend(self.graph.neighbors_directed(index, direction));
            }
        }
        Ok(visited)
    }

    fn collect(&self, indices: &HashSet<NodeIndex>) -> Vec<&Node> {
        self.graph
            .node_indices()
            .filter(|index| indices.contains(index))
            .map(|index| &self.graph[index])
            .collect()
    }
}
