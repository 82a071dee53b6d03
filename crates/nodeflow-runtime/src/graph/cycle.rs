//! Cycle detection.

use nodeflow_core::Node;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Finds a dependency cycle with a three-color depth-first traversal.
///
/// Returns node names along the cycle in "depends on" order, with the first
/// name repeated at the end.
pub(super) fn find_cycle(graph: &DiGraph<Node, ()>) -> Option<Vec<String>> {
    let mut marks = vec![Mark::Unvisited; graph.node_count()];

    for start in graph.node_indices() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }

        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(start, dependencies(graph, start))];
        marks[start.index()] = Mark::InProgress;

        while let Some((current, pending)) = stack.last_mut() {
            let current = *current;
            let Some(next) = pending.pop() else {
                marks[current.index()] = Mark::Done;
                stack.pop();
                continue;
            };

            match marks[next.index()] {
                Mark::Unvisited => {
                    marks[next.index()] = Mark::InProgress;
                    stack.push((next, dependencies(graph, next)));
                }
                Mark::InProgress => {
                    let position = stack.iter().position(|(index, _)| *index == next)?;
                    let mut path: Vec<String> = stack[position..]
                        .iter()
                        .map(|(index, _)| graph[*index].name().to_owned())
                        .collect();
                    path.push(graph[next].name().to_owned());
                    return Some(path);
                }
                Mark::Done => {}
            }
        }
    }

    None
}

/// Dependencies of a node, reversed so that popping yields declaration order.
fn dependencies(graph: &DiGraph<Node, ()>, index: NodeIndex) -> Vec<NodeIndex> {
    let mut deps: Vec<NodeIndex> = graph.neighbors_directed(index, Direction::Incoming).collect();
    deps.sort_unstable();
    deps.reverse();
    deps
}
