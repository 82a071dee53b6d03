//! Function graph structures.
//!
//! This module provides the graph representation built from function
//! descriptors:
//! - [`GraphBuilder`]: Collects descriptors, external inputs and config
//! - [`FunctionGraph`]: The immutable, validated dependency graph
//! - [`ExternalInput`]: A name callers supply at execution time
//! - [`Variable`]: Introspection view of a node or external input

mod builder;
mod cycle;
mod graph;
mod input;
mod variable;

pub use builder::GraphBuilder;
pub use graph::FunctionGraph;
pub use input::ExternalInput;
pub use variable::Variable;

/// Tracing target for graph construction.
const TRACING_TARGET: &str = "nodeflow_runtime::graph";
