//! Driver construction.

use std::sync::Arc;

use nodeflow_core::Value;

use super::{Driver, DriverConfig};
use crate::adapter::{GraphAdapter, SequentialAdapter};
use crate::error::{Error, Result};
use crate::function::FunctionDef;
use crate::graph::{ExternalInput, GraphBuilder};

/// Builds a [`Driver`] from function descriptors, inputs, config and an adapter.
///
/// The adapter defaults to [`SequentialAdapter`] and may be set once.
#[derive(Debug, Default)]
pub struct DriverBuilder {
    graph: GraphBuilder,
    adapter: Option<Arc<dyn GraphAdapter>>,
    adapter_conflict: bool,
    config: DriverConfig,
}

impl DriverBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function descriptor.
    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.graph = self.graph.with_function(function);
        self
    }

    /// Registers function descriptors in order.
    pub fn with_functions(mut self, functions: impl IntoIterator<Item = FunctionDef>) -> Self {
        self.graph = self.graph.with_functions(functions);
        self
    }

    /// Declares an external input.
    pub fn with_external_input(mut self, input: impl Into<ExternalInput>) -> Self {
        self.graph = self.graph.with_external_input(input);
        self
    }

    /// Sets a build-time config value.
    pub fn with_config(mut self, name: impl Into<String>, value: Value) -> Self {
        self.graph = self.graph.with_config(name, value);
        self
    }

    /// Sets the execution adapter.
    pub fn with_adapter(self, adapter: impl GraphAdapter + 'static) -> Self {
        self.with_shared_adapter(Arc::new(adapter))
    }

    /// Sets a shared execution adapter.
    pub fn with_shared_adapter(mut self, adapter: Arc<dyn GraphAdapter>) -> Self {
        if self.adapter.is_some() {
            self.adapter_conflict = true;
        }
        self.adapter = Some(adapter);
        self
    }

    /// Sets the driver configuration.
    pub fn with_driver_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the graph and the driver.
    pub fn build(self) -> Result<Driver> {
        if self.adapter_conflict {
            return Err(Error::Configuration(
                "the execution adapter was set more than once".into(),
            ));
        }

        let graph = self.graph.build()?;
        let adapter = self
            .adapter
            .unwrap_or_else(|| Arc::new(SequentialAdapter));
        Driver::new(graph, adapter, self.config)
    }
}
