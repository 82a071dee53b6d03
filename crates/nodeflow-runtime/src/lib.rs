#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod adapter;
pub mod decorator;
pub mod driver;
mod error;
mod function;
pub mod graph;
pub mod planner;
pub mod result;
pub mod validator;

#[doc(hidden)]
pub mod prelude;

pub use driver::{Driver, DriverBuilder, DriverConfig, DriverOutput};
pub use error::{
    DecoratorApplicationError, Error, ErrorKind, ExecutionError, GraphConstructionError,
    PlanningError, Result, ResultBuildError, ValidationError,
};
pub use function::{FunctionDef, Param};
pub use nodeflow_core::{Importance, Inputs, Value, ValueMap, ValueType};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "nodeflow_runtime";
