//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use nodeflow_runtime::prelude::*;
//! ```

pub use nodeflow_core::prelude::*;

pub use crate::adapter::{
    CacheFormat, CachingAdapter, GraphAdapter, ParallelAdapter, SequentialAdapter,
};
pub use crate::decorator::{CheckOutput, CheckOutputCustom, Decorator, Tag, Target};
pub use crate::driver::{Driver, DriverBuilder, DriverConfig, DriverOutput, ValidationWarning};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::function::{FunctionDef, Param};
pub use crate::graph::{ExternalInput, FunctionGraph, GraphBuilder, Variable};
pub use crate::result::{DictResult, ResultBuilder, SingleValueResult, TableResult};
