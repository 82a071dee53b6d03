//! Adapter configuration.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of concurrently running nodes.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default number of memoized values.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Configuration for the parallel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ParallelConfig {
    /// Maximum number of nodes running at the same time.
    #[builder(default = "DEFAULT_MAX_WORKERS")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "parallel-max-workers",
            env = "NODEFLOW_PARALLEL_MAX_WORKERS",
            default_value_t = DEFAULT_MAX_WORKERS
        )
    )]
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl ParallelConfig {
    /// Rejects limits that would stall execution.
    ///
    /// Checked when the adapter runs, since deserialized or hand-built
    /// configurations never pass through the builder.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Configuration("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

impl ParallelConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_workers == Some(0) {
            return Err("max_workers must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Configuration for the caching adapter.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CacheConfig {
    /// Maximum number of memoized values; the oldest entry is evicted first.
    #[builder(default = "DEFAULT_CACHE_CAPACITY")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cache-capacity",
            env = "NODEFLOW_CACHE_CAPACITY",
            default_value_t = DEFAULT_CACHE_CAPACITY
        )
    )]
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Memoize every function node, not only those tagged `cache`.
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "cache-all", env = "NODEFLOW_CACHE_ALL")
    )]
    #[serde(default)]
    pub cache_all: bool,

    /// Directory for persisted values; memoization stays in memory when unset.
    ///
    /// Each cached node is stored as `<cache_path>/<node>.<format>`, where the
    /// format is the node's `cache` tag value.
    #[builder(default, setter(into, strip_option))]
    #[cfg_attr(
        feature = "config",
        arg(long = "cache-path", env = "NODEFLOW_CACHE_PATH")
    )]
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl CacheConfig {
    /// Rejects a zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Configuration("capacity must be at least 1".into()));
        }
        Ok(())
    }
}

impl CacheConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.capacity == Some(0) {
            return Err("capacity must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            cache_all: false,
            cache_path: None,
        }
    }
}
