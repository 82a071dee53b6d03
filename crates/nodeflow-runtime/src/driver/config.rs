//! Driver configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default maximum number of concurrent driver calls.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 10;

/// Configuration for the driver.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DriverConfig {
    /// Maximum number of executions running at the same time.
    #[builder(default = "DEFAULT_MAX_CONCURRENT_RUNS")]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "driver-max-concurrent-runs",
            env = "NODEFLOW_DRIVER_MAX_CONCURRENT_RUNS",
            default_value_t = DEFAULT_MAX_CONCURRENT_RUNS
        )
    )]
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    /// Time budget of one execution in seconds; unbounded when unset.
    ///
    /// Applies to every adapter. A running node is never interrupted; the
    /// execution stops at the next node boundary, and an overrun detected
    /// once the adapter returns is still reported as a timeout.
    #[builder(default)]
    #[cfg_attr(
        feature = "config",
        arg(
            long = "driver-execution-timeout-secs",
            env = "NODEFLOW_DRIVER_EXECUTION_TIMEOUT_SECS"
        )
    )]
    #[serde(default)]
    pub execution_timeout_secs: Option<u64>,
}

fn default_max_concurrent_runs() -> usize {
    DEFAULT_MAX_CONCURRENT_RUNS
}

impl DriverConfig {
    /// Rejects limits that would stall or immediately fail every execution.
    ///
    /// Checked when the driver is created, since deserialized or hand-built
    /// configurations never pass through the builder.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_runs == 0 {
            return Err(Error::Configuration(
                "max_concurrent_runs must be at least 1".into(),
            ));
        }
        if self.execution_timeout_secs == Some(0) {
            return Err(Error::Configuration(
                "execution_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Returns the execution timeout, if any.
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_secs.map(Duration::from_secs)
    }
}

impl DriverConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_runs == Some(0) {
            return Err("max_concurrent_runs must be at least 1".into());
        }
        if let Some(Some(0)) = self.execution_timeout_secs {
            return Err("execution_timeout_secs must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            execution_timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let config = DriverConfigBuilder::default().build().unwrap();
        assert_eq!(config, DriverConfig::default());
        assert_eq!(DriverConfig::default().execution_timeout(), None);
    }

    #[test]
    fn timeout_converts_to_duration() {
        let config = DriverConfigBuilder::default()
            .execution_timeout_secs(30_u64)
            .build()
            .unwrap();
        assert_eq!(config.execution_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(
            DriverConfigBuilder::default()
                .max_concurrent_runs(0_usize)
                .build()
                .is_err()
        );
        assert!(
            DriverConfigBuilder::default()
                .execution_timeout_secs(0_u64)
                .build()
                .is_err()
        );
    }

    #[test]
    fn deserialized_configs_are_validated_on_use() {
        let config: DriverConfig = serde_json::from_str(r#"{"max_concurrent_runs":0}"#).unwrap();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config: DriverConfig = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
    }
}
