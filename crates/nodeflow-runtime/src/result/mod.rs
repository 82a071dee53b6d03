//! Result builders.
//!
//! The driver collects the requested outputs into [`Outputs`] and hands them
//! to a [`ResultBuilder`]:
//! - [`DictResult`]: the outputs as a JSON object
//! - [`TableResult`]: array outputs merged into a [`Table`]
//! - [`SingleValueResult`]: the only requested output

mod outputs;
mod table;

use nodeflow_core::Value;
pub use outputs::Outputs;
use serde_json::Map;
pub use table::{Column, LengthPolicy, Table, TableResult};

use crate::error::ResultBuildError;

/// Assembles the requested outputs into the artifact returned to callers.
pub trait ResultBuilder: Send + Sync {
    /// The built artifact.
    type Output: Send;

    /// Builds the artifact from outputs in requested order.
    fn build(&self, outputs: Outputs) -> Result<Self::Output, ResultBuildError>;
}

/// Returns the outputs as a JSON object keyed by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictResult;

impl ResultBuilder for DictResult {
    type Output = Map<String, Value>;

    fn build(&self, outputs: Outputs) -> Result<Self::Output, ResultBuildError> {
        Ok(outputs.into_iter().collect())
    }
}

/// Returns the single requested output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleValueResult;

impl ResultBuilder for SingleValueResult {
    type Output = Value;

    fn build(&self, outputs: Outputs) -> Result<Self::Output, ResultBuildError> {
        let count = outputs.len();
        let mut entries = outputs.into_iter();
        match (entries.next(), count) {
            (Some((_, value)), 1) => Ok(value),
            _ => Err(ResultBuildError::ExpectedSingleOutput { count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn outputs(entries: &[(&str, Value)]) -> Outputs {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn dict_keeps_every_output() {
        let built = DictResult.build(outputs(&[("b", json!(6)), ("a", json!(5))]));
        let built = built.unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(built.get("b"), Some(&json!(6)));
    }

    #[test]
    fn single_value_requires_exactly_one() {
        assert_eq!(
            SingleValueResult.build(outputs(&[("a", json!(5))])),
            Ok(json!(5))
        );
        assert_eq!(
            SingleValueResult.build(outputs(&[])),
            Err(ResultBuildError::ExpectedSingleOutput { count: 0 })
        );
        assert_eq!(
            SingleValueResult.build(outputs(&[("a", json!(1)), ("b", json!(2))])),
            Err(ResultBuildError::ExpectedSingleOutput { count: 2 })
        );
    }
}
