//! Column-oriented results.

use nodeflow_core::{Value, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use strum::{AsRefStr, Display};

use super::{Outputs, ResultBuilder};
use crate::error::ResultBuildError;

/// How columns of different lengths are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LengthPolicy {
    /// Differing lengths are an error.
    #[default]
    Error,
    /// Shorter columns are padded with nulls.
    PadWithNull,
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name, the output it came from.
    pub name: String,
    /// Column values, one per row.
    pub values: Vec<Value>,
}

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Returns the columns in requested order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns one row as a JSON object.
    pub fn row(&self, index: usize) -> Option<Map<String, Value>> {
        (index < self.row_count).then(|| {
            self.columns
                .iter()
                .map(|column| (column.name.clone(), column.values[index].clone()))
                .collect()
        })
    }

    /// Returns every row as a JSON object.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.row_count).filter_map(|index| self.row(index)).collect()
    }
}

/// Merges array outputs into a [`Table`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TableResult {
    length_policy: LengthPolicy,
    broadcast_scalars: bool,
}

impl TableResult {
    /// Creates a builder that rejects scalars and mismatched lengths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the length policy.
    pub fn with_length_policy(mut self, length_policy: LengthPolicy) -> Self {
        self.length_policy = length_policy;
        self
    }

    /// Repeats scalar outputs on every row instead of rejecting them.
    pub fn broadcast_scalars(mut self) -> Self {
        self.broadcast_scalars = true;
        self
    }
}

impl ResultBuilder for TableResult {
    type Output = Table;

    fn build(&self, outputs: Outputs) -> Result<Self::Output, ResultBuildError> {
        let longest = outputs
            .iter()
            .filter_map(|(_, value)| value.as_array().map(Vec::len))
            .max();
        let row_count = match longest {
            Some(length) => length,
            None if self.broadcast_scalars && !outputs.is_empty() => 1,
            None => 0,
        };

        let mut columns = Vec::with_capacity(outputs.len());
        for (name, value) in outputs {
            let values = match value {
                Value::Array(mut values) if values.len() < row_count => match self.length_policy {
                    LengthPolicy::PadWithNull => {
                        values.resize(row_count, Value::Null);
                        values
                    }
                    LengthPolicy::Error => {
                        return Err(ResultBuildError::LengthMismatch {
                            name,
                            expected: row_count,
                            found: values.len(),
                        });
                    }
                },
                Value::Array(values) => values,
                scalar if self.broadcast_scalars => vec![scalar; row_count],
                other => {
                    return Err(ResultBuildError::NotColumnar {
                        name,
                        found: ValueType::of(&other),
                    });
                }
            };
            columns.push(Column { name, values });
        }

        Ok(Table { columns, row_count })
    }
}
