//! Data structures produced by the profiler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::TypeTag;
use crate::prelude::*;

/// Order statistics and mean of a column that supports averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Smallest non-null value; `None` when every value is NULL
    pub min: Option<f64>,
    /// Largest non-null value
    pub max: Option<f64>,
    /// Mean of the non-null values
    pub mean: Option<f64>,
}

/// Statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Coarse type classification
    #[serde(rename = "type")]
    pub declared_type: TypeTag,
    /// The engine's type name
    pub sql_type: String,
    /// Number of NULL values
    pub null_count: u64,
    /// Number of distinct non-null values
    pub distinct_count: u64,
    /// Present only for columns that could be summarized numerically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<NumericSummary>,
}

impl ColumnStats {
    /// Number of non-null values, given the table's row count.
    pub fn non_null_count(&self, row_count: u64) -> u64 {
        row_count.saturating_sub(self.null_count)
    }

    /// Fraction of rows that are NULL; zero for an empty table.
    pub fn null_ratio(&self, row_count: u64) -> f64 {
        if row_count == 0 {
            0.0
        } else {
            self.null_count as f64 / row_count as f64
        }
    }
}

/// A column whose statistics could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFailure {
    /// Column name as the schema spells it
    pub column: String,
    /// Why the column's queries failed
    pub error: String,
}

/// Statistical summary of a table.
///
/// `columns` preserves schema order, so serializing the same table twice
/// yields identical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Relation that was profiled
    pub table: String,
    /// Total number of rows
    pub row_count: u64,
    /// Per-column statistics in schema order
    pub columns: IndexMap<String, ColumnStats>,
    /// Columns whose queries failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unprofiled: Vec<ColumnFailure>,
}

impl Profile {
    /// Returns the statistics for `column`, if it was profiled.
    pub fn column(&self, column: &str) -> Option<&ColumnStats> {
        self.columns.get(column)
    }

    /// Returns true if every column was profiled.
    pub fn is_complete(&self) -> bool {
        self.unprofiled.is_empty()
    }

    /// Serializes the profile as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
