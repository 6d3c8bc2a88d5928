//! Query execution against a [`TableHandle`].
//!
//! Every statement the engine runs goes through [`run_query`]: SQL text built
//! only from quoted identifiers, literal values bound as `$n` parameters, and
//! an optional deadline.

use std::time::Duration;

use arrow::record_batch::RecordBatch;
use datafusion::error::DataFusionError;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;

use crate::core::TableHandle;
use crate::prelude::*;

/// A SQL statement plus its positional parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    /// Statement text with `$1..$n` placeholders
    pub sql: String,
    /// Values for the placeholders, in order
    pub params: Vec<ScalarValue>,
}

impl BoundQuery {
    /// A statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Collects parameter values while a statement is being assembled.
#[derive(Debug, Default)]
pub struct ParamBinder {
    params: Vec<ScalarValue>,
}

impl ParamBinder {
    /// Creates an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` and returns the placeholder that refers to it,
    /// wrapped in a cast to `sql_type` so the comparison type never depends
    /// on placeholder inference.
    pub fn bind(&mut self, value: ScalarValue, sql_type: &str) -> String {
        self.params.push(value);
        format!("CAST(${} AS {sql_type})", self.params.len())
    }

    /// Finishes the statement.
    pub fn finish(self, sql: String) -> BoundQuery {
        BoundQuery {
            sql,
            params: self.params,
        }
    }
}

/// Maps an engine error on a table-level operation to the crate taxonomy.
pub(crate) fn classify_table_error(relation: &str, error: DataFusionError) -> DqError {
    match error.find_root() {
        DataFusionError::ResourcesExhausted(_)
        | DataFusionError::IoError(_)
        | DataFusionError::ObjectStore(_)
        | DataFusionError::ExecutionJoin(_) => {
            DqError::execution_unavailable(relation, error.to_string())
        }
        _ => DqError::DataFusion(error),
    }
}

async fn collect(
    ctx: &SessionContext,
    query: &BoundQuery,
) -> datafusion::error::Result<Vec<RecordBatch>> {
    let df = ctx.sql(&query.sql).await?;
    let df = if query.params.is_empty() {
        df
    } else {
        df.with_param_values(query.params.clone())?
    };
    df.collect().await
}

/// Runs `query` against the handle's context.
///
/// With a timeout the query runs on its own task, so the deadline holds even
/// when the plan never yields; on expiry the task is aborted.
pub async fn run_query(
    table: &TableHandle,
    query: &BoundQuery,
    timeout: Option<Duration>,
) -> Result<Vec<RecordBatch>> {
    let outcome = match timeout {
        Some(limit) => {
            let ctx = table.context().clone();
            let query = query.clone();
            let mut task = tokio::spawn(async move { collect(&ctx, &query).await });

            match tokio::time::timeout(limit, &mut task).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => {
                    return Err(DqError::execution_unavailable(
                        table.relation(),
                        format!("query task failed: {join_error}"),
                    ))
                }
                Err(_) => {
                    task.abort();
                    return Err(DqError::ExecutionTimeout {
                        table: table.relation().to_string(),
                        timeout: limit,
                    });
                }
            }
        }
        None => collect(table.context(), query).await,
    };

    outcome.map_err(|e| classify_table_error(table.relation(), e))
}

/// Returns the value at row 0 of column `col_idx` of the first non-empty batch.
fn first_value(batches: &[RecordBatch], col_idx: usize) -> Result<ScalarValue> {
    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| DqError::Internal("Aggregate query returned no rows".to_string()))?;

    if col_idx >= batch.num_columns() {
        return Err(DqError::Internal(format!(
            "Aggregate query returned {} columns, expected at least {}",
            batch.num_columns(),
            col_idx + 1
        )));
    }

    Ok(ScalarValue::try_from_array(batch.column(col_idx), 0)?)
}

/// Extracts a non-negative count from an aggregate result.
pub fn extract_count(batches: &[RecordBatch], col_idx: usize, label: &str) -> Result<u64> {
    match first_value(batches, col_idx)? {
        ScalarValue::Int64(Some(v)) if v >= 0 => Ok(v as u64),
        ScalarValue::UInt64(Some(v)) => Ok(v),
        ScalarValue::Int64(None) | ScalarValue::UInt64(None) => Ok(0),
        other => Err(DqError::Internal(format!(
            "Expected a non-negative integer for {label}, got {other:?}"
        ))),
    }
}

/// Extracts an optional double from an aggregate result.
pub fn extract_optional_f64(batches: &[RecordBatch], col_idx: usize) -> Result<Option<f64>> {
    match first_value(batches, col_idx)? {
        ScalarValue::Float64(v) => Ok(v),
        ScalarValue::Float32(v) => Ok(v.map(f64::from)),
        ScalarValue::Null => Ok(None),
        other => Err(DqError::Internal(format!(
            "Expected a double, got {other:?}"
        ))),
    }
}
