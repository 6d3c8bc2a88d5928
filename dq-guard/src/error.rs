//! Error types for the dq-guard profiling and validation engine.
//!
//! All fallible operations in the crate return [`Result`], whose error side is
//! [`DqError`]. Whole-table failures (missing relation, unusable execution
//! engine) surface as hard errors; per-column and per-rule failures are
//! captured inside the profile or validation result instead.

use std::time::Duration;

use thiserror::Error;

/// The main error type for dq-guard.
#[derive(Error, Debug)]
pub enum DqError {
    /// The relation is not registered with the execution context.
    #[error("Table '{table}' not found")]
    TableNotFound {
        /// Name of the relation that was looked up
        table: String,
    },

    /// A rule or statistic referenced a column the relation does not have.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Relation that was searched
        table: String,
        /// Column that was requested
        column: String,
    },

    /// The query engine could not run queries against the relation.
    #[error("Query execution unavailable for table '{table}': {message}")]
    ExecutionUnavailable {
        /// Relation the failing query targeted
        table: String,
        /// Detailed error message
        message: String,
    },

    /// A query did not finish within the configured timeout.
    #[error("Query against table '{table}' timed out after {timeout:?}")]
    ExecutionTimeout {
        /// Relation the query targeted
        table: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rule-proposal output that could not be interpreted as rule records.
    #[error("Unusable oracle output: {0}")]
    OracleOutput(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, DqError>`.
pub type Result<T> = std::result::Result<T, DqError>;

impl DqError {
    /// Creates a table-not-found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an execution-unavailable error.
    pub fn execution_unavailable(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionUnavailable {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Returns true for failures that concern the relation as a whole.
    ///
    /// Profiling aborts on these instead of recording a per-column failure.
    pub fn is_table_level(&self) -> bool {
        matches!(
            self,
            Self::TableNotFound { .. } | Self::ExecutionUnavailable { .. }
        )
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<DqError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            DqError::Internal(inner) => DqError::Internal(format!("{msg}: {inner}")),
            other => DqError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                DqError::Internal(inner) => DqError::Internal(format!("{msg}: {inner}")),
                other => DqError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_not_found_names_relation() {
        let err = DqError::table_not_found("orders");
        assert_eq!(err.to_string(), "Table 'orders' not found");
        assert!(err.is_table_level());
    }

    #[test]
    fn test_column_not_found() {
        let err = DqError::column_not_found("orders", "user_id");
        assert_eq!(
            err.to_string(),
            "Column 'user_id' not found in table 'orders'"
        );
        assert!(!err.is_table_level());
    }

    #[test]
    fn test_timeout_message() {
        let err = DqError::ExecutionTimeout {
            table: "orders".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "Query against table 'orders' timed out after 250ms"
        );
        assert!(!err.is_table_level());
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(DqError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("During profiling")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Internal error: During profiling: Something went wrong"
        );
    }
}
