//! Table profiling.
//!
//! The profiler computes a [`Profile`] for a registered relation:
//!
//! - one `COUNT(*)` for the row count
//! - schema introspection for column names and types
//! - per column, one aggregate for null and distinct counts
//! - per column that can be averaged, one `MIN`/`MAX`/`AVG` aggregate
//!
//! Columns are profiled concurrently up to [`ExecutionConfig::max_concurrency`]
//! and the output keeps schema order. Failures of the row count or schema
//! lookup abort profiling; a failing column is recorded in
//! [`Profile::unprofiled`] and the rest are still profiled.
//!
//! # Example
//!
//! ```rust
//! use dq_guard::prelude::*;
//! use datafusion::prelude::*;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let ctx = SessionContext::new();
//! ctx.sql("CREATE TABLE people AS VALUES (1, 'a'), (2, NULL)").await.unwrap();
//! let table = TableHandle::new(ctx, "people").unwrap();
//!
//! let profile = Profiler::builder().max_concurrency(2).build().profile(&table).await.unwrap();
//! assert_eq!(profile.row_count, 2);
//! assert_eq!(profile.columns["column2"].null_count, 1);
//! # })
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::analyzers::{ColumnFailure, ColumnStats, NumericSummary, Profile};
use crate::core::query::{extract_count, extract_optional_f64, run_query, BoundQuery};
use crate::core::{ColumnDescriptor, ExecutionConfig, TableHandle};
use crate::logging::LogConfig;
use crate::prelude::*;

/// Progress callback for profiling operations
pub type ProgressCallback = Arc<dyn Fn(ProfilerProgress) + Send + Sync>;

/// Progress information reported after each column finishes
#[derive(Debug, Clone)]
pub struct ProfilerProgress {
    /// Column that just finished
    pub column_name: String,
    /// Columns finished so far
    pub completed: usize,
    /// Columns in the schema
    pub total: usize,
}

/// Computes statistical profiles of tables.
#[derive(Clone, Default)]
pub struct Profiler {
    config: ExecutionConfig,
    log_config: LogConfig,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.config)
            .field("log_config", &self.log_config)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

/// Builder for [`Profiler`].
#[derive(Default)]
pub struct ProfilerBuilder {
    config: ExecutionConfig,
    log_config: LogConfig,
    progress_callback: Option<ProgressCallback>,
}

impl ProfilerBuilder {
    /// Replaces the whole execution configuration.
    pub fn execution_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how many columns may be profiled at once
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config = self.config.with_max_concurrency(max_concurrency);
        self
    }

    /// Set the per-query timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_query_timeout(timeout);
        self
    }

    /// Set the logging configuration
    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Set progress callback
    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProfilerProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Build the profiler
    pub fn build(self) -> Profiler {
        Profiler {
            config: self.config,
            log_config: self.log_config,
            progress_callback: self.progress_callback,
        }
    }
}

impl Profiler {
    /// Creates a profiler with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for configuring a profiler.
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::default()
    }

    /// Concurrency and timeout settings.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Profiles every column of `table`.
    #[instrument(skip(self, table), fields(table.relation = %table.relation()))]
    pub async fn profile(&self, table: &TableHandle) -> Result<Profile> {
        info!(table.relation = %table.relation(), "Starting table profiling");

        table.ensure_exists()?;
        let row_count = self.row_count(table).await?;
        let schema = table.describe().await?;

        let total = schema.len();
        let limit = self.config.effective_concurrency(total);
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let outputs: Vec<(&ColumnDescriptor, Result<ColumnStats>)> =
            stream::iter(schema.iter().map(|column| async move {
                let stats = self.profile_column(table, column).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = &self.progress_callback {
                    callback(ProfilerProgress {
                        column_name: column.name.clone(),
                        completed: done,
                        total,
                    });
                }
                (column, stats)
            }))
            .buffered(limit)
            .collect()
            .await;

        let mut columns = IndexMap::with_capacity(total);
        let mut unprofiled = Vec::new();
        for (column, stats) in outputs {
            match stats {
                Ok(stats) => {
                    columns.insert(column.name.clone(), stats);
                }
                Err(e) if e.is_table_level() => return Err(e),
                Err(e) => {
                    warn!(
                        table.relation = %table.relation(),
                        column.name = %column.name,
                        error = %e,
                        "Column could not be profiled"
                    );
                    unprofiled.push(ColumnFailure {
                        column: column.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            table.relation = %table.relation(),
            profile.rows = row_count,
            profile.columns = columns.len(),
            profile.unprofiled = unprofiled.len(),
            "Table profiling completed"
        );

        Ok(Profile {
            table: table.relation().to_string(),
            row_count,
            columns,
            unprofiled,
        })
    }

    async fn row_count(&self, table: &TableHandle) -> Result<u64> {
        let query = BoundQuery::new(format!(
            "SELECT COUNT(*) AS row_count FROM {}",
            table.quoted_relation()
        ));
        let batches = run_query(table, &query, self.config.query_timeout).await?;
        extract_count(&batches, 0, "row_count")
    }

    /// Computes statistics for one column.
    pub async fn profile_column(
        &self,
        table: &TableHandle,
        column: &ColumnDescriptor,
    ) -> Result<ColumnStats> {
        let quoted = column.quoted()?;

        let query = BoundQuery::new(format!(
            "SELECT COUNT(*) - COUNT({quoted}) AS null_count, \
             COUNT(DISTINCT {quoted}) AS distinct_count FROM {}",
            table.quoted_relation()
        ));
        let batches = run_query(table, &query, self.config.query_timeout).await?;
        let null_count = extract_count(&batches, 0, "null_count")?;
        let distinct_count = extract_count(&batches, 1, "distinct_count")?;

        let numeric_summary = if column.declared_type.may_average() {
            self.numeric_summary(table, column, &quoted).await?
        } else {
            None
        };

        crate::log_column!(
            self.log_config,
            column.name = %column.name,
            column.nulls = null_count,
            column.distinct = distinct_count,
            column.summarized = numeric_summary.is_some(),
            "Column profiled"
        );

        Ok(ColumnStats {
            declared_type: column.declared_type,
            sql_type: column.sql_type.clone(),
            null_count,
            distinct_count,
            numeric_summary,
        })
    }

    /// Attempts the min/max/mean aggregate.
    ///
    /// An engine rejection of the aggregate means the column cannot be
    /// summarized and yields `None`. Timeouts and table-level failures are
    /// returned so the column is recorded as unprofiled.
    async fn numeric_summary(
        &self,
        table: &TableHandle,
        column: &ColumnDescriptor,
        quoted: &str,
    ) -> Result<Option<NumericSummary>> {
        let query = BoundQuery::new(format!(
            "SELECT CAST(MIN({quoted}) AS DOUBLE), CAST(MAX({quoted}) AS DOUBLE), \
             CAST(AVG({quoted}) AS DOUBLE) FROM {}",
            table.quoted_relation()
        ));

        let batches = match run_query(table, &query, self.config.query_timeout).await {
            Ok(batches) => batches,
            Err(DqError::DataFusion(e)) => {
                debug!(
                    column.name = %column.name,
                    column.sql_type = %column.sql_type,
                    error = %e,
                    "Numeric summary unsupported for column"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(NumericSummary {
            min: extract_optional_f64(&batches, 0)?,
            max: extract_optional_f64(&batches, 1)?,
            mean: extract_optional_f64(&batches, 2)?,
        }))
    }
}
