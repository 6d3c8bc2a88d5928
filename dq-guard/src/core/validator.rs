//! Rule evaluation against a table.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::constraints::{violation_query, NullPolicy, Rule, RuleTarget};
use crate::core::query::{extract_count, run_query};
use crate::core::{
    ColumnDescriptor, ExecutionConfig, RuleOutcome, TableHandle, ValidationResult,
};
use crate::error::ErrorContext;
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;

/// Evaluates rule sets against a table.
///
/// Each structurally valid rule yields exactly one outcome, in input order.
/// Malformed rules are dropped up front and only counted. A rule whose query
/// fails becomes an ERROR outcome and the remaining rules still run.
///
/// # Examples
///
/// ```rust,no_run
/// use dq_guard::prelude::*;
/// use datafusion::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("people", "people.csv", CsvReadOptions::new()).await?;
/// let table = TableHandle::new(ctx, "people")?;
///
/// let rules = vec![
///     Rule::not_null("id"),
///     Rule::unique("id"),
///     Rule::range("age", 0, 120),
///     Rule::allowed_values("status", ["active", "inactive"]),
/// ];
///
/// let result = Validator::new().validate(&table, &rules).await?;
/// println!("{} of {} rules failed", result.failed_rules, result.total_rules);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Validator {
    config: ExecutionConfig,
    null_policy: NullPolicy,
    log_config: LogConfig,
    progress_callback: Option<RuleProgressCallback>,
}

/// Progress callback for validation runs
pub type RuleProgressCallback = Arc<dyn Fn(ValidatorProgress) + Send + Sync>;

/// Progress information reported after each rule finishes
#[derive(Debug, Clone)]
pub struct ValidatorProgress {
    /// Name of the rule that just finished
    pub rule_name: String,
    /// Rules evaluated so far, each of which appears in the result
    pub completed: usize,
    /// Structurally valid rules in the run
    pub total: usize,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("null_policy", &self.null_policy)
            .field("log_config", &self.log_config)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl Validator {
    /// Creates a validator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for configuring a validator.
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Concurrency and timeout settings.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// How `AllowedValues` rules treat NULLs.
    pub fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    /// Evaluates `rules` against `table`.
    ///
    /// Fails only when the relation itself cannot be inspected.
    pub async fn validate(&self, table: &TableHandle, rules: &[Rule]) -> Result<ValidationResult> {
        self.run(table, rules, None).await
    }

    /// Evaluates `rules`, stopping before the next rule once `cancel` reads
    /// `true`. Outcomes computed before that point are kept and the result is
    /// marked cancelled. Cancellation latches: setting the flag back to
    /// `false` does not resume the run.
    pub async fn validate_with_cancel(
        &self,
        table: &TableHandle,
        rules: &[Rule],
        cancel: watch::Receiver<bool>,
    ) -> Result<ValidationResult> {
        self.run(table, rules, Some(&cancel)).await
    }

    #[instrument(skip(self, table, rules, cancel), fields(
        table.relation = %table.relation(),
        rules.count = rules.len(),
    ))]
    async fn run(
        &self,
        table: &TableHandle,
        rules: &[Rule],
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<ValidationResult> {
        let mut valid = Vec::with_capacity(rules.len());
        let mut structurally_invalid = 0;
        for rule in rules {
            match rule.structural_error() {
                None => valid.push(rule),
                Some(reason) => {
                    structurally_invalid += 1;
                    warn!(
                        rule.name = %rule.name(),
                        rule.column = %rule.column(),
                        rule.reason = reason,
                        "Dropping malformed rule"
                    );
                }
            }
        }

        info!(
            table.relation = %table.relation(),
            rules.valid = valid.len(),
            rules.dropped = structurally_invalid,
            "Starting validation"
        );

        if valid.is_empty() {
            return Ok(ValidationResult::empty(structurally_invalid));
        }

        let schema = table.describe().await?;
        let total = valid.len();
        let limit = self.config.effective_concurrency(total);
        let schema = &schema;
        let completed = AtomicUsize::new(0);
        let completed = &completed;
        // Rules start in input order, so once one is skipped every later one
        // is skipped too and the outcomes form a prefix.
        let stopped = AtomicBool::new(false);
        let stopped = &stopped;

        let outputs: Vec<Option<RuleOutcome>> =
            stream::iter(valid.into_iter().map(|rule| async move {
                if stopped.load(Ordering::Acquire) || cancel.is_some_and(|rx| *rx.borrow()) {
                    stopped.store(true, Ordering::Release);
                    return None;
                }
                let outcome = self.evaluate(table, schema, rule).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = &self.progress_callback {
                    callback(ValidatorProgress {
                        rule_name: rule.name().to_string(),
                        completed: done,
                        total,
                    });
                }
                Some(outcome)
            }))
            .buffered(limit)
            .collect()
            .await;

        let cancelled = outputs.iter().any(Option::is_none);
        let results: Vec<RuleOutcome> = outputs.into_iter().map_while(|o| o).collect();
        let result = ValidationResult::new(results, structurally_invalid, cancelled);

        if cancelled {
            warn!(
                table.relation = %table.relation(),
                result.completed = result.total_rules,
                "Validation cancelled"
            );
        }

        info!(
            table.relation = %table.relation(),
            result.total = result.total_rules,
            result.failed = result.failed_rules,
            result.unevaluable = result.unevaluable_rules,
            "Validation completed"
        );

        Ok(result)
    }

    async fn evaluate(
        &self,
        table: &TableHandle,
        schema: &[ColumnDescriptor],
        rule: &Rule,
    ) -> RuleOutcome {
        match self.count_violations(table, schema, rule).await {
            Ok(violations) => {
                let outcome = RuleOutcome::evaluated(rule, violations);
                debug!(
                    rule.name = %rule.name(),
                    rule.kind = %rule.rule_type(),
                    result.status = ?outcome.status,
                    result.violations = violations,
                    "Rule evaluated"
                );
                outcome
            }
            Err(e) => {
                warn!(
                    rule.name = %rule.name(),
                    rule.column = %rule.column(),
                    error = %e,
                    "Rule could not be evaluated"
                );
                RuleOutcome::errored(rule, &e)
            }
        }
    }

    async fn count_violations(
        &self,
        table: &TableHandle,
        schema: &[ColumnDescriptor],
        rule: &Rule,
    ) -> Result<u64> {
        let column = table.resolve_column(schema, rule.column())?;
        let quoted = column.quoted()?;
        let query = violation_query(
            rule,
            RuleTarget::new(table.quoted_relation(), &quoted, column),
            self.null_policy,
        )?;

        crate::log_rule!(
            self.log_config,
            rule.name = %rule.name(),
            rule.sql = %truncate_field(&query.sql, self.log_config.max_field_length),
            rule.params = query.params.len(),
            "Running rule query"
        );

        let batches = run_query(table, &query, self.config.query_timeout).await?;
        extract_count(&batches, 0, "violations")
            .with_context(|| format!("Reading violation count for rule '{}'", rule.name()))
    }
}

/// Builder for [`Validator`].
#[derive(Default)]
pub struct ValidatorBuilder {
    config: ExecutionConfig,
    null_policy: NullPolicy,
    log_config: LogConfig,
    progress_callback: Option<RuleProgressCallback>,
}

impl ValidatorBuilder {
    /// Replaces the whole execution configuration.
    pub fn execution_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how many rules may be evaluated at once.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config = self.config.with_max_concurrency(max_concurrency);
        self
    }

    /// Sets the per-query timeout.
    pub fn query_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_query_timeout(timeout);
        self
    }

    /// Sets how NULLs are treated by `AllowedValues` rules.
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Sets the logging configuration.
    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Sets a callback invoked after each rule is evaluated.
    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ValidatorProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Builds the validator.
    pub fn build(self) -> Validator {
        Validator {
            config: self.config,
            null_policy: self.null_policy,
            log_config: self.log_config,
            progress_callback: self.progress_callback,
        }
    }
}
