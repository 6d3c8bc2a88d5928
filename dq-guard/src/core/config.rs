//! Execution settings shared by the profiler and the validator.

use std::time::Duration;

/// Limits applied to the queries a profiling or validation run issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Maximum number of columns or rules evaluated at the same time
    pub max_concurrency: usize,
    /// Per-query deadline; `None` waits indefinitely
    pub query_timeout: Option<Duration>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(1),
            query_timeout: None,
        }
    }
}

impl ExecutionConfig {
    /// One query at a time.
    pub fn sequential() -> Self {
        Self {
            max_concurrency: 1,
            ..Self::default()
        }
    }

    /// Sets the concurrency cap. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets the per-query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Number of workers to use for `tasks` independent units of work.
    pub fn effective_concurrency(&self, tasks: usize) -> usize {
        self.max_concurrency.min(tasks).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert!(config.max_concurrency >= 1);
        assert!(config.query_timeout.is_none());
    }

    #[test]
    fn test_effective_concurrency_is_capped_by_task_count() {
        let config = ExecutionConfig::default().with_max_concurrency(8);
        assert_eq!(config.effective_concurrency(3), 3);
        assert_eq!(config.effective_concurrency(20), 8);
        assert_eq!(config.effective_concurrency(0), 1);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(
            ExecutionConfig::default()
                .with_max_concurrency(0)
                .max_concurrency,
            1
        );
        assert_eq!(ExecutionConfig::sequential().max_concurrency, 1);
    }
}
