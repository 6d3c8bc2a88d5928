//! Deterministic rule suggestions derived from a profile.
//!
//! The [`SuggestionEngine`] is a [`RuleOracle`] that needs no external
//! service: each registered [`SuggestionRule`] inspects one column's
//! statistics and proposes candidates with a confidence score. Candidates
//! under the engine's threshold are discarded. Output follows schema order
//! and rule registration order, so the same profile always yields the same
//! candidates.
//!
//! ## Example Usage
//!
//! ```rust
//! use dq_guard::analyzers::{ColumnStats, NumericSummary, Profile, SuggestionEngine};
//! use dq_guard::core::TypeTag;
//! use dq_guard::oracle::OracleBoundary;
//! use indexmap::IndexMap;
//!
//! let mut columns = IndexMap::new();
//! columns.insert(
//!     "id".to_string(),
//!     ColumnStats {
//!         declared_type: TypeTag::Numeric,
//!         sql_type: "Int64".to_string(),
//!         null_count: 0,
//!         distinct_count: 3,
//!         numeric_summary: Some(NumericSummary { min: Some(1.0), max: Some(3.0), mean: Some(2.0) }),
//!     },
//! );
//! let profile = Profile { table: "t".to_string(), row_count: 3, columns, unprofiled: Vec::new() };
//!
//! let engine = SuggestionEngine::with_default_rules();
//! let admission = OracleBoundary::new().admit(&engine.suggest(&profile));
//! let names: Vec<&str> = admission.rules.iter().map(|r| r.name()).collect();
//! assert_eq!(names, vec!["not_null_id", "unique_id", "range_id"]);
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::analyzers::{ColumnStats, Profile};
use crate::constraints::RuleType;
use crate::oracle::{RuleCandidate, RuleOracle};
use crate::prelude::*;

/// A heuristic that proposes rules for one column.
pub trait SuggestionRule: Send + Sync {
    /// Apply this rule to a column's statistics and return candidates
    fn apply(&self, column: &str, stats: &ColumnStats, row_count: u64) -> Vec<RuleCandidate>;

    /// Get a human-readable name for this rule
    fn name(&self) -> &str;
}

/// Engine that orchestrates multiple suggestion rules
pub struct SuggestionEngine {
    rules: Vec<Box<dyn SuggestionRule>>,
    confidence_threshold: f64,
}

impl SuggestionEngine {
    /// Create an engine with no rules
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            confidence_threshold: 0.5,
        }
    }

    /// Create an engine with the completeness, uniqueness, and range rules
    pub fn with_default_rules() -> Self {
        Self::new()
            .add_rule(Box::new(CompletenessRule))
            .add_rule(Box::new(UniquenessRule))
            .add_rule(Box::new(RangeRule))
    }

    /// Add a suggestion rule to the engine
    pub fn add_rule(mut self, rule: Box<dyn SuggestionRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the minimum confidence threshold for suggestions
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Generate candidates for every profiled column
    #[instrument(skip(self, profile), fields(table.relation = %profile.table))]
    pub fn suggest(&self, profile: &Profile) -> Vec<RuleCandidate> {
        let mut suggestions = Vec::new();

        for (column, stats) in &profile.columns {
            for rule in &self.rules {
                let proposed = rule.apply(column, stats, profile.row_count);
                debug!(
                    column = %column,
                    rule = rule.name(),
                    suggestions_count = proposed.len(),
                    "Applied suggestion rule"
                );
                suggestions.extend(proposed.into_iter().filter(|c| {
                    c.confidence.unwrap_or(1.0) >= self.confidence_threshold
                }));
            }
        }

        suggestions
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

#[async_trait]
impl RuleOracle for SuggestionEngine {
    async fn propose(&self, profile: &Profile) -> Result<Vec<RuleCandidate>> {
        Ok(self.suggest(profile))
    }

    fn name(&self) -> &str {
        "suggestion_engine"
    }
}

/// Proposes `not_null` for columns without NULLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletenessRule;

impl SuggestionRule for CompletenessRule {
    fn apply(&self, column: &str, stats: &ColumnStats, row_count: u64) -> Vec<RuleCandidate> {
        if row_count == 0 {
            return Vec::new();
        }

        let null_ratio = stats.null_ratio(row_count);
        if stats.null_count == 0 {
            vec![RuleCandidate::new(RuleType::NotNull.as_str(), column)
                .with_confidence(0.9)
                .with_rationale("Column has no NULL values")]
        } else if null_ratio < 0.01 {
            vec![RuleCandidate::new(RuleType::NotNull.as_str(), column)
                .with_confidence(0.6)
                .with_rationale(format!(
                    "Column is {:.2}% NULL",
                    null_ratio * 100.0
                ))]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "completeness"
    }
}

/// Proposes `unique` for columns whose non-null values are all distinct.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniquenessRule;

impl SuggestionRule for UniquenessRule {
    fn apply(&self, column: &str, stats: &ColumnStats, row_count: u64) -> Vec<RuleCandidate> {
        let non_null = stats.non_null_count(row_count);
        if row_count < 2 || non_null == 0 || stats.distinct_count != non_null {
            return Vec::new();
        }

        let confidence = if stats.null_count == 0 { 0.9 } else { 0.7 };
        vec![RuleCandidate::new(RuleType::Unique.as_str(), column)
            .with_confidence(confidence)
            .with_rationale(format!("All {non_null} non-null values are distinct"))]
    }

    fn name(&self) -> &str {
        "uniqueness"
    }
}

/// Proposes `range` from the observed minimum and maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeRule;

/// Integral doubles are emitted as JSON integers so `1.0` reads as `1`.
fn bound_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

impl SuggestionRule for RangeRule {
    fn apply(&self, column: &str, stats: &ColumnStats, _row_count: u64) -> Vec<RuleCandidate> {
        let Some(summary) = &stats.numeric_summary else {
            return Vec::new();
        };
        let (Some(min), Some(max)) = (summary.min, summary.max) else {
            return Vec::new();
        };
        if !(min.is_finite() && max.is_finite()) {
            return Vec::new();
        }

        vec![RuleCandidate::new(RuleType::Range.as_str(), column)
            .with_bounds(bound_value(min), bound_value(max))
            .with_confidence(0.8)
            .with_rationale(format!("Observed values lie in [{min}, {max}]"))]
    }

    fn name(&self) -> &str {
        "range"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::NumericSummary;
    use crate::core::TypeTag;
    use indexmap::IndexMap;

    fn stats(null_count: u64, distinct_count: u64, summary: Option<(f64, f64)>) -> ColumnStats {
        ColumnStats {
            declared_type: TypeTag::Numeric,
            sql_type: "Float64".to_string(),
            null_count,
            distinct_count,
            numeric_summary: summary.map(|(min, max)| NumericSummary {
                min: Some(min),
                max: Some(max),
                mean: None,
            }),
        }
    }

    fn profile(row_count: u64, columns: Vec<(&str, ColumnStats)>) -> Profile {
        Profile {
            table: "t".to_string(),
            row_count,
            columns: columns
                .into_iter()
                .map(|(name, stats)| (name.to_string(), stats))
                .collect::<IndexMap<_, _>>(),
            unprofiled: Vec::new(),
        }
    }

    #[test]
    fn test_completeness_rule() {
        let rule = CompletenessRule;
        assert_eq!(rule.apply("a", &stats(0, 5, None), 10).len(), 1);
        assert_eq!(
            rule.apply("a", &stats(1, 5, None), 1000)[0].confidence,
            Some(0.6)
        );
        assert!(rule.apply("a", &stats(5, 5, None), 10).is_empty());
        assert!(rule.apply("a", &stats(0, 0, None), 0).is_empty());
    }

    #[test]
    fn test_uniqueness_rule() {
        let rule = UniquenessRule;
        assert_eq!(
            rule.apply("id", &stats(0, 10, None), 10)[0].confidence,
            Some(0.9)
        );
        assert_eq!(
            rule.apply("id", &stats(2, 8, None), 10)[0].confidence,
            Some(0.7)
        );
        assert!(rule.apply("id", &stats(0, 9, None), 10).is_empty());
        assert!(rule.apply("id", &stats(0, 1, None), 1).is_empty());
    }

    #[test]
    fn test_range_rule_bounds() {
        let candidates = RangeRule.apply("score", &stats(0, 3, Some((0.0, 9.5))), 3);
        assert_eq!(candidates[0].min, Some(Value::from(0)));
        assert_eq!(candidates[0].max, Some(Value::from(9.5)));
        assert!(RangeRule.apply("name", &stats(0, 3, None), 3).is_empty());
    }

    #[test]
    fn test_threshold_filters_and_order_is_stable() {
        let profile = profile(
            1000,
            vec![
                ("b", stats(1, 999, Some((1.0, 2.0)))),
                ("a", stats(0, 10, None)),
            ],
        );

        let engine = SuggestionEngine::with_default_rules().confidence_threshold(0.65);
        let suggestions = engine.suggest(&profile);
        let summary: Vec<(String, String)> = suggestions
            .iter()
            .map(|c| (c.column.clone().unwrap(), c.kind.clone().unwrap()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("b".to_string(), "unique".to_string()),
                ("b".to_string(), "range".to_string()),
                ("a".to_string(), "not_null".to_string()),
            ]
        );
        assert_eq!(engine.suggest(&profile), suggestions);
    }

    #[tokio::test]
    async fn test_engine_is_an_oracle() {
        let profile = profile(3, vec![("id", stats(0, 3, None))]);
        let engine = SuggestionEngine::default();
        let candidates = engine.propose(&profile).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(engine.name(), "suggestion_engine");
    }
}
