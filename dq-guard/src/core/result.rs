//! Outcome types produced by the validator.

use serde::{Deserialize, Serialize};

use crate::constraints::{Rule, RuleType};
use crate::prelude::*;

/// The status of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    /// The rule found no violations
    Pass,
    /// The rule found at least one violation
    Fail,
    /// The rule could not be evaluated
    Error,
}

impl OutcomeStatus {
    /// Returns true for `PASS`.
    pub fn is_pass(&self) -> bool {
        matches!(self, OutcomeStatus::Pass)
    }

    /// Returns true for `FAIL`.
    pub fn is_fail(&self) -> bool {
        matches!(self, OutcomeStatus::Fail)
    }

    /// Returns true for `ERROR`.
    pub fn is_error(&self) -> bool {
        matches!(self, OutcomeStatus::Error)
    }
}

/// The result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Label of the evaluated rule
    pub name: String,
    /// Kind of the evaluated rule
    #[serde(rename = "type")]
    pub kind: RuleType,
    /// Column the rule targeted, as written in the rule
    pub column: String,
    /// PASS, FAIL, or ERROR
    pub status: OutcomeStatus,
    /// Number of offending rows; zero for ERROR outcomes
    pub violation_count: u64,
    /// Why the rule could not be evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleOutcome {
    /// An outcome for a rule whose violation query ran.
    pub fn evaluated(rule: &Rule, violation_count: u64) -> Self {
        Self {
            name: rule.name().to_string(),
            kind: rule.rule_type(),
            column: rule.column().to_string(),
            status: if violation_count == 0 {
                OutcomeStatus::Pass
            } else {
                OutcomeStatus::Fail
            },
            violation_count,
            error: None,
        }
    }

    /// An outcome for a rule that could not be evaluated.
    pub fn errored(rule: &Rule, error: &DqError) -> Self {
        Self {
            name: rule.name().to_string(),
            kind: rule.rule_type(),
            column: rule.column().to_string(),
            status: OutcomeStatus::Error,
            violation_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Per-rule outcomes plus aggregate counts for one validation run.
///
/// The counts are derived from `results` on construction:
/// `total_rules == results.len()` and `failed_rules` is the number of FAIL
/// outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Outcomes in the order the rules were supplied
    pub results: Vec<RuleOutcome>,
    /// Number of evaluated rules
    pub total_rules: usize,
    /// Number of FAIL outcomes
    pub failed_rules: usize,
    /// Number of ERROR outcomes
    pub unevaluable_rules: usize,
    /// Rules dropped before evaluation because they were malformed
    pub structurally_invalid: usize,
    /// Whether the run stopped early on request
    #[serde(default)]
    pub cancelled: bool,
}

impl ValidationResult {
    /// Builds a result, deriving the aggregate counts from `results`.
    pub fn new(results: Vec<RuleOutcome>, structurally_invalid: usize, cancelled: bool) -> Self {
        let failed_rules = results.iter().filter(|r| r.status.is_fail()).count();
        let unevaluable_rules = results.iter().filter(|r| r.status.is_error()).count();
        Self {
            total_rules: results.len(),
            failed_rules,
            unevaluable_rules,
            structurally_invalid,
            cancelled,
            results,
        }
    }

    /// A result for a run with no rules.
    pub fn empty(structurally_invalid: usize) -> Self {
        Self::new(Vec::new(), structurally_invalid, false)
    }

    /// Returns true when every evaluated rule passed and the run completed.
    pub fn is_success(&self) -> bool {
        self.failed_rules == 0 && self.unevaluable_rules == 0 && !self.cancelled
    }

    /// Outcomes with status FAIL.
    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.results.iter().filter(|r| r.status.is_fail())
    }

    /// Outcomes with status ERROR.
    pub fn errors(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.results.iter().filter(|r| r.status.is_error())
    }

    /// Serializes the result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
