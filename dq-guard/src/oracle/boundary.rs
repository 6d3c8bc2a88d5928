//! Admission of oracle candidates as rules.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{RuleCandidate, RuleOracle};
use crate::analyzers::Profile;
use crate::constraints::{Literal, Rule, RuleKind, RuleType};
use crate::prelude::*;

/// A candidate that did not become a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position of the candidate in the oracle's output
    pub index: usize,
    /// The candidate's name, if it had one
    pub name: Option<String>,
    /// What made the candidate unusable
    pub reason: String,
}

/// Rules admitted from one batch of candidates, plus what was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Admission {
    /// Well-formed rules in candidate order
    pub rules: Vec<Rule>,
    /// Candidates that were dropped, in candidate order
    pub rejected: Vec<Rejection>,
}

impl Admission {
    /// Returns true if every candidate was admitted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The structural filter between rule proposal and validation.
#[derive(Debug, Clone, Default)]
pub struct OracleBoundary {
    min_confidence: Option<f64>,
}

impl OracleBoundary {
    /// Creates a boundary that admits candidates at any confidence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops candidates whose stated confidence is below `threshold`.
    /// Candidates without a confidence are kept.
    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = Some(threshold.clamp(0.0, 1.0));
        self
    }

    /// Coerces each candidate into a rule, keeping only well-formed ones.
    pub fn admit(&self, candidates: &[RuleCandidate]) -> Admission {
        let mut rules = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            match self.coerce(candidate) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    debug!(
                        candidate.index = index,
                        candidate.name = ?candidate.name,
                        candidate.reason = %reason,
                        "Rejected rule candidate"
                    );
                    rejected.push(Rejection {
                        index,
                        name: candidate.name.clone(),
                        reason,
                    });
                }
            }
        }

        if !rejected.is_empty() {
            warn!(
                candidates.admitted = rules.len(),
                candidates.rejected = rejected.len(),
                "Some rule candidates were rejected"
            );
        }

        Admission { rules, rejected }
    }

    /// Asks `oracle` for candidates and admits them.
    #[instrument(
        skip(self, oracle, profile),
        fields(oracle.name = oracle.name(), table.relation = %profile.table)
    )]
    pub async fn propose<O>(&self, oracle: &O, profile: &Profile) -> Result<Admission>
    where
        O: RuleOracle + ?Sized,
    {
        let candidates = oracle.propose(profile).await?;
        Ok(self.admit(&candidates))
    }

    /// Converts one candidate, or explains why it cannot be converted.
    pub fn coerce(&self, candidate: &RuleCandidate) -> std::result::Result<Rule, String> {
        if let (Some(threshold), Some(confidence)) = (self.min_confidence, candidate.confidence) {
            if confidence < threshold {
                return Err(format!(
                    "confidence {confidence} is below the minimum {threshold}"
                ));
            }
        }

        let kind_name = non_empty(candidate.kind.as_deref()).ok_or("missing rule type")?;
        let rule_type = RuleType::parse(kind_name)
            .ok_or_else(|| format!("unrecognized rule type '{kind_name}'"))?;
        let column = non_empty(candidate.column.as_deref()).ok_or("missing column")?;

        let kind = match rule_type {
            RuleType::NotNull => RuleKind::NotNull,
            RuleType::Unique => RuleKind::Unique,
            RuleType::Range => RuleKind::Range {
                min: bound(candidate.min.as_ref())?,
                max: bound(candidate.max.as_ref())?,
            },
            RuleType::AllowedValues => RuleKind::AllowedValues {
                allowed: allowed_set(candidate.allowed.as_ref())?,
            },
        };

        let mut rule = Rule::new(column, kind);
        if let Some(name) = non_empty(candidate.name.as_deref()) {
            rule = rule.with_name(name);
        }

        match rule.structural_error() {
            None => Ok(rule),
            Some(reason) => Err(reason.to_string()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reads a number-like string as a number.
fn parse_numeric(text: &str) -> Option<Literal> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(Literal::Integer(v));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Literal::Float)
}

fn scalar(value: &Value, numeric_strings: bool) -> std::result::Result<Option<Literal>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(Literal::Boolean(*b))),
        Value::Number(n) => Ok(n
            .as_i64()
            .map(Literal::Integer)
            .or_else(|| n.as_f64().map(Literal::Float))),
        Value::String(s) if numeric_strings => {
            Ok(Some(parse_numeric(s).unwrap_or_else(|| Literal::Text(s.clone()))))
        }
        Value::String(s) => Ok(Some(Literal::Text(s.clone()))),
        Value::Array(_) | Value::Object(_) => Err("expected a scalar value".to_string()),
    }
}

fn bound(value: Option<&Value>) -> std::result::Result<Option<Literal>, String> {
    match value {
        None => Ok(None),
        Some(v) => scalar(v, true).map_err(|e| format!("range bound: {e}")),
    }
}

fn allowed_set(value: Option<&Value>) -> std::result::Result<Vec<Literal>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => {
            let mut allowed = Vec::with_capacity(items.len());
            for item in items {
                if let Some(literal) =
                    scalar(item, false).map_err(|e| format!("allowed value: {e}"))?
                {
                    allowed.push(literal);
                }
            }
            Ok(allowed)
        }
        Some(single) => Ok(scalar(single, false)?.into_iter().collect()),
    }
}
