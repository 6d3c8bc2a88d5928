//! Rule proposal from profiles.
//!
//! A [`RuleOracle`] looks at a [`Profile`] and proposes rule-like records.
//! Oracle output is untrusted: it may come from a language model, a file, or
//! a person. Nothing it proposes reaches the validator before passing
//! [`OracleBoundary::admit`], which coerces each [`RuleCandidate`] into a
//! [`Rule`](crate::constraints::Rule) or rejects it with a reason.
//!
//! ```rust
//! use dq_guard::oracle::{parse_oracle_output, OracleBoundary};
//!
//! let text = concat!(
//!     "Here are the rules:\n```json\n[",
//!     r#"{"name": "age_ok", "type": "range", "column": "age", "min": "0", "max": 120},"#,
//!     r#"{"type": "not_null", "column": "id"},"#,
//!     r#"{"type": "regex", "column": "email"}"#,
//!     "]\n```",
//! );
//!
//! let candidates = parse_oracle_output(text).unwrap();
//! let admission = OracleBoundary::new().admit(&candidates);
//!
//! assert_eq!(admission.rules.len(), 2);
//! assert_eq!(admission.rules[1].name(), "not_null_id");
//! assert_eq!(admission.rejected[0].index, 2);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::analyzers::Profile;
use crate::constraints::{Literal, Rule, RuleKind};
use crate::prelude::*;

mod boundary;
mod parse;

pub use boundary::{Admission, OracleBoundary, Rejection};
pub use parse::parse_oracle_output;

/// Something that proposes rules for a profiled table.
#[async_trait]
pub trait RuleOracle: Send + Sync {
    /// Proposes candidate rules for `profile`.
    async fn propose(&self, profile: &Profile) -> Result<Vec<RuleCandidate>>;

    /// Returns the name of this oracle for logging.
    fn name(&self) -> &str;
}

/// A loosely-typed rule record as an oracle emits it.
///
/// Every field is optional and scalar fields accept strings, numbers, or
/// booleans, so one malformed field never prevents reading the rest of a
/// response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCandidate {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        alias = "kind",
        alias = "rule_type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, alias = "values", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Value>,
    /// How sure the oracle is, in `[0, 1]`
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Free-text justification
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RuleCandidate {
    /// Creates a candidate of `kind` for `column`.
    pub fn new(kind: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            column: Some(column.into()),
            ..Self::default()
        }
    }

    /// Reads a candidate from any JSON value. Values that are not objects
    /// yield an empty candidate, which the boundary rejects.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_bounds(mut self, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    pub fn with_allowed(mut self, allowed: impl Into<Value>) -> Self {
        self.allowed = Some(allowed.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Boolean(v) => Value::from(*v),
        Literal::Integer(v) => Value::from(*v),
        Literal::Float(v) => Value::from(*v),
        Literal::Text(v) => Value::from(v.as_str()),
    }
}

impl From<&Rule> for RuleCandidate {
    fn from(rule: &Rule) -> Self {
        let mut candidate =
            RuleCandidate::new(rule.rule_type().as_str(), rule.column()).with_name(rule.name());
        match rule.kind() {
            RuleKind::NotNull | RuleKind::Unique => {}
            RuleKind::Range { min, max } => {
                candidate.min = min.as_ref().map(literal_to_value);
                candidate.max = max.as_ref().map(literal_to_value);
            }
            RuleKind::AllowedValues { allowed } => {
                candidate.allowed =
                    Some(Value::Array(allowed.iter().map(literal_to_value).collect()));
            }
        }
        candidate
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// An oracle that replays a recorded response.
///
/// Useful for running the validation half of a pipeline offline against a
/// response captured from a live oracle.
#[derive(Debug, Clone)]
pub struct RecordedOracle {
    response: String,
}

impl RecordedOracle {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl RuleOracle for RecordedOracle {
    async fn propose(&self, _profile: &Profile) -> Result<Vec<RuleCandidate>> {
        parse_oracle_output(&self.response)
    }

    fn name(&self) -> &str {
        "recorded"
    }
}

/// Renders the instructions a language-model oracle is given for `profile`.
pub fn proposal_prompt(profile: &Profile) -> Result<String> {
    let profile_json = serde_json::to_string_pretty(profile)?;
    Ok(format!(
        "You are a data quality expert.\n\
         \n\
         Given this table profile, propose data quality rules.\n\
         Return only a JSON list of rules. Each rule has the fields:\n\
         - name\n\
         - type (one of: not_null, unique, range, allowed_values)\n\
         - column\n\
         - min and max (required for range)\n\
         - allowed (a list, required for allowed_values)\n\
         \n\
         Profile:\n\
         {profile_json}\n"
    ))
}
