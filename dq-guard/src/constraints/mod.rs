//! The rule vocabulary and the queries that evaluate each rule kind.
//!
//! A [`Rule`] targets one column and carries one [`RuleKind`]:
//!
//! - **`NotNull`** - no NULL values
//! - **`Unique`** - no non-null value occurs more than once
//! - **`Range`** - every non-null value lies within `[min, max]`
//! - **`AllowedValues`** - every value belongs to a fixed set
//!
//! Rules are plain data. [`validate_structure`] decides whether a rule is
//! well-formed enough to evaluate; the per-kind submodules turn a
//! well-formed rule into a parameter-bound aggregate query that returns one
//! violation count.
//!
//! ## JSON shape
//!
//! ```rust
//! use dq_guard::constraints::{Literal, Rule, RuleKind};
//!
//! let rule: Rule = serde_json::from_str(
//!     r#"{"name": "age_range", "type": "range", "column": "age", "min": 0, "max": 120}"#,
//! ).unwrap();
//!
//! assert_eq!(rule.column(), "age");
//! assert_eq!(
//!     rule.kind(),
//!     &RuleKind::Range { min: Some(Literal::Integer(0)), max: Some(Literal::Integer(120)) }
//! );
//! assert!(rule.is_structurally_valid());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::query::BoundQuery;
use crate::core::{ColumnDescriptor, TypeTag};
use crate::prelude::*;

pub mod completeness;
pub mod range;
pub mod uniqueness;
pub mod values;

pub use values::NullPolicy;

/// A scalar rule parameter.
///
/// Deserialization tries booleans, then integers, then floats, then text,
/// so `5` is an integer and `5.0` is a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// `true` or `false`
    Boolean(bool),
    /// A whole number that fits in 64 bits
    Integer(i64),
    /// Any other number
    Float(f64),
    /// A string, kept verbatim
    Text(String),
}

impl Literal {
    /// Returns true for integers and floats.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }

    /// Returns the value as a double for numeric literals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(v) => Some(*v as f64),
            Literal::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads the value as a 64-bit integer. Text is parsed; floats qualify
    /// only when they have no fractional part.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Literal::Integer(v) => Some(*v),
            Literal::Float(v) if v.fract() == 0.0 && v.abs() < 9.2e18 => Some(*v as i64),
            Literal::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads the value as a finite double, parsing text.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Literal::Text(v) => v.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            other => other.as_f64(),
        }
    }

    /// Reads the value as a boolean. Accepts `true`/`false` in any case and
    /// the integers `0` and `1`.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Literal::Boolean(v) => Some(*v),
            Literal::Integer(0) => Some(false),
            Literal::Integer(1) => Some(true),
            Literal::Text(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns false only for NaN or infinite floats.
    pub fn is_finite(&self) -> bool {
        match self {
            Literal::Float(v) => v.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(v) => write!(f, "{v}"),
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

/// The closed set of rule kinds and their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// The column contains no NULLs.
    NotNull,
    /// No non-null value appears more than once.
    Unique,
    /// Non-null values lie within `[min, max]`, bounds inclusive.
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Literal>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Literal>,
    },
    /// Values belong to `allowed`.
    AllowedValues {
        #[serde(default)]
        allowed: Vec<Literal>,
    },
}

impl RuleKind {
    /// Returns the parameterless tag for this kind.
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleKind::NotNull => RuleType::NotNull,
            RuleKind::Unique => RuleType::Unique,
            RuleKind::Range { .. } => RuleType::Range,
            RuleKind::AllowedValues { .. } => RuleType::AllowedValues,
        }
    }
}

/// The kind of a rule without its parameters, as reported in outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// `not_null`
    NotNull,
    /// `unique`
    Unique,
    /// `range`
    Range,
    /// `allowed_values`
    AllowedValues,
}

impl RuleType {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::NotNull => "not_null",
            RuleType::Unique => "unique",
            RuleType::Range => "range",
            RuleType::AllowedValues => "allowed_values",
        }
    }

    /// Parses a wire name, accepting the common spellings oracles produce.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "not_null" | "notnull" | "non_null" | "complete" => Some(RuleType::NotNull),
            "unique" | "uniqueness" => Some(RuleType::Unique),
            "range" | "between" => Some(RuleType::Range),
            "allowed_values" | "allowedvalues" | "allowed" | "in_set" | "accepted_values" => {
                Some(RuleType::AllowedValues)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declarative data-quality rule targeting one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    name: String,
    column: String,
    #[serde(flatten)]
    kind: RuleKind,
}

impl Rule {
    /// Creates a rule named `<type>_<column>`.
    pub fn new(column: impl Into<String>, kind: RuleKind) -> Self {
        let column = column.into();
        Self {
            name: format!("{}_{}", kind.rule_type(), column),
            column,
            kind,
        }
    }

    /// Creates a `NotNull` rule.
    pub fn not_null(column: impl Into<String>) -> Self {
        Self::new(column, RuleKind::NotNull)
    }

    /// Creates a `Unique` rule.
    pub fn unique(column: impl Into<String>) -> Self {
        Self::new(column, RuleKind::Unique)
    }

    /// Creates a `Range` rule with both bounds.
    pub fn range(
        column: impl Into<String>,
        min: impl Into<Literal>,
        max: impl Into<Literal>,
    ) -> Self {
        Self::new(
            column,
            RuleKind::Range {
                min: Some(min.into()),
                max: Some(max.into()),
            },
        )
    }

    /// Creates an `AllowedValues` rule.
    pub fn allowed_values<I, V>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self::new(
            column,
            RuleKind::AllowedValues {
                allowed: allowed.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Replaces the rule's label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Human label used in reports; not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column the rule checks, as written in the rule.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The rule kind and its parameters.
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// The rule kind without parameters.
    pub fn rule_type(&self) -> RuleType {
        self.kind.rule_type()
    }

    /// Describes why the rule cannot be evaluated, if it cannot.
    pub fn structural_error(&self) -> Option<&'static str> {
        if self.column.trim().is_empty() {
            return Some("rule column is empty");
        }

        match &self.kind {
            RuleKind::NotNull | RuleKind::Unique => None,
            RuleKind::Range { min, max } => match (min, max) {
                (Some(min), Some(max)) => {
                    if !(min.is_finite() && max.is_finite()) {
                        Some("range bounds must be finite")
                    } else if range::bound_family(min, max).is_none() {
                        Some("range bounds must both be numbers or both be text")
                    } else {
                        None
                    }
                }
                _ => Some("range rule requires both min and max"),
            },
            RuleKind::AllowedValues { allowed } => {
                if allowed.is_empty() {
                    Some("allowed_values rule requires a non-empty set")
                } else if !allowed.iter().all(Literal::is_finite) {
                    Some("allowed values must be finite")
                } else {
                    None
                }
            }
        }
    }

    /// Returns true if the rule can be evaluated.
    pub fn is_structurally_valid(&self) -> bool {
        self.structural_error().is_none()
    }
}

/// Returns true if `rule` is well-formed enough to evaluate.
///
/// This is a total, side-effect-free check of the rule's own shape. Whether
/// the column exists is only known when the rule runs.
pub fn validate_structure(rule: &Rule) -> bool {
    rule.is_structurally_valid()
}

/// Quoted names a rule query is built from.
#[derive(Debug, Clone, Copy)]
pub struct RuleTarget<'a> {
    /// Quoted relation name
    pub relation: &'a str,
    /// Quoted, schema-resolved column name
    pub column: &'a str,
    /// Declared type of the column; literals are coerced to it where it is
    /// numeric or boolean
    pub column_type: TypeTag,
    /// Whether the column holds integers; integer literals are then
    /// compared exactly instead of as doubles
    pub integer_column: bool,
}

impl<'a> RuleTarget<'a> {
    /// Builds a target for a schema-resolved column.
    pub fn new(relation: &'a str, column: &'a str, descriptor: &ColumnDescriptor) -> Self {
        Self {
            relation,
            column,
            column_type: descriptor.declared_type,
            integer_column: descriptor.is_integer(),
        }
    }
}

/// Builds the violation-count query for a structurally valid rule.
///
/// The query returns a single row whose first column is the violation count.
pub fn violation_query(
    rule: &Rule,
    target: RuleTarget<'_>,
    null_policy: NullPolicy,
) -> Result<BoundQuery> {
    match rule.kind() {
        RuleKind::NotNull => Ok(completeness::not_null_query(target)),
        RuleKind::Unique => Ok(uniqueness::unique_query(target)),
        RuleKind::Range {
            min: Some(min),
            max: Some(max),
        } => range::range_query(target, min, max),
        RuleKind::Range { .. } => Err(DqError::Internal(format!(
            "Rule '{}' is missing a range bound",
            rule.name()
        ))),
        RuleKind::AllowedValues { allowed } => {
            values::allowed_values_query(target, allowed, null_policy)
        }
    }
}
