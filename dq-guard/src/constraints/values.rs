//! `AllowedValues` evaluation.

use datafusion::scalar::ScalarValue;
use serde::{Deserialize, Serialize};

use super::{Literal, RuleTarget};
use crate::core::query::{BoundQuery, ParamBinder};
use crate::core::TypeTag;
use crate::prelude::*;

/// How NULLs are treated by set-membership rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// NULLs are never violations.
    #[default]
    Exempt,
    /// NULLs count as values outside the set.
    Violation,
}

/// How the column and the set members are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Integer,
    Numeric,
    Boolean,
    Text,
}

impl Comparison {
    /// Numeric and boolean columns read the set as their own type; other
    /// columns compare as `DOUBLE` when every member is a number and as
    /// `VARCHAR` otherwise.
    fn for_target(target: &RuleTarget<'_>, allowed: &[Literal]) -> Self {
        match target.column_type {
            TypeTag::Numeric
                if target.integer_column && allowed.iter().all(|v| v.to_i64().is_some()) =>
            {
                Comparison::Integer
            }
            TypeTag::Numeric => Comparison::Numeric,
            TypeTag::Boolean => Comparison::Boolean,
            _ if allowed.iter().all(Literal::is_numeric) => Comparison::Numeric,
            _ => Comparison::Text,
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Comparison::Integer => "BIGINT",
            Comparison::Numeric => "DOUBLE",
            Comparison::Boolean => "BOOLEAN",
            Comparison::Text => "VARCHAR",
        }
    }

    /// Converts a member, or `None` if it cannot equal any value of the
    /// compared type.
    fn scalar(&self, value: &Literal) -> Option<ScalarValue> {
        match self {
            Comparison::Integer => value.to_i64().map(|v| ScalarValue::Int64(Some(v))),
            Comparison::Numeric => value.to_f64().map(|v| ScalarValue::Float64(Some(v))),
            Comparison::Boolean => value.to_bool().map(|v| ScalarValue::Boolean(Some(v))),
            Comparison::Text => Some(ScalarValue::Utf8(Some(value.to_string()))),
        }
    }
}

/// Counts values not in `allowed`.
///
/// On a numeric column text members are parsed, so `"1"` matches `1.0`; an
/// integer set on an integer column compares exactly. On a boolean column
/// `"true"` and `"false"` are read as booleans. Members that cannot be read
/// as the column's type never match. Other columns compare as `DOUBLE` when
/// the set is all numbers, and as `VARCHAR` with every member rendered as
/// text otherwise.
pub fn allowed_values_query(
    target: RuleTarget<'_>,
    allowed: &[Literal],
    null_policy: NullPolicy,
) -> Result<BoundQuery> {
    if allowed.is_empty() {
        return Err(DqError::Configuration(
            "Allowed-values set cannot be empty".to_string(),
        ));
    }

    let comparison = Comparison::for_target(&target, allowed);
    let sql_type = comparison.sql_type();

    let mut binder = ParamBinder::new();
    let placeholders: Vec<String> = allowed
        .iter()
        .filter_map(|value| comparison.scalar(value))
        .map(|value| binder.bind(value, sql_type))
        .collect();

    let value = match comparison {
        Comparison::Integer | Comparison::Boolean => target.column.to_string(),
        _ => format!("CAST({} AS {sql_type})", target.column),
    };
    let outside = if placeholders.is_empty() {
        "TRUE".to_string()
    } else {
        format!("{value} NOT IN ({})", placeholders.join(", "))
    };
    let predicate = match null_policy {
        NullPolicy::Exempt => format!("{} IS NOT NULL AND {outside}", target.column),
        NullPolicy::Violation => format!("{} IS NULL OR {outside}", target.column),
    };

    let sql = format!(
        "SELECT COUNT(*) AS violations FROM {} WHERE {predicate}",
        target.relation
    );
    Ok(binder.finish(sql))
}
