//! `Range` evaluation.
//!
//! Bounds are inclusive and NULLs are never violations.
//!
//! On a numeric column the bounds are read as numbers, so `"0"` and `0` are
//! the same bound: integer bounds on an integer column compare exactly as
//! `BIGINT`, anything else as `DOUBLE`. On other columns numeric bounds
//! compare the column as `DOUBLE` and text bounds compare it as `VARCHAR`.

use datafusion::scalar::ScalarValue;

use super::{Literal, RuleTarget};
use crate::core::query::{BoundQuery, ParamBinder};
use crate::core::TypeTag;
use crate::prelude::*;

/// How a pair of range bounds compares against the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundFamily {
    /// Both bounds are integers
    Integer,
    /// Both bounds are numbers, at least one fractional
    Numeric,
    /// Both bounds are text
    Text,
}

impl BoundFamily {
    /// SQL type the bounds are cast to.
    pub fn sql_type(&self) -> &'static str {
        match self {
            BoundFamily::Integer => "BIGINT",
            BoundFamily::Numeric => "DOUBLE",
            BoundFamily::Text => "VARCHAR",
        }
    }
}

/// Returns the shared family of two bounds, or `None` if they do not share
/// one. Booleans belong to neither family.
pub fn bound_family(min: &Literal, max: &Literal) -> Option<BoundFamily> {
    match (min, max) {
        (Literal::Integer(_), Literal::Integer(_)) => Some(BoundFamily::Integer),
        (a, b) if a.is_numeric() && b.is_numeric() => Some(BoundFamily::Numeric),
        (Literal::Text(_), Literal::Text(_)) => Some(BoundFamily::Text),
        _ => None,
    }
}

fn bound_value(bound: &Literal, family: BoundFamily) -> ScalarValue {
    match family {
        BoundFamily::Integer => ScalarValue::Int64(bound.to_i64()),
        BoundFamily::Numeric => ScalarValue::Float64(bound.to_f64()),
        BoundFamily::Text => ScalarValue::Utf8(Some(bound.to_string())),
    }
}

/// Picks the comparison for bounds against a numeric column, parsing text
/// bounds as numbers.
fn numeric_column_family(
    target: &RuleTarget<'_>,
    min: &Literal,
    max: &Literal,
) -> Result<BoundFamily> {
    if target.integer_column && min.to_i64().is_some() && max.to_i64().is_some() {
        Ok(BoundFamily::Integer)
    } else if min.to_f64().is_some() && max.to_f64().is_some() {
        Ok(BoundFamily::Numeric)
    } else {
        Err(DqError::Configuration(format!(
            "Range bounds {min} and {max} are not numbers but column {} is numeric",
            target.column
        )))
    }
}

/// Counts non-null values outside `[min, max]`.
pub fn range_query(target: RuleTarget<'_>, min: &Literal, max: &Literal) -> Result<BoundQuery> {
    let family = match (target.column_type, bound_family(min, max)) {
        (TypeTag::Numeric, _) => numeric_column_family(&target, min, max)?,
        (_, Some(BoundFamily::Integer)) => BoundFamily::Numeric,
        (_, Some(family)) => family,
        (_, None) => {
            return Err(DqError::Configuration(format!(
                "Range bounds {min} and {max} must both be numbers or both be text"
            )))
        }
    };
    let sql_type = family.sql_type();

    let mut binder = ParamBinder::new();
    let lower = binder.bind(bound_value(min, family), sql_type);
    let upper = binder.bind(bound_value(max, family), sql_type);
    let value = match family {
        BoundFamily::Integer => target.column.to_string(),
        _ => format!("CAST({} AS {sql_type})", target.column),
    };

    let sql = format!(
        "SELECT COUNT(*) AS violations FROM {} \
         WHERE {col} IS NOT NULL AND ({value} < {lower} OR {value} > {upper})",
        target.relation,
        col = target.column,
    );
    Ok(binder.finish(sql))
}
