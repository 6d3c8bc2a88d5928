//! `Unique` evaluation.
//!
//! The violation count is the number of rows whose value occurs more than
//! once, so `[1, 1, 2, 3]` has two violations. NULLs are never duplicates of
//! each other.

use super::RuleTarget;
use crate::core::query::BoundQuery;

/// Counts rows that belong to a duplicated non-null value.
pub fn unique_query(target: RuleTarget<'_>) -> BoundQuery {
    BoundQuery::new(format!(
        "SELECT COALESCE(SUM(dup.n), 0) AS violations FROM \
         (SELECT COUNT(*) AS n FROM {rel} WHERE {col} IS NOT NULL GROUP BY {col} HAVING COUNT(*) > 1) AS dup",
        rel = target.relation,
        col = target.column
    ))
}
