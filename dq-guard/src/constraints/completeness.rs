//! `NotNull` evaluation.

use super::RuleTarget;
use crate::core::query::BoundQuery;

/// Counts NULL values in the target column.
pub fn not_null_query(target: RuleTarget<'_>) -> BoundQuery {
    BoundQuery::new(format!(
        "SELECT COUNT(*) AS violations FROM {} WHERE {} IS NULL",
        target.relation, target.column
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{extract_count, run_query};
    use crate::core::{TableHandle, TypeTag};
    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use datafusion::datasource::MemTable;
    use datafusion::prelude::*;
    use std::sync::Arc;

    async fn violations(values: Vec<Option<&str>>) -> u64 {
        let ctx = SessionContext::new();
        let schema = Arc::new(Schema::new(vec![Field::new("email", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(values))],
        )
        .unwrap();
        let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
        ctx.register_table("data", Arc::new(table)).unwrap();

        let handle = TableHandle::new(ctx, "data").unwrap();
        let query = not_null_query(RuleTarget {
            relation: handle.quoted_relation(),
            column: "\"email\"",
            column_type: TypeTag::Textual,
            integer_column: false,
        });
        let batches = run_query(&handle, &query, None).await.unwrap();
        extract_count(&batches, 0, "violations").unwrap()
    }

    #[tokio::test]
    async fn test_counts_nulls() {
        assert_eq!(violations(vec![Some("a"), None, Some("c"), None]).await, 2);
    }

    #[tokio::test]
    async fn test_complete_column() {
        assert_eq!(violations(vec![Some("a"), Some("b")]).await, 0);
    }

    #[tokio::test]
    async fn test_empty_string_is_not_null() {
        assert_eq!(violations(vec![Some(""), Some("b")]).await, 0);
    }
}
