//! Common test fixtures for profiling and validation scenarios.
//!
//! Every fixture registers an in-memory table with a fresh
//! [`SessionContext`] and returns a [`TableHandle`] for it.

use crate::core::TableHandle;
use crate::error::Result;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

fn people_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("age", DataType::Int64, true),
        Field::new("status", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
    ]))
}

fn register(name: &str, schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<TableHandle> {
    let ctx = SessionContext::new();
    let table = MemTable::try_new(schema, vec![batches])?;
    ctx.register_table(name, Arc::new(table))?;
    TableHandle::new(ctx, name)
}

/// A small `people` table with one duplicate id, one NULL age, one age
/// above 100, and one status outside `{"ok"}`.
pub fn create_people_table() -> Result<TableHandle> {
    let schema = people_schema();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 1, 2, 3])),
            Arc::new(Int64Array::from(vec![Some(10), Some(20), None, Some(200)])),
            Arc::new(StringArray::from(vec!["ok", "ok", "bad", "ok"])),
            Arc::new(Float64Array::from(vec![0.5, 0.75, 0.25, 1.0])),
        ],
    )?;
    register("people", schema, vec![batch])
}

/// A `people` table with the usual columns and no rows.
pub fn create_empty_table() -> Result<TableHandle> {
    let schema = people_schema();
    register("people", schema.clone(), vec![RecordBatch::new_empty(schema)])
}

/// A `people` table of `rows` rows split over batches of 8192.
///
/// Ids are unique, every 50th age is NULL, and statuses cycle through
/// three values.
pub fn create_large_table(rows: usize) -> Result<TableHandle> {
    const BATCH_SIZE: usize = 8192;
    const STATUSES: [&str; 3] = ["ok", "pending", "bad"];

    let schema = people_schema();
    let mut batches = Vec::new();
    let mut start = 0;
    while start < rows {
        let end = (start + BATCH_SIZE).min(rows);
        let ids: Vec<i64> = (start..end).map(|i| i as i64).collect();
        let ages: Vec<Option<i64>> = (start..end)
            .map(|i| if i % 50 == 0 { None } else { Some((i % 90) as i64) })
            .collect();
        let statuses: Vec<&str> = (start..end).map(|i| STATUSES[i % 3]).collect();
        let scores: Vec<f64> = (start..end).map(|i| (i % 100) as f64 / 100.0).collect();

        batches.push(RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(Int64Array::from(ages)),
                Arc::new(StringArray::from(statuses)),
                Arc::new(Float64Array::from(scores)),
            ],
        )?);
        start = end;
    }

    if batches.is_empty() {
        batches.push(RecordBatch::new_empty(schema.clone()));
    }
    register("people", schema, batches)
}
