//! Shared table builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use dq_guard::core::TableHandle;

/// Registers `columns` as table `name` in a fresh context.
pub fn table(name: &str, columns: Vec<(&str, ArrayRef)>) -> TableHandle {
    table_in(SessionContext::new(), name, columns)
}

/// Registers `columns` as table `name` in `ctx`.
pub fn table_in(ctx: SessionContext, name: &str, columns: Vec<(&str, ArrayRef)>) -> TableHandle {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(col, array)| Field::new(*col, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .unwrap();

    let mem = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table(name, Arc::new(mem)).unwrap();
    TableHandle::new(ctx, name).unwrap()
}

pub fn ints(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from(values))
}

pub fn floats(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

pub fn bools(values: Vec<Option<bool>>) -> ArrayRef {
    Arc::new(BooleanArray::from(values))
}

pub fn strings(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

/// The reference table: `id = [1, 1, 2, 3]`, `age = [10, 20, NULL, 200]`,
/// `status = ["ok", "ok", "bad", "ok"]`.
pub fn people() -> TableHandle {
    table(
        "people",
        vec![
            ("id", ints(vec![Some(1), Some(1), Some(2), Some(3)])),
            ("age", ints(vec![Some(10), Some(20), None, Some(200)])),
            (
                "status",
                strings(vec![Some("ok"), Some("ok"), Some("bad"), Some("ok")]),
            ),
        ],
    )
}

/// `people` with the same columns and zero rows.
pub fn empty_people() -> TableHandle {
    table(
        "people",
        vec![
            ("id", ints(vec![])),
            ("age", ints(vec![])),
            ("status", strings(vec![])),
        ],
    )
}

/// A single-column table large enough that aggregates take well over a
/// millisecond. The context pins four partitions so plans do not depend on
/// the host's CPU count.
pub fn big_table(rows: i64) -> TableHandle {
    let values: ArrayRef = Arc::new(Int64Array::from_iter_values(0..rows));
    let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(4));
    table_in(ctx, "big", vec![("n", values)])
}
