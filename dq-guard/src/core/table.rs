//! Table handles and schema introspection.
//!
//! A [`TableHandle`] names one registered relation and carries the DataFusion
//! [`SessionContext`] used to query it. The profiler and validator only ever
//! borrow a handle; registering, replacing, or dropping the relation is the
//! caller's business.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::DataType;
use datafusion::common::TableReference;
use datafusion::error::DataFusionError;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::prelude::*;
use crate::security::SqlSecurity;

/// Coarse classification of a column's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// Integers, floating point, and decimals
    Numeric,
    /// Character data
    Textual,
    /// Dates, times, timestamps, durations, and intervals
    Temporal,
    /// True/false values
    Boolean,
    /// Anything else (nested, binary, null-typed columns)
    Other,
}

impl TypeTag {
    /// Classifies an Arrow data type.
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => TypeTag::Numeric,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => TypeTag::Textual,
            DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_)
            | DataType::Interval(_) => TypeTag::Temporal,
            DataType::Boolean => TypeTag::Boolean,
            DataType::Dictionary(_, value) => Self::from_data_type(value),
            _ => TypeTag::Other,
        }
    }

    /// Returns true if values of this type can be averaged.
    ///
    /// `Other` is optimistic: the summary query is attempted and dropped if
    /// the engine rejects it.
    pub fn may_average(&self) -> bool {
        matches!(self, TypeTag::Numeric | TypeTag::Other)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Numeric => "numeric",
            TypeTag::Textual => "textual",
            TypeTag::Temporal => "temporal",
            TypeTag::Boolean => "boolean",
            TypeTag::Other => "other",
        };
        f.write_str(name)
    }
}

/// A column as declared by the relation's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name exactly as the schema spells it
    pub name: String,
    /// Coarse type classification
    pub declared_type: TypeTag,
    /// The engine's name for the type, e.g. `Int64`
    pub sql_type: String,
}

impl ColumnDescriptor {
    /// Returns the column name quoted for use in SQL.
    pub fn quoted(&self) -> Result<String> {
        SqlSecurity::quote_identifier(&self.name)
    }

    /// Returns true for signed and unsigned integer columns.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.sql_type.as_str(),
            "Int8" | "Int16" | "Int32" | "Int64" | "UInt8" | "UInt16" | "UInt32" | "UInt64"
        )
    }
}

/// A read-only reference to one registered relation.
///
/// The relation name is read the way DataFusion reads an unquoted SQL
/// identifier: `People` and `people` name the same relation, which is what
/// `register_table("People", ..)` registers.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::TableHandle;
/// use datafusion::prelude::SessionContext;
///
/// let handle = TableHandle::new(SessionContext::new(), "orders").unwrap();
/// assert_eq!(handle.relation(), "orders");
///
/// assert!(TableHandle::new(SessionContext::new(), "orders; DROP TABLE x").is_err());
/// ```
#[derive(Clone)]
pub struct TableHandle {
    relation: Arc<str>,
    reference: TableReference,
    quoted: Arc<str>,
    ctx: SessionContext,
}

impl fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableHandle")
            .field("relation", &self.relation)
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl TableHandle {
    /// Creates a handle for `relation` in `ctx`.
    ///
    /// The relation name is validated but its existence is not checked here;
    /// a missing relation surfaces as [`DqError::TableNotFound`] on first use.
    pub fn new(ctx: SessionContext, relation: impl Into<String>) -> Result<Self> {
        let relation = relation.into();
        SqlSecurity::validate_identifier(&relation)?;
        let quoted = SqlSecurity::escape_identifier(&relation.to_ascii_lowercase())?;
        Ok(Self {
            reference: TableReference::from(relation.as_str()),
            relation: relation.into(),
            quoted: quoted.into(),
            ctx,
        })
    }

    /// Returns the relation name as supplied.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Returns the normalized relation name quoted for use in a `FROM` clause.
    pub fn quoted_relation(&self) -> &str {
        &self.quoted
    }

    /// Returns the query-execution context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn table_reference(&self) -> TableReference {
        self.reference.clone()
    }

    /// Checks that the relation is registered.
    pub fn ensure_exists(&self) -> Result<()> {
        match self.ctx.table_exist(self.table_reference()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(DqError::table_not_found(self.relation.as_ref())),
            Err(DataFusionError::Plan(_)) => {
                Err(DqError::table_not_found(self.relation.as_ref()))
            }
            Err(e) => Err(DqError::execution_unavailable(
                self.relation.as_ref(),
                e.to_string(),
            )),
        }
    }

    /// Reads the relation's columns in schema order.
    #[instrument(skip(self), fields(table.relation = %self.relation))]
    pub async fn describe(&self) -> Result<Vec<ColumnDescriptor>> {
        self.ensure_exists()?;

        let df = self
            .ctx
            .table(self.table_reference())
            .await
            .map_err(|e| crate::core::query::classify_table_error(&self.relation, e))?;

        let columns: Vec<ColumnDescriptor> = df
            .schema()
            .fields()
            .iter()
            .map(|field| ColumnDescriptor {
                name: field.name().clone(),
                declared_type: TypeTag::from_data_type(field.data_type()),
                sql_type: field.data_type().to_string(),
            })
            .collect();

        debug!(
            table.relation = %self.relation,
            table.columns = columns.len(),
            "Described relation schema"
        );

        Ok(columns)
    }

    /// Resolves a user-supplied column name against the real schema.
    ///
    /// An exact match wins; otherwise a single case-insensitive match is
    /// accepted. Anything else is [`DqError::ColumnNotFound`].
    pub fn resolve_column<'a>(
        &self,
        schema: &'a [ColumnDescriptor],
        column: &str,
    ) -> Result<&'a ColumnDescriptor> {
        if let Some(exact) = schema.iter().find(|c| c.name == column) {
            return Ok(exact);
        }

        let mut folded = schema
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(column));
        match (folded.next(), folded.next()) {
            (Some(only), None) => Ok(only),
            _ => Err(DqError::column_not_found(self.relation.as_ref(), column)),
        }
    }
}
