//! Core engine types: table handles, query execution, the validator and its
//! results.
//!
//! ## Overview
//!
//! - [`TableHandle`] names a registered relation and carries the DataFusion
//!   session used to query it.
//! - [`Validator`] evaluates an ordered rule set against a handle and returns
//!   a [`ValidationResult`].
//! - [`ExecutionConfig`] bounds concurrency and per-query run time for both
//!   the validator and the profiler.
//! - [`query`] holds the parameter-bound execution path every statement goes
//!   through.

mod config;
pub mod query;
mod result;
mod table;
mod validator;

pub use config::ExecutionConfig;
pub use result::{OutcomeStatus, RuleOutcome, ValidationResult};
pub use table::{ColumnDescriptor, TableHandle, TypeTag};
pub use validator::{Validator, ValidatorBuilder, ValidatorProgress};
