//! Prelude for commonly used types and traits in dq-guard.

pub use crate::analyzers::{Profile, Profiler};
pub use crate::constraints::{Literal, NullPolicy, Rule, RuleKind};
pub use crate::core::{ExecutionConfig, OutcomeStatus, TableHandle, ValidationResult, Validator};
pub use crate::error::{DqError, ErrorContext, Result};
pub use crate::logging::LogConfig;
pub use crate::oracle::{OracleBoundary, RuleOracle};
