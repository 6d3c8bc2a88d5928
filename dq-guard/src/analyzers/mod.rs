//! Profiling and profile-driven rule suggestions.
//!
//! - [`Profiler`] computes a [`Profile`] of a table.
//! - [`SuggestionEngine`] turns a profile into rule candidates without any
//!   external service.

pub mod profile_types;
pub mod profiler;
pub mod suggestions;

pub use profile_types::{ColumnFailure, ColumnStats, NumericSummary, Profile};
pub use profiler::{Profiler, ProfilerBuilder, ProfilerProgress, ProgressCallback};
pub use suggestions::{
    CompletenessRule, RangeRule, SuggestionEngine, SuggestionRule, UniquenessRule,
};
