//! # dq-guard - Table Profiling and Rule Validation
//!
//! dq-guard profiles a table registered with DataFusion, proposes data-quality
//! rules from the profile, and checks the table against a rule set, producing
//! auditable per-rule violation counts.
//!
//! ## Quick Start
//!
//! ```rust
//! use dq_guard::prelude::*;
//! use dq_guard::analyzers::SuggestionEngine;
//! use datafusion::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let ctx = SessionContext::new();
//! ctx.sql("CREATE TABLE people (id BIGINT, age BIGINT, status VARCHAR) AS VALUES \
//!          (1, 10, 'ok'), (1, 20, 'ok'), (2, NULL, 'bad'), (3, 200, 'ok')")
//!     .await?;
//! let table = TableHandle::new(ctx, "people")?;
//!
//! // Profile the table
//! let profile = Profiler::new().profile(&table).await?;
//! println!("{}", profile.to_json()?);
//!
//! // Propose rules and keep only well-formed ones
//! let admission = OracleBoundary::new()
//!     .propose(&SuggestionEngine::with_default_rules(), &profile)
//!     .await?;
//!
//! // Add hand-written rules and validate
//! let mut rules = admission.rules;
//! rules.push(Rule::range("age", 0, 100));
//! rules.push(Rule::allowed_values("status", ["ok"]));
//!
//! let result = Validator::new().validate(&table, &rules).await?;
//! for outcome in &result.results {
//!     println!("{:?} {} ({} violations)", outcome.status, outcome.name, outcome.violation_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Rule Kinds
//!
//! | kind | violation count |
//! | --- | --- |
//! | `not_null` | rows where the column is NULL |
//! | `unique` | rows whose non-null value occurs more than once |
//! | `range` | non-null values below `min` or above `max` |
//! | `allowed_values` | values outside the set (NULL handling per [`NullPolicy`](constraints::NullPolicy)) |
//!
//! ## Safety of Generated Queries
//!
//! Rules may come from an untrusted oracle. Relation names are validated
//! against a strict identifier grammar, rule columns are resolved against the
//! relation's real schema before being quoted, and every rule parameter is
//! bound as a query parameter rather than spliced into SQL text.
//!
//! ## Architecture
//!
//! - **`core`**: table handles, query execution, the [`Validator`](core::Validator) and its results
//! - **`constraints`**: the rule model and per-kind violation queries
//! - **`analyzers`**: the [`Profiler`](analyzers::Profiler) and the suggestion engine
//! - **`oracle`**: the rule-proposal interface and the structural boundary
//! - **`security`**: identifier validation and quoting
//! - **`logging`**: logging presets and subscriber setup

pub mod analyzers;
pub mod constraints;
pub mod core;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod prelude;
pub mod security;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
