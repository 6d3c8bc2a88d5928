//! Profile, propose, admit, and validate in one pass.

mod common;

use async_trait::async_trait;
use common::{floats, people, table};
use dq_guard::analyzers::{Profile, SuggestionEngine};
use dq_guard::oracle::{parse_oracle_output, proposal_prompt, RecordedOracle, RuleCandidate};
use dq_guard::prelude::*;

/// An oracle that always fails, standing in for an unreachable model.
struct UnreachableOracle;

#[async_trait]
impl RuleOracle for UnreachableOracle {
    async fn propose(&self, _profile: &Profile) -> Result<Vec<RuleCandidate>> {
        Err(DqError::OracleOutput("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

#[tokio::test]
async fn test_suggestions_validate_cleanly_against_their_source() {
    let table = people();
    let profile = Profiler::new().profile(&table).await.unwrap();

    let admission = OracleBoundary::new()
        .propose(&SuggestionEngine::with_default_rules(), &profile)
        .await
        .unwrap();
    assert!(admission.is_clean());
    assert!(!admission.rules.is_empty());

    // Rules derived from a table's own profile hold on that table.
    let result = Validator::new()
        .validate(&table, &admission.rules)
        .await
        .unwrap();
    assert!(result.is_success(), "{:#?}", result.failures().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_recorded_model_response() {
    let response = r#"Sure! Here are some rules:
```json
[
  {"name": "id_not_null", "type": "not_null", "column": "id"},
  {"name": "id_unique", "type": "unique", "column": "id"},
  {"name": "age_range", "type": "range", "column": "age", "min": "0", "max": "100"},
  {"name": "status_values", "type": "allowed_values", "column": "status", "allowed": ["ok"]},
  {"name": "age_floor", "type": "range", "column": "age", "min": 0},
  {"name": "email_format", "type": "regex", "column": "email", "pattern": ".+@.+"},
  {"name": "ghost", "type": "not_null", "column": "does_not_exist"}
]
```"#;

    let table = people();
    let profile = Profiler::new().profile(&table).await.unwrap();
    let admission = OracleBoundary::new()
        .propose(&RecordedOracle::new(response), &profile)
        .await
        .unwrap();

    let rejected: Vec<usize> = admission.rejected.iter().map(|r| r.index).collect();
    assert_eq!(rejected, vec![4, 5]);

    let result = Validator::new()
        .validate(&table, &admission.rules)
        .await
        .unwrap();

    assert_eq!(result.total_rules, 5);
    assert_eq!(result.failed_rules, 3);
    assert_eq!(result.unevaluable_rules, 1);
    let statuses: Vec<OutcomeStatus> = result.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Pass,
            OutcomeStatus::Fail,
            OutcomeStatus::Fail,
            OutcomeStatus::Fail,
            OutcomeStatus::Error,
        ]
    );
}

#[tokio::test]
async fn test_quoted_numbers_in_allowed_set_match_numeric_column() {
    let response =
        r#"[{"type": "allowed_values", "column": "score", "allowed": ["1", "2", "2.5"]}]"#;

    let table = table(
        "readings",
        vec![("score", floats(vec![Some(1.0), Some(2.0), Some(2.5)]))],
    );
    let profile = Profiler::new().profile(&table).await.unwrap();
    let admission = OracleBoundary::new()
        .propose(&RecordedOracle::new(response), &profile)
        .await
        .unwrap();
    assert!(admission.is_clean());

    let result = Validator::new()
        .validate(&table, &admission.rules)
        .await
        .unwrap();
    assert_eq!(result.results[0].status, OutcomeStatus::Pass);
    assert_eq!(result.results[0].violation_count, 0);
}

#[tokio::test]
async fn test_oracle_failure_is_surfaced() {
    let profile = Profiler::new().profile(&people()).await.unwrap();
    let err = OracleBoundary::new()
        .propose(&UnreachableOracle, &profile)
        .await
        .unwrap_err();
    assert!(matches!(err, DqError::OracleOutput(_)));
}

#[tokio::test]
async fn test_prompt_carries_profile() {
    let profile = Profiler::new().profile(&people()).await.unwrap();
    let prompt = proposal_prompt(&profile).unwrap();
    assert!(prompt.contains("\"row_count\": 4"));
    assert!(prompt.contains("not_null, unique, range, allowed_values"));
}

#[test]
fn test_prose_only_response_is_unusable() {
    assert!(parse_oracle_output("I'm sorry, I can't do that.").is_err());
}
