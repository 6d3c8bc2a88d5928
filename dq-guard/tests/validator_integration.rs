//! End-to-end validation behaviour against in-memory and CSV tables.

mod common;

use std::io::Write;
use std::time::Duration;

use common::{big_table, bools, empty_people, floats, people};
use datafusion::prelude::*;
use dq_guard::constraints::{Literal, RuleKind, RuleType};
use dq_guard::prelude::*;
use tokio::sync::watch;

fn outcome<'a>(result: &'a ValidationResult, name: &str) -> &'a dq_guard::core::RuleOutcome {
    result
        .results
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no outcome named {name}"))
}

#[tokio::test]
async fn test_range_counts_out_of_bounds_and_ignores_nulls() {
    let result = Validator::new()
        .validate(&people(), &[Rule::range("age", 0, 100)])
        .await
        .unwrap();

    let range = &result.results[0];
    assert_eq!(range.kind, RuleType::Range);
    assert_eq!(range.status, OutcomeStatus::Fail);
    assert_eq!(range.violation_count, 1);
}

#[tokio::test]
async fn test_unique_counts_duplicated_rows() {
    let result = Validator::new()
        .validate(&people(), &[Rule::unique("id")])
        .await
        .unwrap();

    assert_eq!(result.results[0].status, OutcomeStatus::Fail);
    assert_eq!(result.results[0].violation_count, 2);
}

#[tokio::test]
async fn test_allowed_values() {
    let result = Validator::new()
        .validate(&people(), &[Rule::allowed_values("status", ["ok"])])
        .await
        .unwrap();

    assert_eq!(result.results[0].status, OutcomeStatus::Fail);
    assert_eq!(result.results[0].violation_count, 1);
}

#[tokio::test]
async fn test_full_rule_set_aggregates() {
    let rules = vec![
        Rule::not_null("id"),
        Rule::not_null("age"),
        Rule::unique("id"),
        Rule::unique("status").with_name("status_unique"),
        Rule::range("age", 0, 100),
        Rule::range("id", 1, 3),
        Rule::allowed_values("status", ["ok", "bad"]),
    ];
    let result = Validator::new().validate(&people(), &rules).await.unwrap();

    assert_eq!(result.total_rules, rules.len());
    assert_eq!(result.total_rules, result.results.len());
    assert_eq!(
        result.failed_rules,
        result.results.iter().filter(|r| r.status == OutcomeStatus::Fail).count()
    );
    assert_eq!(result.failed_rules, 4);
    assert_eq!(outcome(&result, "not_null_age").violation_count, 1);
    assert_eq!(outcome(&result, "status_unique").violation_count, 3);
    assert_eq!(outcome(&result, "range_id").status, OutcomeStatus::Pass);
    assert_eq!(
        outcome(&result, "allowed_values_status").status,
        OutcomeStatus::Pass
    );
}

#[tokio::test]
async fn test_malformed_range_is_absent_from_results() {
    let half_open: Rule = serde_json::from_str(
        r#"{"name": "age_floor", "type": "range", "column": "age", "min": 0}"#,
    )
    .unwrap();
    let rules = vec![Rule::not_null("id"), half_open, Rule::unique("id")];

    let result = Validator::new().validate(&people(), &rules).await.unwrap();

    assert_eq!(result.total_rules, 2);
    assert_eq!(result.structurally_invalid, 1);
    assert!(result.results.iter().all(|r| r.name != "age_floor"));
    assert_eq!(result.results[0].name, "not_null_id");
    assert_eq!(result.results[1].name, "unique_id");
}

#[tokio::test]
async fn test_empty_table_passes_every_rule() {
    let rules = vec![
        Rule::not_null("id"),
        Rule::unique("id"),
        Rule::range("age", 0, 100),
        Rule::allowed_values("status", ["ok"]),
    ];
    let result = Validator::builder()
        .null_policy(NullPolicy::Violation)
        .build()
        .validate(&empty_people(), &rules)
        .await
        .unwrap();

    assert_eq!(result.total_rules, 4);
    assert!(result
        .results
        .iter()
        .all(|r| r.status == OutcomeStatus::Pass && r.violation_count == 0));
    assert!(result.is_success());
}

#[tokio::test]
async fn test_missing_column_is_isolated() {
    let rules = vec![
        Rule::not_null("id"),
        Rule::range("height", 0, 250),
        Rule::unique("id"),
    ];
    let result = Validator::new().validate(&people(), &rules).await.unwrap();

    assert_eq!(result.total_rules, 3);
    assert_eq!(result.unevaluable_rules, 1);
    assert_eq!(result.failed_rules, 1);

    let missing = &result.results[1];
    assert_eq!(missing.status, OutcomeStatus::Error);
    assert_eq!(missing.violation_count, 0);
    assert!(missing.error.as_deref().unwrap().contains("height"));

    assert_eq!(result.results[0].status, OutcomeStatus::Pass);
    assert_eq!(result.results[2].violation_count, 2);
}

#[tokio::test]
async fn test_column_names_resolve_case_insensitively() {
    let result = Validator::new()
        .validate(&people(), &[Rule::range("AGE", 0, 100)])
        .await
        .unwrap();
    assert_eq!(result.results[0].violation_count, 1);
    assert_eq!(result.results[0].column, "AGE");
}

#[tokio::test]
async fn test_literals_follow_the_column_type() {
    // Text bounds against an integer column are read as numbers.
    let text_bounds = Validator::new()
        .validate(&people(), &[Rule::range("age", "1", "2")])
        .await
        .unwrap();
    assert_eq!(text_bounds.results[0].violation_count, 3);

    // Numeric bounds against a text column cannot be evaluated.
    let numeric_bounds = Validator::new()
        .validate(&people(), &[Rule::range("status", 0, 1)])
        .await
        .unwrap();
    assert_eq!(numeric_bounds.results[0].status, OutcomeStatus::Error);

    // Text bounds that are not numbers cannot be evaluated on a numeric column.
    let words = Validator::new()
        .validate(&people(), &[Rule::range("age", "low", "high")])
        .await
        .unwrap();
    assert_eq!(words.results[0].status, OutcomeStatus::Error);
}

#[tokio::test]
async fn test_text_set_against_float_and_boolean_columns() {
    let table = common::table(
        "readings",
        vec![
            ("score", floats(vec![Some(1.0), Some(2.0), Some(2.5)])),
            ("valid", bools(vec![Some(true), Some(true), Some(false)])),
        ],
    );

    let result = Validator::new()
        .validate(
            &table,
            &[
                Rule::allowed_values("score", ["1", "2", "2.5"]),
                Rule::allowed_values("valid", ["true"]),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.results[0].status, OutcomeStatus::Pass);
    assert_eq!(result.results[1].violation_count, 1);
}

#[tokio::test]
async fn test_rules_from_json_document() {
    let rules: Vec<Rule> = serde_json::from_str(
        r#"[
            {"name": "id_present", "type": "not_null", "column": "id"},
            {"name": "age_band", "type": "range", "column": "age", "min": 0.0, "max": 150},
            {"name": "status_set", "type": "allowed_values", "column": "status", "allowed": ["ok", "bad"]}
        ]"#,
    )
    .unwrap();
    assert_eq!(
        rules[1].kind(),
        &RuleKind::Range {
            min: Some(Literal::Float(0.0)),
            max: Some(Literal::Integer(150))
        }
    );

    let result = Validator::new().validate(&people(), &rules).await.unwrap();
    assert_eq!(result.failed_rules, 1);
    assert_eq!(outcome(&result, "age_band").violation_count, 1);

    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["total_rules"], 3);
    assert_eq!(json["results"][1]["status"], "FAIL");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeouts_become_error_outcomes() {
    let table = big_table(2_000_000);
    let result = Validator::builder()
        .query_timeout(Duration::from_nanos(1))
        .build()
        .validate(&table, &[Rule::unique("n"), Rule::unique("n").with_name("again")])
        .await
        .unwrap();

    assert_eq!(result.total_rules, 2);
    assert_eq!(result.unevaluable_rules, 2);
    assert!(result.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn test_cancellation_keeps_completed_prefix() {
    let (tx, rx) = watch::channel(false);
    drop(tx);

    // A dropped sender leaves the last value in place, so nothing is cancelled.
    let result = Validator::new()
        .validate_with_cancel(&people(), &[Rule::not_null("id"), Rule::unique("id")], rx)
        .await
        .unwrap();
    assert!(!result.cancelled);
    assert_eq!(result.total_rules, 2);

    let (tx, rx) = watch::channel(true);
    let result = Validator::builder()
        .max_concurrency(1)
        .build()
        .validate_with_cancel(&people(), &[Rule::not_null("id"), Rule::unique("id")], rx)
        .await
        .unwrap();
    drop(tx);
    assert!(result.cancelled);
    assert!(result.results.is_empty());
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_finished_outcomes() {
    let (tx, rx) = watch::channel(false);
    let tx = std::sync::Arc::new(tx);
    let signal = tx.clone();

    let result = Validator::builder()
        .max_concurrency(1)
        .progress_callback(move |p| {
            if p.completed == 1 {
                let _ = signal.send(true);
            }
        })
        .build()
        .validate_with_cancel(
            &people(),
            &[Rule::not_null("id"), Rule::unique("id"), Rule::not_null("age")],
            rx,
        )
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.total_rules, 1);
    assert_eq!(result.results[0].name, "not_null_id");
    assert_eq!(result.results[0].status, OutcomeStatus::Pass);
    assert!(!result.is_success());
    drop(tx);
}

#[tokio::test]
async fn test_missing_table_is_reported() {
    let table = TableHandle::new(SessionContext::new(), "people").unwrap();
    let err = Validator::new()
        .validate(&table, &[Rule::not_null("id")])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Table 'people' not found");
}

#[tokio::test]
async fn test_csv_backed_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "id,age,status").unwrap();
    writeln!(file, "1,10,ok").unwrap();
    writeln!(file, "1,20,ok").unwrap();
    writeln!(file, "2,,bad").unwrap();
    writeln!(file, "3,200,ok").unwrap();
    drop(file);

    let ctx = SessionContext::new();
    ctx.register_csv("people", path.to_str().unwrap(), CsvReadOptions::new())
        .await
        .unwrap();
    let table = TableHandle::new(ctx, "people").unwrap();

    let result = Validator::new()
        .validate(
            &table,
            &[
                Rule::range("age", 0, 100),
                Rule::unique("id"),
                Rule::allowed_values("status", ["ok"]),
                Rule::not_null("age"),
            ],
        )
        .await
        .unwrap();

    let counts: Vec<u64> = result.results.iter().map(|r| r.violation_count).collect();
    assert_eq!(counts, vec![1, 2, 1, 1]);
    assert_eq!(result.failed_rules, 4);
}
