//! Parsing of free-form oracle responses.

use serde_json::Value;

use super::RuleCandidate;
use crate::prelude::*;

/// Returns the body of the first Markdown code fence in `text`, if any.
fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip the info string (`json`, `JSON`, ...) on the opening line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// Parses an oracle response into candidates.
///
/// Accepted shapes are a JSON array of rule records, or an object whose
/// `rules` field is such an array, optionally wrapped in a Markdown code
/// fence. Array elements that are not objects become empty candidates so
/// that rejection indices line up with the response.
pub fn parse_oracle_output(text: &str) -> Result<Vec<RuleCandidate>> {
    let body = fenced_body(text).unwrap_or(text).trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| DqError::OracleOutput(format!("response is not valid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("rules") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DqError::OracleOutput(
                    "expected a 'rules' array in the response object".to_string(),
                ))
            }
        },
        _ => {
            return Err(DqError::OracleOutput(
                "expected a JSON array of rules".to_string(),
            ))
        }
    };

    Ok(items.into_iter().map(RuleCandidate::from_value).collect())
}
