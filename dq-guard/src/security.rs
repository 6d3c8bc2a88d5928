//! SQL identifier hygiene for query construction.
//!
//! Relation names arrive from the caller and are validated against a strict
//! identifier grammar. Column names are never taken verbatim from a rule: the
//! validator resolves them against the relation's real schema first and only
//! then quotes them with [`SqlSecurity::quote_identifier`]. Literal values are
//! bound as query parameters and never pass through this module.

use crate::error::{DqError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted length of a relation name.
const MAX_RELATION_LENGTH: usize = 128;

/// Maximum accepted length of a schema-resolved column name.
const MAX_COLUMN_LENGTH: usize = 255;

/// Keywords that may not appear as a whole relation-name segment.
const RESERVED_SEGMENTS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "create", "alter", "truncate", "union",
    "exec", "execute", "declare",
];

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a relation name.
    ///
    /// Accepted names start with a letter or underscore and contain only
    /// letters, digits, underscores, and dots between qualified segments.
    ///
    /// # Examples
    /// ```rust
    /// use dq_guard::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("customer_orders").is_ok());
    /// assert!(SqlSecurity::validate_identifier("staging.orders").is_ok());
    ///
    /// assert!(SqlSecurity::validate_identifier("orders; DROP TABLE users--").is_err());
    /// assert!(SqlSecurity::validate_identifier(&"t".repeat(200)).is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DqError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_RELATION_LENGTH {
            return Err(DqError::SecurityError(format!(
                "SQL identifier too long (max {MAX_RELATION_LENGTH} characters)"
            )));
        }

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to compile.
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(DqError::SecurityError(format!(
                "Invalid SQL identifier format: '{}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots",
                identifier.escape_debug()
            )));
        }

        for segment in identifier.split('.') {
            let lowered = segment.to_ascii_lowercase();
            if RESERVED_SEGMENTS.contains(&lowered.as_str()) {
                return Err(DqError::SecurityError(format!(
                    "SQL identifier segment '{segment}' is a reserved keyword"
                )));
            }
        }

        Ok(())
    }

    /// Quotes a relation name after validating it.
    ///
    /// Qualified names are quoted per segment so `staging.orders` becomes
    /// `"staging"."orders"`.
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        Ok(identifier
            .split('.')
            .map(|segment| format!("\"{segment}\""))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Quotes a column name taken from a relation's schema.
    ///
    /// Schema column names may contain spaces or punctuation (CSV headers
    /// often do), so no grammar is imposed; embedded double quotes are doubled
    /// and the result is always a single delimited identifier.
    pub fn quote_identifier(name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(DqError::SecurityError(
                "Column identifier cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_COLUMN_LENGTH {
            return Err(DqError::SecurityError(format!(
                "Column identifier too long (max {MAX_COLUMN_LENGTH} characters)"
            )));
        }

        if name.contains('\0') {
            return Err(DqError::SecurityError(
                "Column identifier cannot contain null bytes".to_string(),
            ));
        }

        let escaped = name.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }
}
