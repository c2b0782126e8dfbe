// ABOUTME: Identifier escaping and single-statement validation shared by every SQL builder function.
// ABOUTME: This is the only place a raw identifier is allowed to touch a SQL string.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier safety.
//!
//! Oracle identifiers are either unquoted (case-folded to upper-case,
//! restricted character set) or double-quoted (case-preserving, almost any
//! character allowed). The builder always produces the quoted form so a
//! caller cannot smuggle SQL through an identifier position — there is no
//! path where an identifier is concatenated unescaped.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{AppError, AppResult};
use crate::security::is_system_identifier;

/// Maximum identifier length Oracle accepts (128 bytes since 12.2).
const MAX_IDENTIFIER_LEN: usize = 128;

fn simple_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_$#]*$").expect("static regex is valid"))
}

/// Escape `name` into a double-quoted Oracle identifier, rejecting anything
/// that is not a plain alphanumeric/`_`/`$`/`#` token or that targets a
/// denylisted system account/dictionary view.
///
/// # Errors
///
/// Returns `AppError::dialect` if `name` is empty, exceeds the maximum
/// identifier length, contains characters outside the accepted set, or
/// names a denylisted system object.
pub fn escape_identifier(name: &str) -> AppResult<String> {
    if name.is_empty() {
        return Err(AppError::dialect("identifier must not be empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(AppError::dialect(format!(
            "identifier '{name}' exceeds the {MAX_IDENTIFIER_LEN}-byte limit"
        )));
    }
    if !simple_identifier_pattern().is_match(name) {
        return Err(AppError::dialect(format!(
            "identifier '{name}' contains characters outside [A-Za-z0-9_$#] or does not start with a letter"
        )));
    }
    if is_system_identifier(name) {
        return Err(AppError::security(format!(
            "identifier '{name}' targets a denylisted system account or dictionary view"
        )));
    }
    // Quote with the identifier case-folded to upper, matching Oracle's
    // default for unquoted identifiers, so escaped and unescaped references
    // to the same name resolve identically.
    Ok(format!("\"{}\"", name.to_ascii_uppercase()))
}

/// Escape a schema-qualified identifier (`schema.object`), validating each
/// segment independently.
///
/// # Errors
///
/// Returns `AppError::dialect` if either segment fails [`escape_identifier`].
pub fn escape_qualified_identifier(schema: &str, object: &str) -> AppResult<String> {
    Ok(format!(
        "{}.{}",
        escape_identifier(schema)?,
        escape_identifier(object)?
    ))
}

/// Reject a SQL statement containing more than one statement. Oracle
/// separates statements with `;` in SQL*Plus scripts, but a single
/// `prepare`/`execute` call must carry exactly one statement — multiple
/// semicolon-separated statements are a classic injection vector and are
/// never valid input to the execution engine.
///
/// # Errors
///
/// Returns `AppError::dialect` if a semicolon appears outside a quoted
/// string literal.
pub fn validate_single_statement(sql: &str) -> AppResult<()> {
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => {
                return Err(AppError::dialect(
                    "statement contains a ';' outside a string literal; only a single statement is allowed",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_plain_identifier() {
        assert_eq!(escape_identifier("orders").unwrap(), "\"ORDERS\"");
    }

    #[test]
    fn rejects_empty_identifier() {
        assert!(escape_identifier("").is_err());
    }

    #[test]
    fn rejects_identifier_not_starting_with_letter() {
        assert!(escape_identifier("1table").is_err());
    }

    #[test]
    fn rejects_identifier_with_sql_metacharacters() {
        assert!(escape_identifier("orders; DROP TABLE x --").is_err());
        assert!(escape_identifier("orders\"").is_err());
    }

    #[test]
    fn rejects_system_schema() {
        assert!(escape_identifier("sys").is_err());
        assert!(escape_identifier("V$SESSION").is_err());
    }

    #[test]
    fn qualified_identifier_validates_both_segments() {
        assert!(escape_qualified_identifier("app", "orders").is_ok());
        assert!(escape_qualified_identifier("sys", "orders").is_err());
    }

    #[test]
    fn single_statement_allows_semicolon_inside_literal() {
        assert!(validate_single_statement("SELECT 'a;b' FROM dual").is_ok());
    }

    #[test]
    fn single_statement_rejects_stacked_statements() {
        assert!(validate_single_statement("SELECT 1 FROM dual; DROP TABLE t").is_err());
    }
}
