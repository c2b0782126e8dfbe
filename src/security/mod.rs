// ABOUTME: System-object denylist and SQL-text redaction shared by the builder, pool, and logging.
// ABOUTME: This is the single place the "never touch SYS/SYSTEM/dictionary views" rule is encoded.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security policy primitives.
//!
//! Two concerns live here because both are policy, not mechanism:
//! - [`is_system_identifier`]: the closed denylist of schemas/usernames and
//!   dictionary-view prefixes no tool may target, even when a caller asks
//!   for it explicitly (§4.3 "Safety rules").
//! - [`redact_sql_for_log`]: strips string literals from a SQL statement
//!   before it is written to stderr, since literals can carry passwords
//!   (`IDENTIFIED BY`) or other sensitive values bound as text.

pub mod audit;

/// Account names a tool is never allowed to target, regardless of the
/// caller's request. Oracle-maintained accounts, not ordinary application
/// schemas.
const DENIED_USERNAMES: &[&str] = &["SYS", "SYSTEM", "SYSAUX", "DBSNMP", "OUTLN", "XS$NULL"];

/// Dictionary/performance view prefixes no query tool may select from
/// directly — these expose instance-wide state outside the caller's schema.
const DENIED_VIEW_PREFIXES: &[&str] = &["V$", "GV$", "DBA_"];

/// `true` if `identifier` (already upper-cased by the caller, case-folding
/// is Oracle's default for unquoted identifiers) names a denied account or
/// dictionary view.
#[must_use]
pub fn is_system_identifier(identifier: &str) -> bool {
    let upper = identifier.to_ascii_uppercase();
    DENIED_USERNAMES.contains(&upper.as_str())
        || DENIED_VIEW_PREFIXES.iter().any(|prefix| upper.starts_with(prefix))
}

/// Replace single-quoted string literals in a SQL statement with `'***'`
/// before the statement is logged. Bind parameters never appear in the
/// statement text at all (see [`crate::oracle::builder`]), so this only
/// guards against literals a caller embedded directly.
#[must_use]
pub fn redact_sql_for_log(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            out.push('\'');
            out.push_str("***");
            for inner in chars.by_ref() {
                if inner == '\'' {
                    break;
                }
            }
            out.push('\'');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_known_system_accounts() {
        assert!(is_system_identifier("sys"));
        assert!(is_system_identifier("SYSTEM"));
        assert!(is_system_identifier("DbSnmp"));
    }

    #[test]
    fn denies_dictionary_view_prefixes() {
        assert!(is_system_identifier("V$SESSION"));
        assert!(is_system_identifier("dba_users"));
        assert!(is_system_identifier("GV$INSTANCE"));
    }

    #[test]
    fn allows_ordinary_application_schema() {
        assert!(!is_system_identifier("APP_USER"));
        assert!(!is_system_identifier("reporting"));
    }

    #[test]
    fn redacts_single_quoted_literals() {
        let sql = "CREATE USER bob IDENTIFIED BY 'hunter2'";
        let redacted = redact_sql_for_log(sql);
        assert_eq!(redacted, "CREATE USER bob IDENTIFIED BY '***'");
        assert!(!redacted.contains("hunter2"));
    }

    #[test]
    fn redacts_multiple_literals() {
        let sql = "SELECT * FROM t WHERE a = 'x' AND b = 'y'";
        assert_eq!(
            redact_sql_for_log(sql),
            "SELECT * FROM t WHERE a = '***' AND b = '***'"
        );
    }
}
