// ABOUTME: Typed SQL builder — the only place DDL/DML text is assembled from structured tool input.
// ABOUTME: Every builder returns a SqlPlan; no caller-supplied string reaches the SQL body unescaped or unbound.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL builder (§4.3).
//!
//! Three safety rails apply uniformly across every `build_*` function:
//! 1. identifiers go through [`crate::oracle::identifier::escape_identifier`];
//! 2. values go through a [`BindValue`] in the plan's bind list, never string
//!    interpolation — except passwords, which Oracle DDL does not accept as
//!    bind parameters in `IDENTIFIED BY` position; those are embedded as an
//!    escaped quoted literal and the caller MUST log the plan's `sql_text`
//!    only through [`crate::security::redact_sql_for_log`];
//! 3. the finished text is run through
//!    [`crate::oracle::identifier::validate_single_statement`] before
//!    returning.

use crate::errors::{AppError, AppResult};
use crate::oracle::capability::{CapabilitySet, CapabilityTag};
use crate::oracle::identifier::{escape_identifier, escape_qualified_identifier, validate_single_statement};

/// A bound value carried alongside `sql_text` rather than interpolated into
/// it. Mirrors the subset of Oracle bind types the execution engine needs to
/// distinguish when calling into the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// `VARCHAR2`/`CLOB`-shaped text.
    Text(String),
    /// Any Oracle `NUMBER`, carried as the widest portable representation.
    Number(f64),
    /// `IDENTIFIED BY` passwords and other secrets bound as text; the engine
    /// binds these identically to `Text` but the distinction lets the
    /// execution layer skip echoing the value in trace-level query logs.
    Secret(String),
    /// SQL `NULL`.
    Null,
}

/// Output of every `build_*` function: statement text plus its bind list,
/// already validated as a single statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPlan {
    /// Statement text with `:1`, `:2`, … placeholders for each entry in
    /// `binds`, in order.
    pub sql_text: String,
    /// Positional bind values, in placeholder order.
    pub binds: Vec<BindValue>,
}

impl SqlPlan {
    fn new(sql_text: String, binds: Vec<BindValue>) -> AppResult<Self> {
        validate_single_statement(&sql_text)?;
        Ok(Self { sql_text, binds })
    }

    /// Statement with no binds (most DDL after identifier substitution).
    fn ddl(sql_text: String) -> AppResult<Self> {
        Self::new(sql_text, Vec::new())
    }

    /// A fixed, parameter-free statement (e.g. a system-view read with no
    /// caller-supplied identifiers) validated as a single statement like
    /// every other plan. Only for statement text that is a compile-time
    /// literal inside a handler, never for anything derived from tool
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns `AppError::dialect` if `sql_text` is not a single statement.
    pub fn literal(sql_text: impl Into<String>) -> AppResult<Self> {
        Self::new(sql_text.into(), Vec::new())
    }

    /// A parameter-free statement with positional binds supplied directly,
    /// for handlers that build a query over a builder-escaped identifier and
    /// a bound value (e.g. `query_records` with a `WHERE` bind).
    ///
    /// # Errors
    ///
    /// Returns `AppError::dialect` if `sql_text` is not a single statement.
    pub fn with_binds(sql_text: impl Into<String>, binds: Vec<BindValue>) -> AppResult<Self> {
        Self::new(sql_text.into(), binds)
    }
}

/// Column type whitelist for `build_create_table` (§4.3).
const COLUMN_TYPE_WHITELIST: &[&str] = &[
    "NUMBER",
    "VARCHAR2",
    "CHAR",
    "DATE",
    "TIMESTAMP",
    "CLOB",
    "BLOB",
    "RAW",
    "NCHAR",
    "NVARCHAR2",
    "FLOAT",
    "BINARY_DOUBLE",
    "VECTOR",
];

/// Analytical functions that take no argument list before `OVER (...)`.
const ARGUMENTLESS_ANALYTICAL_FUNCTIONS: &[&str] = &["ROW_NUMBER", "RANK", "DENSE_RANK"];

/// A single column definition for [`build_create_table`].
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name, escaped via [`escape_identifier`].
    pub name: String,
    /// One of [`COLUMN_TYPE_WHITELIST`], case-insensitive.
    pub data_type: String,
    /// Optional type parameters rendered verbatim inside parens, e.g. `38,2`
    /// for `NUMBER(38,2)` or `4000` for `VARCHAR2(4000)`. Validated to
    /// contain only digits, commas, and spaces — never free text.
    pub type_params: Option<String>,
    /// `NOT NULL` constraint.
    pub not_null: bool,
}

/// Build `CREATE USER` plus `GRANT` statements for a new account.
///
/// The password is embedded as an escaped, single-quoted literal (Oracle DDL
/// has no bind-parameter position for `IDENTIFIED BY`); callers must redact
/// `sql_text` via [`crate::security::redact_sql_for_log`] before it is ever
/// written to a log.
///
/// # Errors
///
/// Returns `AppError::dialect` for an invalid identifier and
/// `AppError::security` if `username` is a denylisted system account.
pub fn build_create_user(
    username: &str,
    password: &str,
    tablespace: Option<&str>,
    profile: Option<&str>,
    privileges: &[String],
) -> AppResult<Vec<SqlPlan>> {
    let escaped_user = escape_identifier(username)?;
    if password.is_empty() {
        return Err(AppError::validation("password must not be empty"));
    }

    let mut sql = format!(
        "CREATE USER {escaped_user} IDENTIFIED BY {}",
        escape_password_literal(password)
    );
    if let Some(tablespace) = tablespace {
        sql.push_str(&format!(" DEFAULT TABLESPACE {}", escape_identifier(tablespace)?));
    }
    if let Some(profile) = profile {
        sql.push_str(&format!(" PROFILE {}", escape_identifier(profile)?));
    }

    let mut plans = vec![SqlPlan::ddl(sql)?];
    for privilege in privileges {
        let privilege_ident = validate_privilege_name(privilege)?;
        plans.push(SqlPlan::ddl(format!("GRANT {privilege_ident} TO {escaped_user}"))?);
    }
    Ok(plans)
}

/// Oracle system/object privilege names are not ordinary identifiers (they
/// may contain spaces, e.g. `CREATE SESSION`), so they are validated against
/// an allowed-character set rather than run through `escape_identifier`.
fn validate_privilege_name(privilege: &str) -> AppResult<String> {
    let trimmed = privilege.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace())
    {
        return Err(AppError::dialect(format!("invalid privilege name '{privilege}'")));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Embed a password as a quoted SQL literal, doubling embedded single quotes
/// per Oracle's literal-escaping rule. Never call this for anything except
/// an `IDENTIFIED BY` clause — every other value should be a bind parameter.
fn escape_password_literal(password: &str) -> String {
    format!("'{}'", password.replace('\'', "''"))
}

/// Build `CREATE TABLE` from a column list and optional primary key.
///
/// # Errors
///
/// Returns `AppError::dialect` for an invalid identifier, an unsupported
/// column type, or malformed type parameters.
pub fn build_create_table(
    table: &str,
    columns: &[ColumnDef],
    primary_key: Option<&[String]>,
    tablespace: Option<&str>,
) -> AppResult<SqlPlan> {
    if columns.is_empty() {
        return Err(AppError::validation("table must declare at least one column"));
    }
    let escaped_table = escape_identifier(table)?;

    let mut column_clauses = Vec::with_capacity(columns.len());
    for column in columns {
        let escaped_name = escape_identifier(&column.name)?;
        let data_type = column.data_type.to_ascii_uppercase();
        if !COLUMN_TYPE_WHITELIST.contains(&data_type.as_str()) {
            return Err(AppError::dialect(format!(
                "column '{}' uses unsupported type '{}'",
                column.name, column.data_type
            )));
        }
        let mut clause = escaped_name;
        clause.push(' ');
        clause.push_str(&data_type);
        if let Some(params) = &column.type_params {
            if !params.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ') {
                return Err(AppError::dialect(format!(
                    "type parameters '{params}' for column '{}' contain disallowed characters",
                    column.name
                )));
            }
            clause.push('(');
            clause.push_str(params.trim());
            clause.push(')');
        }
        if column.not_null {
            clause.push_str(" NOT NULL");
        }
        column_clauses.push(clause);
    }

    if let Some(pk_columns) = primary_key {
        if !pk_columns.is_empty() {
            let escaped_pk = pk_columns
                .iter()
                .map(|c| escape_identifier(c))
                .collect::<AppResult<Vec<_>>>()?
                .join(", ");
            column_clauses.push(format!("PRIMARY KEY ({escaped_pk})"));
        }
    }

    let mut sql = format!("CREATE TABLE {escaped_table} ({})", column_clauses.join(", "));
    if let Some(tablespace) = tablespace {
        sql.push_str(&format!(" TABLESPACE {}", escape_identifier(tablespace)?));
    }
    SqlPlan::ddl(sql)
}

/// Build an analytical-function expression: `<fn>([args]) OVER (...)`.
///
/// # Errors
///
/// Returns `AppError::dialect` for an invalid table/column identifier or an
/// empty `function` name.
pub fn build_analytical(
    table: &str,
    function: &str,
    partition_by: Option<&[String]>,
    order_by: Option<&[String]>,
    parameters: Option<&[String]>,
) -> AppResult<SqlPlan> {
    let escaped_table = escape_identifier(table)?;
    let function_upper = function.trim().to_ascii_uppercase();
    if function_upper.is_empty() || !function_upper.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return Err(AppError::dialect(format!("invalid analytical function name '{function}'")));
    }

    let mut expression = function_upper.clone();
    if let Some(percentile) = function_upper.strip_prefix("PERCENTILE_") {
        let _ = percentile; // PERCENTILE_CONT / PERCENTILE_DISC, both parameterized identically.
        let p = parameters
            .and_then(|p| p.first())
            .ok_or_else(|| AppError::validation(format!("{function_upper} requires a percentile parameter")))?;
        expression.push('(');
        expression.push_str(p);
        expression.push(')');
        expression.push_str(" WITHIN GROUP (ORDER BY ");
        expression.push_str(&escape_order_by_list(order_by.unwrap_or(&[]))?);
        expression.push(')');
    } else if ARGUMENTLESS_ANALYTICAL_FUNCTIONS.contains(&function_upper.as_str()) {
        expression.push_str("() OVER (");
        expression.push_str(&build_window_clause(partition_by, order_by)?);
        expression.push(')');
        return SqlPlan::ddl(format!("SELECT {expression} FROM {escaped_table}"));
    } else {
        let args = match parameters {
            Some(params) => escape_identifier_list(params)?,
            None => String::new(),
        };
        expression.push('(');
        expression.push_str(&args);
        expression.push(')');
        expression.push_str(" OVER (");
        expression.push_str(&build_window_clause(partition_by, order_by)?);
        expression.push(')');
        return SqlPlan::ddl(format!("SELECT {expression} FROM {escaped_table}"));
    }

    SqlPlan::ddl(format!("SELECT {expression} FROM {escaped_table}"))
}

fn build_window_clause(partition_by: Option<&[String]>, order_by: Option<&[String]>) -> AppResult<String> {
    let mut parts = Vec::new();
    if let Some(cols) = partition_by {
        if !cols.is_empty() {
            let escaped = cols
                .iter()
                .map(|c| escape_identifier(c))
                .collect::<AppResult<Vec<_>>>()?
                .join(", ");
            parts.push(format!("PARTITION BY {escaped}"));
        }
    }
    if let Some(cols) = order_by {
        if !cols.is_empty() {
            parts.push(format!("ORDER BY {}", escape_order_by_list(cols)?));
        }
    }
    Ok(parts.join(" "))
}

/// Escape a plain list of identifiers (e.g. analytical-function arguments),
/// joined with `, `. No directional keyword is accepted here — use
/// [`escape_order_by_list`] for `ORDER BY` entries.
fn escape_identifier_list(columns: &[String]) -> AppResult<String> {
    Ok(columns
        .iter()
        .map(|c| escape_identifier(c))
        .collect::<AppResult<Vec<_>>>()?
        .join(", "))
}

/// Escape a single `ORDER BY` entry, which may carry a trailing `ASC`/`DESC`
/// direction keyword (e.g. `"SALARY DESC"`). The column segment is escaped
/// via [`escape_identifier`]; the direction, if present, is validated
/// against the closed `{ASC, DESC}` vocabulary and emitted as a bare
/// keyword, never quoted or escaped as an identifier.
///
/// # Errors
///
/// Returns `AppError::dialect` if the entry is empty, the column segment
/// fails [`escape_identifier`], a trailing word is present but is not
/// `ASC`/`DESC` (case-insensitive), or the entry has more than two words.
pub fn escape_order_by_entry(entry: &str) -> AppResult<String> {
    let mut words = entry.split_whitespace();
    let column = words
        .next()
        .ok_or_else(|| AppError::dialect("ORDER BY entry must not be empty"))?;
    let escaped_column = escape_identifier(column)?;
    let Some(direction) = words.next() else {
        return Ok(escaped_column);
    };
    if words.next().is_some() {
        return Err(AppError::dialect(format!(
            "ORDER BY entry '{entry}' has more than a column and a direction"
        )));
    }
    let direction_upper = direction.to_ascii_uppercase();
    if direction_upper != "ASC" && direction_upper != "DESC" {
        return Err(AppError::dialect(format!(
            "ORDER BY direction '{direction}' must be ASC or DESC"
        )));
    }
    Ok(format!("{escaped_column} {direction_upper}"))
}

/// Escape a list of `ORDER BY` entries via [`escape_order_by_entry`], joined
/// with `, `.
///
/// # Errors
///
/// Returns the first entry's error from [`escape_order_by_entry`].
pub fn escape_order_by_list(columns: &[String]) -> AppResult<String> {
    Ok(columns
        .iter()
        .map(|c| escape_order_by_entry(c))
        .collect::<AppResult<Vec<_>>>()?
        .join(", "))
}

/// Build a `PIVOT` clause wrapping `source_query`.
///
/// `source_query` is trusted statement text produced by the caller's own
/// query builder (never raw user text); `pivot_column` and `values` are
/// escaped/classified here.
///
/// # Errors
///
/// Returns `AppError::dialect` for an invalid pivot column or an empty
/// values list.
pub fn build_pivot(source_query: &str, pivot_column: &str, values: &[String]) -> AppResult<SqlPlan> {
    if values.is_empty() {
        return Err(AppError::validation("pivot requires at least one value"));
    }
    validate_single_statement(source_query)?;
    let escaped_column = escape_identifier(pivot_column)?;

    let numeric_pattern = regex::Regex::new(r"^[0-9]+$").expect("static regex is valid");
    let alias_pattern = regex::Regex::new(r"[^A-Za-z0-9_]").expect("static regex is valid");

    let rendered_values = values
        .iter()
        .map(|value| {
            let literal = if numeric_pattern.is_match(value) {
                value.clone()
            } else {
                format!("'{}'", value.replace('\'', "''"))
            };
            let alias = alias_pattern.replace_all(value, "_");
            format!("{literal} AS {alias}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    SqlPlan::ddl(format!(
        "SELECT * FROM ({source_query}) PIVOT (COUNT(*) FOR {escaped_column} IN ({rendered_values}))"
    ))
}

/// Build `CREATE PLUGGABLE DATABASE`, gated on the Capability Detector
/// reporting PDB support.
///
/// # Errors
///
/// Returns `AppError::capability` if `capabilities` does not report PDB
/// support, or `AppError::dialect` for an invalid name.
pub fn build_create_pdb(
    name: &str,
    parameters: Option<&[(String, String)]>,
    capabilities: &CapabilitySet,
) -> AppResult<SqlPlan> {
    if !capabilities.supports(CapabilityTag::Pdb) {
        return Err(AppError::capability("target Oracle instance does not support pluggable databases")
            .with_code("E_UNSUPPORTED_FEATURE")
            .with_hint("CREATE PLUGGABLE DATABASE requires a multitenant (CDB) Enterprise Edition instance"));
    }
    let escaped_name = escape_identifier(name)?;
    let mut sql = format!("CREATE PLUGGABLE DATABASE {escaped_name}");
    if let Some(parameters) = parameters {
        for (key, value) in parameters {
            let key_upper = key.trim().to_ascii_uppercase();
            if key_upper.is_empty() || !key_upper.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
                return Err(AppError::dialect(format!("invalid CREATE PLUGGABLE DATABASE parameter '{key}'")));
            }
            sql.push(' ');
            sql.push_str(&key_upper);
            sql.push(' ');
            sql.push_str(&format!("'{}'", value.replace('\'', "''")));
        }
    }
    SqlPlan::ddl(sql)
}

/// Build a fully-qualified `SELECT *` for a schema-qualified table, used by
/// handlers that need a plain read without any filtering logic of their own.
///
/// # Errors
///
/// Returns `AppError::dialect` for an invalid schema/table identifier.
pub fn build_select_all(schema: &str, table: &str) -> AppResult<SqlPlan> {
    SqlPlan::ddl(format!("SELECT * FROM {}", escape_qualified_identifier(schema, table)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;

    fn capable_set(pdb: bool) -> CapabilitySet {
        CapabilitySet {
            version: "19.3.0.0.0".to_owned(),
            edition: Edition::Enterprise,
            is_cdb: pdb,
            pdb,
            awr: false,
            partitioning: false,
            vector: false,
            json: false,
            tde: false,
            vault: false,
            parallel: false,
            detected_at: std::time::Instant::now(),
            degraded: false,
        }
    }

    #[test]
    fn create_user_embeds_password_as_quoted_literal() {
        let plans = build_create_user("app_user", "hunter2", Some("users"), None, &["CREATE SESSION".to_owned()]).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans[0].sql_text.contains("IDENTIFIED BY 'hunter2'"));
        assert!(plans[0].sql_text.contains("DEFAULT TABLESPACE \"USERS\""));
        assert_eq!(plans[1].sql_text, "GRANT CREATE SESSION TO \"APP_USER\"");
    }

    #[test]
    fn create_user_rejects_system_username() {
        assert!(build_create_user("sys", "hunter2", None, None, &[]).is_err());
    }

    #[test]
    fn create_user_escapes_embedded_quote_in_password() {
        let plans = build_create_user("app_user", "a'b", None, None, &[]).unwrap();
        assert!(plans[0].sql_text.contains("IDENTIFIED BY 'a''b'"));
    }

    #[test]
    fn create_table_rejects_non_whitelisted_type() {
        let columns = vec![ColumnDef {
            name: "id".to_owned(),
            data_type: "TEXT".to_owned(),
            type_params: None,
            not_null: true,
        }];
        assert!(build_create_table("t", &columns, None, None).is_err());
    }

    #[test]
    fn create_table_builds_expected_ddl() {
        let columns = vec![
            ColumnDef {
                name: "id".to_owned(),
                data_type: "number".to_owned(),
                type_params: Some("10".to_owned()),
                not_null: true,
            },
            ColumnDef {
                name: "name".to_owned(),
                data_type: "varchar2".to_owned(),
                type_params: Some("100".to_owned()),
                not_null: false,
            },
        ];
        let plan = build_create_table("accounts", &columns, Some(&["id".to_owned()]), None).unwrap();
        assert_eq!(
            plan.sql_text,
            "CREATE TABLE \"ACCOUNTS\" (\"ID\" NUMBER(10) NOT NULL, \"NAME\" VARCHAR2(100), PRIMARY KEY (\"ID\"))"
        );
    }

    #[test]
    fn analytical_without_arguments_omits_parens() {
        let plan = build_analytical("orders", "row_number", Some(&["region".to_owned()]), Some(&["id".to_owned()]), None).unwrap();
        assert!(plan.sql_text.contains("ROW_NUMBER() OVER (PARTITION BY \"REGION\" ORDER BY \"ID\")"));
    }

    #[test]
    fn analytical_percentile_uses_within_group() {
        let plan = build_analytical(
            "orders",
            "percentile_cont",
            None,
            Some(&["amount".to_owned()]),
            Some(&["0.5".to_owned()]),
        )
        .unwrap();
        assert!(plan.sql_text.contains("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY \"AMOUNT\")"));
    }

    #[test]
    fn analytical_order_by_accepts_a_trailing_direction() {
        let plan = build_analytical("orders", "row_number", None, Some(&["salary DESC".to_owned()]), None).unwrap();
        assert!(plan.sql_text.contains("ORDER BY \"SALARY\" DESC"));
    }

    #[test]
    fn analytical_order_by_rejects_an_invalid_direction() {
        assert!(build_analytical("orders", "row_number", None, Some(&["salary SIDEWAYS".to_owned()]), None).is_err());
    }

    #[test]
    fn escape_order_by_entry_accepts_bare_column() {
        assert_eq!(escape_order_by_entry("id").unwrap(), "\"ID\"");
    }

    #[test]
    fn escape_order_by_entry_accepts_asc_and_desc_case_insensitively() {
        assert_eq!(escape_order_by_entry("salary desc").unwrap(), "\"SALARY\" DESC");
        assert_eq!(escape_order_by_entry("salary asc").unwrap(), "\"SALARY\" ASC");
    }

    #[test]
    fn escape_order_by_entry_rejects_extra_words() {
        assert!(escape_order_by_entry("salary desc nulls last").is_err());
    }

    #[test]
    fn pivot_classifies_numeric_and_string_values() {
        let plan = build_pivot("SELECT region, amount FROM sales", "region", &["100".to_owned(), "west coast".to_owned()]).unwrap();
        assert!(plan.sql_text.contains("100 AS 100"));
        assert!(plan.sql_text.contains("'west coast' AS west_coast"));
    }

    #[test]
    fn create_pdb_requires_capability() {
        let result = build_create_pdb("salesdb", None, &capable_set(false));
        assert!(result.is_err());
    }

    #[test]
    fn create_pdb_succeeds_when_capable() {
        let plan = build_create_pdb("salesdb", None, &capable_set(true)).unwrap();
        assert_eq!(plan.sql_text, "CREATE PLUGGABLE DATABASE \"SALESDB\"");
    }

    #[test]
    fn builders_reject_stacked_statements_via_identifier_denylist() {
        // A stacked-statement attempt can't even reach validate_single_statement
        // because escape_identifier already rejects the metacharacters.
        assert!(build_select_all("app", "orders; DROP TABLE t").is_err());
    }
}
