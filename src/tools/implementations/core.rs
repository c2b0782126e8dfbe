// ABOUTME: Core database/schema/user primitives: list/create databases, users, tables, and row queries.
// ABOUTME: Grounded on §4.10's representative handler table entries of the same names.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::{AppError, AppResult};
use crate::mcp::schema::{JsonSchema, PropertySchema};
use crate::oracle::builder::{self, BindValue, SqlPlan};
use crate::oracle::capability::CapabilityTag;
use crate::oracle::identifier::escape_identifier;
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::traits::{McpTool, ToolCapabilities, ToolCategory, ToolExposure};

use super::{object_schema, optional_bool, optional_string, optional_u64, required_string, run_execute, run_query, string_array};

/// `list_databases` — CDB/PDB inventory (§4.10).
pub struct ListDatabases;

#[async_trait]
impl McpTool for ListDatabases {
    fn name(&self) -> &'static str {
        "list_databases"
    }
    fn description(&self) -> &'static str {
        "List the database(s) visible to this connection: the container database, and its pluggable \
         databases if the instance is a CDB."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("include_pdbs", PropertySchema::of_type("boolean").with_description("include pluggable databases")),
                ("include_status", PropertySchema::of_type("boolean").with_description("include open_mode/status")),
            ],
            &[],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let capabilities = context.capabilities().await;
        let include_pdbs = optional_bool(&args, "include_pdbs", true) && capabilities.supports(CapabilityTag::Pdb);
        let include_status = optional_bool(&args, "include_status", true);

        let status_column = if include_status { ", open_mode" } else { "" };
        let plan = if include_pdbs {
            SqlPlan::literal(format!("SELECT name, con_id{status_column} FROM v$pdbs ORDER BY con_id"))?
        } else {
            SqlPlan::literal(format!("SELECT name{status_column} FROM v$database"))?
        };
        let result = run_query(context, plan).await?;
        let count = result.rows.len();
        Ok(ToolResult::ok(json!({
            "databases": result.rows,
            "count": count,
            "pdb_support": capabilities.supports(CapabilityTag::Pdb),
        }))
        .with_capabilities_used(vec![CapabilityTag::Pdb]))
    }
}

/// `create_database` — traditional tablespace-backed schema container or a
/// pluggable database, gated on PDB support for the latter.
pub struct CreateDatabase;

#[async_trait]
impl McpTool for CreateDatabase {
    fn name(&self) -> &'static str {
        "create_database"
    }
    fn description(&self) -> &'static str {
        "Create a new database: a pluggable database (type=pdb, requires multitenant support) or a \
         traditional user-owned schema/tablespace pairing (type=traditional)."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("name", PropertySchema::of_type("string").with_description("database/schema name")),
                (
                    "type",
                    PropertySchema::of_type("string")
                        .with_description("traditional or pdb")
                        .with_enum(["traditional", "pdb"]),
                ),
                ("datafile_size", PropertySchema::of_type("string").with_description("e.g. '500M'")),
            ],
            &["name", "type"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::WRITES_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Restricted
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let name = required_string(self.name(), &args, "name")?;
        let database_type = required_string(self.name(), &args, "type")?;

        let plan = match database_type {
            "pdb" => {
                let capabilities = context.capabilities().await;
                let datafile_size = optional_string(&args, "datafile_size").unwrap_or("250M");
                let parameters = vec![("CREATE_FILE_DEST".to_owned(), datafile_size.to_owned())];
                builder::build_create_pdb(name, Some(&parameters), &capabilities)?
            }
            "traditional" => {
                let escaped = escape_identifier(name)?;
                SqlPlan::literal(format!("CREATE TABLESPACE {escaped} DATAFILE SIZE {}", {
                    let size = optional_string(&args, "datafile_size").unwrap_or("100M");
                    if !size.chars().all(|c| c.is_ascii_alphanumeric()) {
                        return Err(AppError::dialect("datafile_size must be alphanumeric, e.g. '100M'"));
                    }
                    size.to_owned()
                }))?
            }
            other => return Err(AppError::validation(format!("unknown database type '{other}'"))),
        };

        run_execute(context, plan).await?;
        Ok(ToolResult::ok(json!({"name": name, "type": database_type})).with_capabilities_used(vec![CapabilityTag::Pdb]))
    }
}

/// `create_user` — new Oracle account plus optional privilege grants.
pub struct CreateUser;

#[async_trait]
impl McpTool for CreateUser {
    fn name(&self) -> &'static str {
        "create_user"
    }
    fn description(&self) -> &'static str {
        "Create an Oracle user account and optionally grant it system/object privileges in one call."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("username", PropertySchema::of_type("string")),
                ("password", PropertySchema::of_type("string").with_description("never echoed back")),
                ("tablespace", PropertySchema::of_type("string")),
                ("profile", PropertySchema::of_type("string")),
                (
                    "privileges",
                    PropertySchema::of_type("array").with_description("e.g. CONNECT, RESOURCE"),
                ),
            ],
            &["username", "password"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::WRITES_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Restricted
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Security
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let username = required_string(self.name(), &args, "username")?;
        let password = required_string(self.name(), &args, "password")?;
        let tablespace = optional_string(&args, "tablespace");
        let profile = optional_string(&args, "profile");
        let privileges = string_array(&args, "privileges");

        let plans = builder::build_create_user(username, password, tablespace, profile, &privileges)?;
        let mut created_user = false;
        for plan in plans {
            if let Err(error) = run_execute(context, plan).await {
                if created_user {
                    let escaped = escape_identifier(username)?;
                    let _ = run_execute(context, SqlPlan::literal(format!("DROP USER {escaped} CASCADE"))?).await;
                    return Err(error.with_hint("privilege grant failed after user creation; the user was dropped to compensate"));
                }
                return Err(error);
            }
            created_user = true;
        }

        Ok(ToolResult::ok(json!({
            "username": username,
            "tablespace": tablespace,
            "privileges": privileges,
        })))
    }
}

/// `drop_user` — irreversible account removal.
pub struct DropUser;

#[async_trait]
impl McpTool for DropUser {
    fn name(&self) -> &'static str {
        "drop_user"
    }
    fn description(&self) -> &'static str {
        "Drop an Oracle user account, cascading to its owned objects."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(&[("username", PropertySchema::of_type("string"))], &["username"])
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::WRITES_DATA | ToolCapabilities::DESTRUCTIVE
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Restricted
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Security
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let username = required_string(self.name(), &args, "username")?;
        let escaped = escape_identifier(username)?;
        run_execute(context, SqlPlan::literal(format!("DROP USER {escaped} CASCADE"))?).await?;
        Ok(ToolResult::ok(json!({"username": username, "dropped": true})))
    }
}

/// `grant_privileges` — system or object privilege grant.
pub struct GrantPrivileges;

#[async_trait]
impl McpTool for GrantPrivileges {
    fn name(&self) -> &'static str {
        "grant_privileges"
    }
    fn description(&self) -> &'static str {
        "Grant system or object privileges to an existing user."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("username", PropertySchema::of_type("string")),
                (
                    "privilege_type",
                    PropertySchema::of_type("string").with_enum(["system", "object"]),
                ),
                ("privileges", PropertySchema::of_type("array")),
                ("object", PropertySchema::of_type("string").with_description("required for privilege_type=object")),
            ],
            &["username", "privilege_type", "privileges"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::WRITES_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Restricted
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Privilege
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let username = required_string(self.name(), &args, "username")?;
        let privilege_type = required_string(self.name(), &args, "privilege_type")?;
        let privileges = string_array(&args, "privileges");
        if privileges.is_empty() {
            return Err(AppError::validation("privileges must list at least one privilege"));
        }
        let escaped_user = escape_identifier(username)?;

        let mut granted = Vec::new();
        for privilege in &privileges {
            let clean = privilege.trim();
            if clean.is_empty() || !clean.chars().all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace()) {
                return Err(AppError::dialect(format!("invalid privilege name '{privilege}'")));
            }
            let sql = match privilege_type {
                "system" => format!("GRANT {} TO {escaped_user}", clean.to_ascii_uppercase()),
                "object" => {
                    let object = optional_string(&args, "object")
                        .ok_or_else(|| AppError::validation("object privileges require 'object'"))?;
                    let escaped_object = escape_identifier(object)?;
                    format!("GRANT {} ON {escaped_object} TO {escaped_user}", clean.to_ascii_uppercase())
                }
                other => return Err(AppError::validation(format!("unknown privilege_type '{other}'"))),
            };
            run_execute(context, SqlPlan::literal(sql)?).await?;
            granted.push(clean.to_ascii_uppercase());
        }
        Ok(ToolResult::ok(json!({"granted": granted})))
    }
}

/// `list_tables` — schema table inventory.
pub struct ListTables;

#[async_trait]
impl McpTool for ListTables {
    fn name(&self) -> &'static str {
        "list_tables"
    }
    fn description(&self) -> &'static str {
        "List tables visible to the connected user, optionally scoped to a schema and including \
         system-owned tables."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("schema", PropertySchema::of_type("string")),
                ("include_system", PropertySchema::of_type("boolean")),
            ],
            &[],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let include_system = optional_bool(&args, "include_system", false);
        let plan = if let Some(schema) = optional_string(&args, "schema") {
            let escaped_schema = escape_identifier(schema)?;
            SqlPlan::with_binds(
                "SELECT table_name, owner FROM all_tables WHERE owner = :1",
                vec![BindValue::Text(escaped_schema.trim_matches('"').to_owned())],
            )?
        } else if include_system {
            SqlPlan::literal("SELECT table_name, owner FROM all_tables")?
        } else {
            SqlPlan::literal(
                "SELECT table_name, owner FROM all_tables WHERE owner NOT IN \
                 ('SYS','SYSTEM','SYSAUX','DBSNMP','OUTLN','XDB')",
            )?
        };
        let result = run_query(context, plan).await?;
        let count = result.rows.len();
        Ok(ToolResult::ok(json!({"tables": result.rows, "count": count})))
    }
}

/// `describe_table` — column metadata for one table.
pub struct DescribeTable;

#[async_trait]
impl McpTool for DescribeTable {
    fn name(&self) -> &'static str {
        "describe_table"
    }
    fn description(&self) -> &'static str {
        "Describe a table's columns: name, data type, nullability, and ordinal position."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(&[("table", PropertySchema::of_type("string"))], &["table"])
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let table = required_string(self.name(), &args, "table")?;
        let escaped = escape_identifier(table)?;
        let plan = SqlPlan::with_binds(
            "SELECT column_name, data_type, nullable, column_id FROM all_tab_columns \
             WHERE table_name = :1 ORDER BY column_id",
            vec![BindValue::Text(escaped.trim_matches('"').to_owned())],
        )?;
        let result = run_query(context, plan).await?;
        Ok(ToolResult::ok(json!({"table": table, "columns": result.rows})))
    }
}

/// `query_records` — bounded, filtered row read.
pub struct QueryRecords;

#[async_trait]
impl McpTool for QueryRecords {
    fn name(&self) -> &'static str {
        "query_records"
    }
    fn description(&self) -> &'static str {
        "Read rows from a table with an optional column projection, WHERE clause, ORDER BY, and LIMIT."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("table", PropertySchema::of_type("string")),
                ("columns", PropertySchema::of_type("array")),
                ("where", PropertySchema::of_type("string").with_description("WHERE clause body, no leading WHERE")),
                ("order_by", PropertySchema::of_type("string")),
                ("limit", PropertySchema::of_type("integer")),
            ],
            &["table"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let table = required_string(self.name(), &args, "table")?;
        let escaped_table = escape_identifier(table)?;
        let columns = string_array(&args, "columns");
        let projection = if columns.is_empty() {
            "*".to_owned()
        } else {
            columns
                .iter()
                .map(|c| escape_identifier(c))
                .collect::<AppResult<Vec<_>>>()?
                .join(", ")
        };

        let requested_limit = optional_u64(&args, "limit");
        if requested_limit == Some(0) {
            return Ok(ToolResult::ok(json!({"rows": [], "columns": [], "row_count": 0})));
        }

        let max_rows = context.config().query.max_rows;
        let (effective_limit, truncated) = match requested_limit {
            Some(limit) if limit > max_rows => (max_rows, true),
            Some(limit) => (limit, false),
            None => (max_rows, false),
        };

        let mut sql = format!("SELECT {projection} FROM {escaped_table}");
        if let Some(where_clause) = optional_string(&args, "where") {
            if where_clause.contains(';') {
                return Err(AppError::security("WHERE clause must not contain a statement separator")
                    .with_code("E_SQL_INJECTION_SUSPECTED"));
            }
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        if let Some(order_by) = optional_string(&args, "order_by") {
            let entries = order_by
                .split(',')
                .map(builder::escape_order_by_entry)
                .collect::<AppResult<Vec<_>>>()?
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&entries);
        }
        sql = format!("SELECT * FROM ({sql}) WHERE ROWNUM <= {effective_limit}");

        let plan = SqlPlan::literal(sql)?;
        let result = run_query(context, plan).await?;
        let row_count = result.rows.len();
        Ok(ToolResult::ok(json!({
            "rows": result.rows,
            "columns": result.columns,
            "row_count": row_count,
            "truncated": truncated || result.truncated,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_databases_schema_has_no_required_fields() {
        let schema = ListDatabases.input_schema();
        assert!(schema.required.is_none());
    }

    #[test]
    fn create_user_requires_username_and_password() {
        let schema = CreateUser.input_schema();
        let required = schema.required.unwrap();
        assert!(required.contains(&"username".to_owned()));
        assert!(required.contains(&"password".to_owned()));
    }

    #[test]
    fn create_user_is_restricted_and_destructive_free() {
        assert_eq!(CreateUser.exposure(), ToolExposure::Restricted);
        assert!(!CreateUser.capabilities().is_destructive());
    }

    #[test]
    fn drop_user_is_flagged_destructive() {
        assert!(DropUser.capabilities().is_destructive());
    }
}
