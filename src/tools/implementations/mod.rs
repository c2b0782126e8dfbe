// ABOUTME: Tool catalog handlers — thin compositions over the Capability Detector, SQL Builder, and Execution Engine (§4.10).
// ABOUTME: all_tools() is the single place the registry's startup catalog is assembled.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool catalog handlers (§4.10).
//!
//! Every handler follows the same four-step shape the spec describes:
//! check required capabilities, ask the SQL Builder for a plan, run it
//! through the Execution Engine inside a scoped pool acquisition (handled
//! inside [`crate::oracle::engine::ExecutionEngine`] itself), then shape the
//! rows into a handler-specific structure.

mod analytics;
mod core;
mod diagnostic;
mod performance;
mod vector;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::errors::{AppError, AppResult};
use crate::mcp::schema::{JsonSchema, PropertySchema};
use crate::oracle::builder::SqlPlan;
use crate::oracle::capability::{CapabilityTag, CapabilitySet};
use crate::oracle::engine::{ExecutionMode, ExecutionPlan, QueryResult};
use crate::tools::context::ToolExecutionContext;
use crate::tools::traits::{McpTool, ToolCapabilities};

/// Build an object schema from a property list and required-name list; the
/// shared constructor every handler's `input_schema()` goes through.
fn object_schema(properties: &[(&str, PropertySchema)], required: &[&str]) -> JsonSchema {
    JsonSchema {
        schema_type: "object".to_owned(),
        properties: Some(
            properties
                .iter()
                .map(|(name, schema)| ((*name).to_owned(), schema.clone()))
                .collect::<HashMap<_, _>>(),
        ),
        required: if required.is_empty() {
            None
        } else {
            Some(required.iter().map(|s| (*s).to_owned()).collect())
        },
    }
}

/// Reject the call with `E_UNSUPPORTED_FEATURE` if the live instance's
/// current capability snapshot does not report every tag the handler
/// requires, without ever reaching the Execution Engine (§8 invariant 6).
fn require_capabilities(capabilities: &CapabilitySet, required: &ToolCapabilities) -> AppResult<()> {
    for tag in required.required_tags() {
        if !capabilities.supports(tag) {
            return Err(AppError::capability(format!(
                "this Oracle instance does not support {tag:?}, which this tool requires"
            ))
            .with_code("E_UNSUPPORTED_FEATURE")
            .with_hint("this tool is unavailable on the current edition/version"));
        }
    }
    Ok(())
}

/// Run a query-mode plan against the context's execution engine, using the
/// tool's configured `query.timeout_ms`/`query.max_rows` defaults.
async fn run_query(context: &ToolExecutionContext, plan: SqlPlan) -> AppResult<QueryResult> {
    let query_config = context.config().query;
    let execution_plan = ExecutionPlan {
        plan,
        mode: ExecutionMode::Query,
        fetch_size: query_config.default_fetch_size,
        max_rows: query_config.max_rows,
        timeout: query_config.timeout().min(context.remaining_time()),
        cancellation: context.cancellation.clone(),
    };
    match context.engine().execute(execution_plan).await? {
        crate::oracle::engine::EngineOutcome::Query(result) => Ok(result),
        _ => Err(AppError::internal("execution engine returned a non-query outcome for a query-mode plan")),
    }
}

/// Run an execute-mode (DDL/DML) plan, returning the affected-row count if
/// Oracle reported one.
async fn run_execute(context: &ToolExecutionContext, plan: SqlPlan) -> AppResult<Option<u64>> {
    let execution_plan = ExecutionPlan {
        plan,
        mode: ExecutionMode::Execute,
        fetch_size: crate::oracle::engine::DEFAULT_FETCH_SIZE,
        max_rows: 0,
        timeout: context.config().query.timeout().min(context.remaining_time()),
        cancellation: context.cancellation.clone(),
    };
    match context.engine().execute(execution_plan).await? {
        crate::oracle::engine::EngineOutcome::Execute(result) => Ok(result.rows_affected),
        _ => Err(AppError::internal("execution engine returned a non-execute outcome for an execute-mode plan")),
    }
}

fn required_string<'a>(tool_name: &str, args: &'a Value, field: &str) -> AppResult<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(format!("{tool_name}: '{field}' must be a non-empty string")))
}

fn optional_string<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

fn string_array(args: &Value, field: &str) -> Vec<String> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
        .unwrap_or_default()
}

fn optional_u64(args: &Value, field: &str) -> Option<u64> {
    args.get(field).and_then(Value::as_u64)
}

fn optional_bool(args: &Value, field: &str, default: bool) -> bool {
    args.get(field).and_then(Value::as_bool).unwrap_or(default)
}

/// Assemble the full, frozen-ready tool catalog. Order here is the
/// registration order the registry preserves for `tools/list` (§4.1).
#[must_use]
pub fn all_tools() -> Vec<Arc<dyn McpTool>> {
    vec![
        Arc::new(core::ListDatabases),
        Arc::new(core::CreateDatabase),
        Arc::new(core::CreateUser),
        Arc::new(core::DropUser),
        Arc::new(core::GrantPrivileges),
        Arc::new(core::ListTables),
        Arc::new(core::DescribeTable),
        Arc::new(core::QueryRecords),
        Arc::new(analytics::WindowFunctions),
        Arc::new(analytics::PivotOperations),
        Arc::new(vector::VectorSearch),
        Arc::new(performance::AwrSnapshot),
        Arc::new(diagnostic::Ping),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique_and_well_formed() {
        let tools = all_tools();
        let mut seen = std::collections::HashSet::new();
        for tool in &tools {
            assert!(seen.insert(tool.name()), "duplicate tool name '{}'", tool.name());
            assert!(tool.name().chars().next().is_some_and(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn catalog_registers_cleanly_into_a_fresh_registry() {
        let mut registry = crate::tools::registry::ToolRegistry::new();
        for tool in all_tools() {
            registry.register(tool).expect("built-in catalog must register without collision");
        }
        assert_eq!(registry.len(), all_tools().len());
    }
}
