// ABOUTME: Vector similarity search over a VECTOR-typed column, gated on the Vector capability tag.
// ABOUTME: Grounded on §4.10's vector_search handler contract and the VECTOR column type in §4.3's whitelist.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::{AppError, AppResult};
use crate::mcp::schema::{JsonSchema, PropertySchema};
use crate::oracle::builder::SqlPlan;
use crate::oracle::identifier::escape_identifier;
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::traits::{McpTool, ToolCapabilities, ToolCategory, ToolExposure};

use super::{object_schema, require_capabilities, required_string, run_query};

const METRICS: &[&str] = &["cosine", "euclidean", "manhattan"];

/// `vector_search` — nearest-neighbor lookup via `VECTOR_DISTANCE` (23ai+).
pub struct VectorSearch;

#[async_trait]
impl McpTool for VectorSearch {
    fn name(&self) -> &'static str {
        "vector_search"
    }
    fn description(&self) -> &'static str {
        "Find the top_k rows closest to a query vector in a VECTOR-typed column, using cosine, \
         euclidean, or manhattan distance. Requires a 23ai+ instance with the native VECTOR type."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("table", PropertySchema::of_type("string")),
                ("vector_column", PropertySchema::of_type("string")),
                ("query_vector", PropertySchema::of_type("array").with_description("array of numbers")),
                ("metric", PropertySchema::of_type("string").with_enum(METRICS.iter().copied())),
                ("top_k", PropertySchema::of_type("integer")),
            ],
            &["table", "vector_column", "query_vector", "metric", "top_k"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_VECTOR | ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Ai
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let capabilities = context.capabilities().await;
        require_capabilities(&capabilities, &self.capabilities())?;

        let table = required_string(self.name(), &args, "table")?;
        let vector_column = required_string(self.name(), &args, "vector_column")?;
        let metric = required_string(self.name(), &args, "metric")?;
        let top_k = args
            .get("top_k")
            .and_then(Value::as_u64)
            .ok_or_else(|| AppError::validation("top_k must be a positive integer"))?;
        if top_k == 0 {
            return Err(AppError::validation("top_k must be greater than zero"));
        }

        let query_vector = args
            .get("query_vector")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::validation("query_vector must be an array of numbers"))?
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| AppError::validation("query_vector elements must be numbers")))
            .collect::<AppResult<Vec<_>>>()?;
        if query_vector.is_empty() {
            return Err(AppError::validation("query_vector must not be empty"));
        }

        let metric_sql = match metric {
            "cosine" => "COSINE",
            "euclidean" => "EUCLIDEAN",
            "manhattan" => "MANHATTAN",
            other => return Err(AppError::validation(format!("unsupported metric '{other}'"))),
        };

        let escaped_table = escape_identifier(table)?;
        let escaped_column = escape_identifier(vector_column)?;
        let vector_literal = query_vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let sql = format!(
            "SELECT *, VECTOR_DISTANCE({escaped_column}, VECTOR('[{vector_literal}]', {dim}, FLOAT64), {metric_sql}) AS distance \
             FROM {escaped_table} ORDER BY distance FETCH FIRST {top_k} ROWS ONLY",
            dim = query_vector.len()
        );
        let plan = SqlPlan::literal(sql)?;
        let result = run_query(context, plan).await?;
        Ok(ToolResult::ok(json!({"matches": result.rows}))
            .with_capabilities_used(vec![crate::oracle::capability::CapabilityTag::Vector]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_search_declares_vector_requirement() {
        assert!(VectorSearch.capabilities().contains(ToolCapabilities::REQUIRES_VECTOR));
    }

    #[test]
    fn vector_search_schema_constrains_metric_enum() {
        let schema = VectorSearch.input_schema();
        let metric = schema.properties.unwrap().remove("metric").unwrap();
        assert_eq!(metric.enum_values.unwrap().len(), 3);
    }
}
