// ABOUTME: Analytical function and pivot handlers, thin wrappers over the SQL Builder's window/pivot generators.
// ABOUTME: Grounded on §4.3 build_analytical/build_pivot and the §4.10 analytical function policy note.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::AppResult;
use crate::mcp::schema::{JsonSchema, PropertySchema};
use crate::oracle::builder;
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::traits::{McpTool, ToolCapabilities, ToolCategory, ToolExposure};

use super::{object_schema, required_string, run_query, string_array};

/// `window_functions` — `ROW_NUMBER`/`RANK`/`LAG`/`PERCENTILE_*` etc. over a
/// table, following the §4.10 analytical function emission policy.
pub struct WindowFunctions;

#[async_trait]
impl McpTool for WindowFunctions {
    fn name(&self) -> &'static str {
        "window_functions"
    }
    fn description(&self) -> &'static str {
        "Run an analytical (window) function over a table: ROW_NUMBER, RANK, DENSE_RANK, NTILE, LAG, \
         LEAD, or PERCENTILE_CONT/PERCENTILE_DISC, with PARTITION BY / ORDER BY."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("table", PropertySchema::of_type("string")),
                ("fn", PropertySchema::of_type("string").with_description("e.g. RANK, LAG, PERCENTILE_CONT")),
                ("partition_by", PropertySchema::of_type("array")),
                ("order_by", PropertySchema::of_type("array")),
                ("parameters", PropertySchema::of_type("array").with_description("positional args, e.g. [\"1\"] for LAG offset")),
            ],
            &["table", "fn"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let table = required_string(self.name(), &args, "table")?;
        let function = required_string(self.name(), &args, "fn")?;
        let partition_by = string_array(&args, "partition_by");
        let order_by = string_array(&args, "order_by");
        let parameters = string_array(&args, "parameters");

        let plan = builder::build_analytical(
            table,
            function,
            (!partition_by.is_empty()).then_some(partition_by.as_slice()),
            (!order_by.is_empty()).then_some(order_by.as_slice()),
            (!parameters.is_empty()).then_some(parameters.as_slice()),
        )?;
        let result = run_query(context, plan).await?;
        Ok(ToolResult::ok(json!({"rows": result.rows})))
    }
}

/// `pivot_operations` — wraps a source query in a `PIVOT` clause.
pub struct PivotOperations;

#[async_trait]
impl McpTool for PivotOperations {
    fn name(&self) -> &'static str {
        "pivot_operations"
    }
    fn description(&self) -> &'static str {
        "Pivot the result of a source SELECT on a column, producing one output column per listed value."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("source_query", PropertySchema::of_type("string").with_description("a plain SELECT, no trailing semicolon")),
                ("pivot_column", PropertySchema::of_type("string")),
                ("values", PropertySchema::of_type("array")),
            ],
            &["source_query", "pivot_column", "values"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Analytics
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let source_query = required_string(self.name(), &args, "source_query")?;
        let pivot_column = required_string(self.name(), &args, "pivot_column")?;
        let values = string_array(&args, "values");

        let plan = builder::build_pivot(source_query, pivot_column, &values)?;
        let result = run_query(context, plan).await?;
        Ok(ToolResult::ok(json!({"rows": result.rows})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_functions_requires_table_and_fn() {
        let schema = WindowFunctions.input_schema();
        let required = schema.required.unwrap();
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn pivot_operations_is_read_only() {
        assert_eq!(PivotOperations.capabilities(), ToolCapabilities::READS_DATA);
    }
}
