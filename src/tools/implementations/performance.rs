// ABOUTME: AWR snapshot handler — take a snapshot or render a text report, gated on the Awr capability.
// ABOUTME: Grounded on §4.10's awr_snapshot handler contract.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::AppResult;
use crate::mcp::schema::{JsonSchema, PropertySchema};
use crate::oracle::builder::{BindValue, SqlPlan};
use crate::oracle::capability::CapabilityTag;
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::traits::{McpTool, ToolCapabilities, ToolCategory, ToolExposure};

use super::{object_schema, optional_string, require_capabilities, run_query};

/// `awr_snapshot` — `take` a snapshot or `report` between two snapshot ids.
pub struct AwrSnapshot;

#[async_trait]
impl McpTool for AwrSnapshot {
    fn name(&self) -> &'static str {
        "awr_snapshot"
    }
    fn description(&self) -> &'static str {
        "Take an AWR snapshot, or render an AWR report between two begin/end snapshot ids. \
         Requires Diagnostics Pack (AWR) licensing."
    }
    fn input_schema(&self) -> JsonSchema {
        object_schema(
            &[
                ("operation", PropertySchema::of_type("string").with_enum(["take", "report"])),
                ("begin", PropertySchema::of_type("string").with_description("begin snapshot id, for operation=report")),
                ("end", PropertySchema::of_type("string").with_description("end snapshot id, for operation=report")),
            ],
            &["operation"],
        )
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::REQUIRES_AWR | ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Restricted
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Performance
    }
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let capabilities = context.capabilities().await;
        require_capabilities(&capabilities, &self.capabilities())?;

        let operation = super::required_string(self.name(), &args, "operation")?;
        match operation {
            "take" => {
                let plan = SqlPlan::literal("BEGIN DBMS_WORKLOAD_REPOSITORY.CREATE_SNAPSHOT(); END;")?;
                super::run_execute(context, plan).await?;
                let latest = run_query(
                    context,
                    SqlPlan::literal("SELECT MAX(snap_id) AS snap_id FROM dba_hist_snapshot")?,
                )
                .await?;
                let snap_id = latest.rows.first().and_then(|row| row.get("SNAP_ID"));
                Ok(ToolResult::ok(json!({"snap_id": snap_id}))
                    .with_capabilities_used(vec![CapabilityTag::Awr]))
            }
            "report" => {
                let begin = optional_string(&args, "begin")
                    .ok_or_else(|| crate::errors::AppError::validation("operation=report requires 'begin'"))?;
                let end = optional_string(&args, "end")
                    .ok_or_else(|| crate::errors::AppError::validation("operation=report requires 'end'"))?;
                let plan = SqlPlan::with_binds(
                    "SELECT output FROM TABLE(DBMS_WORKLOAD_REPOSITORY.AWR_REPORT_TEXT( \
                     (SELECT dbid FROM v$database), (SELECT instance_number FROM v$instance), :1, :2))",
                    vec![BindValue::Text(begin.to_owned()), BindValue::Text(end.to_owned())],
                )?;
                let result = run_query(context, plan).await?;
                let report_text = result
                    .rows
                    .iter()
                    .filter_map(|row| row.get("OUTPUT"))
                    .map(|value| format!("{value:?}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ToolResult::ok(json!({"report_text": report_text})).with_capabilities_used(vec![CapabilityTag::Awr]))
            }
            other => Err(crate::errors::AppError::validation(format!("unknown operation '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awr_snapshot_requires_awr_capability() {
        assert!(AwrSnapshot.capabilities().contains(ToolCapabilities::REQUIRES_AWR));
    }

    #[test]
    fn awr_snapshot_is_restricted() {
        assert_eq!(AwrSnapshot.exposure(), ToolExposure::Restricted);
    }
}
