// ABOUTME: Liveness diagnostic handler — round-trips `SELECT 1 FROM DUAL` and reports the live capability snapshot.
// ABOUTME: Grounded on §4.7's dispatcher-level ping contract, exposed here as a catalog tool for tools/call clients.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::AppResult;
use crate::mcp::schema::JsonSchema;
use crate::oracle::builder::SqlPlan;
use crate::tools::context::ToolExecutionContext;
use crate::tools::result::ToolResult;
use crate::tools::traits::{McpTool, ToolCapabilities, ToolCategory, ToolExposure};

use super::run_query;

const ALL_TAGS: &[crate::oracle::capability::CapabilityTag] = &[
    crate::oracle::capability::CapabilityTag::Pdb,
    crate::oracle::capability::CapabilityTag::Awr,
    crate::oracle::capability::CapabilityTag::Partitioning,
    crate::oracle::capability::CapabilityTag::Vector,
    crate::oracle::capability::CapabilityTag::Json,
    crate::oracle::capability::CapabilityTag::Tde,
    crate::oracle::capability::CapabilityTag::Vault,
    crate::oracle::capability::CapabilityTag::Parallel,
];

/// `ping` — confirms the pool can reach the instance and reports the
/// current capability snapshot, without requiring any particular feature.
pub struct Ping;

#[async_trait]
impl McpTool for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }
    fn description(&self) -> &'static str {
        "Round-trip a trivial query against the connection pool and report the live capability snapshot."
    }
    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty_object()
    }
    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities::READS_DATA
    }
    fn exposure(&self) -> ToolExposure {
        ToolExposure::Public
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Diagnostic
    }
    async fn execute(&self, _args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult> {
        let plan = SqlPlan::literal("SELECT 1 AS ok FROM dual")?;
        run_query(context, plan).await?;

        let capabilities = context.capabilities().await;
        let supported: Vec<_> = ALL_TAGS.iter().filter(|tag| capabilities.supports(**tag)).collect();
        Ok(ToolResult::ok(json!({
            "status": "ok",
            "capabilities": supported,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_requires_no_capability_tags() {
        assert!(Ping.capabilities().required_tags().is_empty());
    }

    #[test]
    fn ping_schema_takes_no_arguments() {
        let schema = Ping.input_schema();
        assert!(schema.properties.is_none() || schema.properties.unwrap().is_empty());
    }
}
