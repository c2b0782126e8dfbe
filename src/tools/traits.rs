// ABOUTME: Defines the McpTool trait, ToolCapabilities, exposure, and category vocabulary for the catalog.
// ABOUTME: Tools implement McpTool to be registered and executed via the ToolRegistry.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MCP tool trait and capability vocabulary (§3 Tool Descriptor, §4.1).
//!
//! Mirrors the teacher's tool-trait shape (capability bitflags plus an async
//! `execute`), but the flags here map onto the Oracle feature vocabulary
//! (§4.2 [`crate::oracle::capability::CapabilityTag`]) and DDL/DML intent
//! rather than fitness-domain role/provider checks.

use async_trait::async_trait;
use bitflags::bitflags;
use serde_json::Value;

use crate::errors::AppResult;
use crate::mcp::schema::JsonSchema;
use crate::oracle::capability::CapabilityTag;

use super::context::ToolExecutionContext;
use super::result::ToolResult;

bitflags! {
    /// Capabilities a tool declares for filtering, capability-gating, and
    /// audit classification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToolCapabilities: u16 {
        /// Requires [`CapabilityTag::Pdb`] on the live instance.
        const REQUIRES_PDB = 0b0000_0000_0001;
        /// Requires [`CapabilityTag::Awr`].
        const REQUIRES_AWR = 0b0000_0000_0010;
        /// Requires [`CapabilityTag::Partitioning`].
        const REQUIRES_PARTITIONING = 0b0000_0000_0100;
        /// Requires [`CapabilityTag::Vector`].
        const REQUIRES_VECTOR = 0b0000_0000_1000;
        /// Requires [`CapabilityTag::Json`].
        const REQUIRES_JSON = 0b0000_0001_0000;
        /// Requires [`CapabilityTag::Tde`].
        const REQUIRES_TDE = 0b0000_0010_0000;
        /// Requires [`CapabilityTag::Vault`].
        const REQUIRES_VAULT = 0b0000_0100_0000;
        /// Requires [`CapabilityTag::Parallel`].
        const REQUIRES_PARALLEL = 0b0000_1000_0000;
        /// Tool only reads (a `SELECT`-shaped operation).
        const READS_DATA = 0b0001_0000_0000;
        /// Tool writes or alters schema/data.
        const WRITES_DATA = 0b0010_0000_0000;
        /// Tool can drop or irreversibly alter an object (`DROP`,
        /// `TRUNCATE`, `ALTER ... SHRINK`); surfaced in audit logs.
        const DESTRUCTIVE = 0b0100_0000_0000;
    }
}

impl ToolCapabilities {
    /// The [`CapabilityTag`]s this tool requires the live instance to
    /// support, derived from the `REQUIRES_*` flags.
    #[must_use]
    pub fn required_tags(self) -> Vec<CapabilityTag> {
        let table = [
            (Self::REQUIRES_PDB, CapabilityTag::Pdb),
            (Self::REQUIRES_AWR, CapabilityTag::Awr),
            (Self::REQUIRES_PARTITIONING, CapabilityTag::Partitioning),
            (Self::REQUIRES_VECTOR, CapabilityTag::Vector),
            (Self::REQUIRES_JSON, CapabilityTag::Json),
            (Self::REQUIRES_TDE, CapabilityTag::Tde),
            (Self::REQUIRES_VAULT, CapabilityTag::Vault),
            (Self::REQUIRES_PARALLEL, CapabilityTag::Parallel),
        ];
        table
            .into_iter()
            .filter_map(|(flag, tag)| self.contains(flag).then_some(tag))
            .collect()
    }

    /// `true` if this tool may irreversibly alter or destroy data.
    #[must_use]
    pub const fn is_destructive(self) -> bool {
        self.contains(Self::DESTRUCTIVE)
    }

    /// Human-readable flag list for audit/diagnostic logging.
    #[must_use]
    pub fn describe(self) -> String {
        let mut parts = Vec::new();
        if self.contains(Self::READS_DATA) {
            parts.push("reads_data");
        }
        if self.contains(Self::WRITES_DATA) {
            parts.push("writes_data");
        }
        if self.contains(Self::DESTRUCTIVE) {
            parts.push("destructive");
        }
        for tag in self.required_tags() {
            parts.push(match tag {
                CapabilityTag::Pdb => "requires_pdb",
                CapabilityTag::Awr => "requires_awr",
                CapabilityTag::Partitioning => "requires_partitioning",
                CapabilityTag::Vector => "requires_vector",
                CapabilityTag::Json => "requires_json",
                CapabilityTag::Tde => "requires_tde",
                CapabilityTag::Vault => "requires_vault",
                CapabilityTag::Parallel => "requires_parallel",
            });
        }
        if parts.is_empty() {
            "none".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

/// Exposure policy for a tool descriptor (§3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExposure {
    /// Surfaced under both `public` and `all` server exposure modes.
    Public,
    /// Surfaced only when the server's exposure mode is `all`.
    Restricted,
}

/// Catalog grouping for a tool descriptor (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Database/schema/user/table primitives.
    Core,
    /// Analytical functions, pivots, window queries.
    Analytics,
    /// AI-adjacent tools (vector search, embeddings-backed lookup).
    Ai,
    /// Account, privilege, and audit tools.
    Security,
    /// AWR/session/SQL-tuning diagnostics.
    Performance,
    /// Privileged DDL (grants, profiles, roles).
    Privilege,
    /// Read-only instance/session diagnostics.
    Diagnostic,
}

/// The trait every catalog tool implements (§4.10).
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Unique identifier, matching `^[a-z][a-z0-9_]{0,63}$` (§4.1).
    fn name(&self) -> &'static str;

    /// Human-readable description for LLM consumption.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters, published via `tools/list`.
    fn input_schema(&self) -> JsonSchema;

    /// Capability flags: exposure-adjacent requirements and DDL/DML intent.
    fn capabilities(&self) -> ToolCapabilities;

    /// Exposure policy.
    fn exposure(&self) -> ToolExposure;

    /// Catalog category.
    fn category(&self) -> ToolCategory;

    /// Execute the tool with validated arguments and an execution context.
    ///
    /// # Errors
    ///
    /// Returns `AppError` for capability, validation, security, or driver
    /// failures, translated by [`crate::errors`].
    async fn execute(&self, args: Value, context: &ToolExecutionContext) -> AppResult<ToolResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_tags_reflects_flags() {
        let caps = ToolCapabilities::REQUIRES_PDB | ToolCapabilities::REQUIRES_VECTOR;
        assert_eq!(caps.required_tags(), vec![CapabilityTag::Pdb, CapabilityTag::Vector]);
    }

    #[test]
    fn describe_lists_flags_and_tags() {
        let caps = ToolCapabilities::WRITES_DATA | ToolCapabilities::DESTRUCTIVE;
        let description = caps.describe();
        assert!(description.contains("writes_data"));
        assert!(description.contains("destructive"));
    }

    #[test]
    fn describe_handles_empty_flags() {
        assert_eq!(ToolCapabilities::empty().describe(), "none");
    }
}
