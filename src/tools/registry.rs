// ABOUTME: Canonical source of tool metadata and handler resolution (§4.1 Tool Registry).
// ABOUTME: Registration is startup-only; the registry freezes itself before the dispatcher starts serving calls.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry (§4.1).
//!
//! Registration order is preserved (`Vec<String>` of names alongside the
//! lookup map) so `list()` returns a stable order, matching the spec's
//! "ordering is stable (registration order)" rule.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};
use crate::mcp::schema::ToolSchema;

use super::errors::ToolError;
use super::traits::{McpTool, ToolExposure};

fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("static pattern is valid"))
}

/// Exposure filter applied by `tools/list` and `tools/call` (§4.1, distinct
/// from the per-server [`crate::config::ExposureMode`] only in that the
/// registry takes it as an explicit argument rather than reading config
/// itself, keeping `list`/`lookup` pure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureFilter {
    /// Only tools tagged `public`.
    Public,
    /// Public and restricted tools.
    All,
}

impl ExposureFilter {
    fn allows(self, exposure: ToolExposure) -> bool {
        match self {
            Self::Public => exposure == ToolExposure::Public,
            Self::All => true,
        }
    }
}

/// Canonical tool registry. Built once at startup via [`Self::register`],
/// then [`Self::freeze`]d before the dispatcher borrows it for the lifetime
/// of the process.
pub struct ToolRegistry {
    tools: std::collections::HashMap<String, Arc<dyn McpTool>>,
    order: Vec<String>,
    frozen: bool,
}

impl ToolRegistry {
    /// An empty, unfrozen registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: std::collections::HashMap::new(),
            order: Vec::new(),
            frozen: false,
        }
    }

    /// Register a tool. Startup-only.
    ///
    /// # Errors
    ///
    /// - `ToolError::RegistryFrozen` if called after [`Self::freeze`].
    /// - `ToolError::InvalidSchema` if the name fails `^[a-z][a-z0-9_]{0,63}$`.
    /// - `ToolError::DuplicateTool` if the name is already registered.
    pub fn register(&mut self, tool: Arc<dyn McpTool>) -> Result<(), ToolError> {
        let name = tool.name().to_owned();
        if self.frozen {
            return Err(ToolError::RegistryFrozen { tool_name: name });
        }
        if !tool_name_pattern().is_match(&name) {
            return Err(ToolError::InvalidSchema {
                tool_name: name,
                reason: "name must match ^[a-z][a-z0-9_]{0,63}$".to_owned(),
            });
        }
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { tool_name: name });
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Freeze the registry. Every subsequent [`Self::register`] call fails
    /// with `E_REGISTRY_FROZEN` (§4.1 invariant).
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// `true` once [`Self::freeze`] has been called.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Look up a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::UnknownTool` if no tool with that name is
    /// registered.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn McpTool>, ToolError> {
        self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            tool_name: name.to_owned(),
        })
    }

    /// Published schemas for tools visible under `filter`, in registration
    /// order.
    #[must_use]
    pub fn list(&self, filter: ExposureFilter) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .filter(|tool| filter.allows(tool.exposure()))
            .map(|tool| ToolSchema {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tool_count", &self.tools.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// Register every built-in tool and freeze the registry. Called once during
/// server startup.
///
/// # Errors
///
/// Returns the first registration failure encountered (should never happen
/// for the built-in catalog outside of a programming error).
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> AppResult<()> {
    for tool in super::implementations::all_tools() {
        registry.register(tool).map_err(Into::<AppError>::into)?;
    }
    registry.freeze();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::schema::JsonSchema;
    use crate::oracle::capability::CapabilityTag;
    use crate::tools::context::ToolExecutionContext;
    use crate::tools::result::ToolResult;
    use crate::tools::traits::{ToolCapabilities, ToolCategory};
    use async_trait::async_trait;

    struct StubTool {
        name: &'static str,
        exposure: ToolExposure,
    }

    #[async_trait]
    impl McpTool for StubTool {
        fn name(&self) -> &'static str {
            self.name
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        fn input_schema(&self) -> JsonSchema {
            JsonSchema::empty_object()
        }
        fn capabilities(&self) -> ToolCapabilities {
            ToolCapabilities::empty()
        }
        fn exposure(&self) -> ToolExposure {
            self.exposure
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Core
        }
        async fn execute(&self, _args: serde_json::Value, _context: &ToolExecutionContext) -> AppResult<ToolResult> {
            Ok(ToolResult::default())
        }
    }

    fn stub(name: &'static str, exposure: ToolExposure) -> Arc<dyn McpTool> {
        Arc::new(StubTool { name, exposure })
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(stub("run_query", ToolExposure::Public)).unwrap();
        let error = registry.register(stub("run_query", ToolExposure::Public)).unwrap_err();
        assert!(matches!(error, ToolError::DuplicateTool { .. }));
    }

    #[test]
    fn invalid_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        let error = registry.register(stub("RunQuery", ToolExposure::Public)).unwrap_err();
        assert!(matches!(error, ToolError::InvalidSchema { .. }));
    }

    #[test]
    fn registration_after_freeze_fails() {
        let mut registry = ToolRegistry::new();
        registry.freeze();
        let error = registry.register(stub("run_query", ToolExposure::Public)).unwrap_err();
        assert!(matches!(error, ToolError::RegistryFrozen { .. }));
    }

    #[test]
    fn unknown_lookup_fails() {
        let registry = ToolRegistry::new();
        assert!(matches!(registry.lookup("nope"), Err(ToolError::UnknownTool { .. })));
    }

    #[test]
    fn public_filter_excludes_restricted_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(stub("public_tool", ToolExposure::Public)).unwrap();
        registry.register(stub("restricted_tool", ToolExposure::Restricted)).unwrap();
        assert_eq!(registry.list(ExposureFilter::Public).len(), 1);
        assert_eq!(registry.list(ExposureFilter::All).len(), 2);
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(stub("zzz_tool", ToolExposure::Public)).unwrap();
        registry.register(stub("aaa_tool", ToolExposure::Public)).unwrap();
        let names: Vec<_> = registry.list(ExposureFilter::All).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zzz_tool", "aaa_tool"]);
    }

    #[test]
    fn unknown_capability_tag_name_never_appears_among_real_tags() {
        assert_eq!(CapabilityTag::from_str_opt("not_real"), None);
    }
}
