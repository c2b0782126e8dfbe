// ABOUTME: Per-call execution context threaded through every McpTool::execute invocation.
// ABOUTME: Carries shared server resources plus the deadline/cancellation scope of one tools/call.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool execution context.
//!
//! This server has no multi-tenant auth model (§4.7 Non-goals): one process,
//! one Oracle account, one JSON-RPC peer over stdio. So unlike the teacher's
//! `ToolExecutionContext` (user/tenant/auth-method-carrying), this one only
//! carries what a single call actually needs: shared resources, a deadline,
//! and a cancellation scope tied to the request's `$/cancelNotification`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::mcp::resources::ServerResources;
use crate::oracle::capability::CapabilitySet;
use crate::oracle::engine::ExecutionEngine;
use crate::oracle::pool::ConnectionPool;

/// Everything a tool handler needs besides its own validated arguments.
pub struct ToolExecutionContext {
    /// JSON-RPC request id this call was dispatched under, if any (absent
    /// for notification-style calls, which this server does not currently
    /// accept for `tools/call`).
    pub request_id: Option<Value>,
    /// Shared server resources (pool, engine, capability detector, config,
    /// registry).
    pub resources: Arc<ServerResources>,
    /// Wall-clock deadline for this call, derived from the tool's own
    /// timeout or `query.timeout_ms`.
    pub deadline: Instant,
    /// Cancellation scope for this call, cancelled when the dispatcher
    /// receives a matching `$/cancelNotification`.
    pub cancellation: CancellationToken,
}

impl ToolExecutionContext {
    /// Build a context for a call with the given timeout, scoped to its own
    /// child of the dispatcher's root cancellation token.
    #[must_use]
    pub fn new(resources: Arc<ServerResources>, timeout: Duration, parent: &CancellationToken) -> Self {
        Self {
            request_id: None,
            resources,
            deadline: Instant::now() + timeout,
            cancellation: parent.child_token(),
        }
    }

    /// Attach the originating JSON-RPC request id, for correlation in audit
    /// logs and progress notifications.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Value) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Connection pool for this call's driver I/O.
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.resources.pool
    }

    /// Execution engine for running a built [`crate::oracle::builder::SqlPlan`].
    #[must_use]
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.resources.engine
    }

    /// Current capability snapshot, refreshing first if stale.
    pub async fn capabilities(&self) -> Arc<CapabilitySet> {
        self.resources.capability_detector.info().await
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<crate::config::environment::ServerConfig> {
        &self.resources.config
    }

    /// Time remaining before this call's deadline, zero if already past it.
    #[must_use]
    pub fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// `true` if the call's deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_time().is_zero()
    }

    /// `true` if a `$/cancelNotification` has cancelled this call.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl std::fmt::Debug for ToolExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutionContext")
            .field("request_id", &self.request_id)
            .field("resources", &"<ServerResources>")
            .field("remaining_time", &self.remaining_time())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::resources::test_support::test_resources;

    #[tokio::test]
    async fn fresh_context_is_not_expired_or_cancelled() {
        let resources = test_resources();
        let root = CancellationToken::new();
        let context = ToolExecutionContext::new(resources, Duration::from_secs(30), &root);
        assert!(!context.is_expired());
        assert!(!context.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_parent_token_propagates_to_child() {
        let resources = test_resources();
        let root = CancellationToken::new();
        let context = ToolExecutionContext::new(resources, Duration::from_secs(30), &root);
        root.cancel();
        assert!(context.is_cancelled());
    }

    #[tokio::test]
    async fn request_id_round_trips_through_builder() {
        let resources = test_resources();
        let root = CancellationToken::new();
        let context =
            ToolExecutionContext::new(resources, Duration::from_secs(30), &root).with_request_id(serde_json::json!(7));
        assert_eq!(context.request_id, Some(serde_json::json!(7)));
    }
}
