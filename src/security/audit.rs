// ABOUTME: Structured audit logging for security-relevant tool outcomes.
// ABOUTME: Every blocked operation and every privileged mutation is recorded here, not just the error path.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security audit log.
//!
//! Distinct from ordinary `tracing` call-site logs: audit events are a
//! closed, structured vocabulary meant to be grepped or shipped to a SIEM,
//! not free-form diagnostic text. Emission still goes through `tracing`
//! (stderr, per [`crate::logging`]) at a dedicated target so operators can
//! filter on it independently (`RUST_LOG=oracle_mcp_server::security::audit=info`).

use serde::Serialize;

/// Target string audit events are emitted under.
pub const AUDIT_TARGET: &str = "oracle_mcp_server::security::audit";

/// Outcome of a security-relevant decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The operation proceeded.
    Allowed,
    /// The operation was rejected by the system-object denylist.
    BlockedSystemObject,
    /// The operation was rejected because the tool is not exposed in the
    /// current [`crate::config::ExposureMode`].
    BlockedExposure,
    /// The operation was rejected by a privilege/ownership check.
    BlockedPrivilege,
}

/// A single audit record. Serializable so it can be emitted as structured
/// JSON via `tracing`'s `%`/`?` formatting or forwarded to an external sink.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    /// Tool that was invoked.
    pub tool_name: &'a str,
    /// Decision outcome.
    pub outcome: AuditOutcome,
    /// Free-text detail (e.g. the denied identifier, or the missing
    /// capability tag). Never includes bind values or credentials.
    pub detail: &'a str,
    /// Correlation id from the request envelope, when present.
    pub request_id: Option<&'a str>,
}

impl<'a> AuditEvent<'a> {
    /// Record this event to the audit target.
    pub fn record(&self) {
        match self.outcome {
            AuditOutcome::Allowed => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    tool = self.tool_name,
                    outcome = ?self.outcome,
                    detail = self.detail,
                    request_id = self.request_id,
                    "tool call allowed"
                );
            }
            AuditOutcome::BlockedSystemObject
            | AuditOutcome::BlockedExposure
            | AuditOutcome::BlockedPrivilege => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    tool = self.tool_name,
                    outcome = ?self.outcome,
                    detail = self.detail,
                    request_id = self.request_id,
                    "tool call blocked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_without_panicking() {
        let event = AuditEvent {
            tool_name: "create_user",
            outcome: AuditOutcome::BlockedSystemObject,
            detail: "target identifier SYS is denylisted",
            request_id: Some("req-1"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("blocked_system_object"));
    }
}
