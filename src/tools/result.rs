// ABOUTME: Defines ToolResult and ToolNotification — tool output before it reaches the Response Formatter.
// ABOUTME: The Response Formatter (§4.8) wraps ToolResult into the uniform envelope, it never invents data.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool result types (feeds §4.8 Response Formatter).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::oracle::capability::CapabilityTag;

/// What a tool handler hands back to the dispatcher before formatting.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Handler-specific output, becomes `data` in the response envelope.
    pub content: Value,
    /// Capability tags the handler queried or relied on, surfaced in
    /// `metadata.capabilities_used` (§4.8).
    pub capabilities_used: Vec<CapabilityTag>,
    /// Out-of-band notifications (progress updates for long-running calls).
    pub notifications: Vec<ToolNotification>,
}

impl ToolResult {
    /// A successful result with no capability usage to report.
    #[must_use]
    pub fn ok(content: Value) -> Self {
        Self {
            content,
            capabilities_used: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Record which capability tags this result relied on.
    #[must_use]
    pub fn with_capabilities_used(mut self, tags: Vec<CapabilityTag>) -> Self {
        self.capabilities_used = tags;
        self
    }

    /// Attach a notification to this result.
    #[must_use]
    pub fn add_notification(mut self, notification: ToolNotification) -> Self {
        self.notifications.push(notification);
        self
    }

    /// Build a result from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `value` cannot become JSON.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::ok(serde_json::to_value(value)?))
    }
}

impl Default for ToolResult {
    fn default() -> Self {
        Self::ok(Value::Null)
    }
}

/// Out-of-band notification accompanying a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolNotification {
    /// Notification kind.
    pub notification_type: NotificationType,
    /// Notification payload.
    pub data: Value,
}

/// Notification kinds a tool may emit alongside its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Progress update for a long-running `stream` mode call.
    Progress,
}

impl NotificationType {
    /// MCP notification method name.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Progress => "notifications/progress",
        }
    }
}

impl ToolNotification {
    /// Build a progress notification.
    #[must_use]
    pub fn progress(token: &str, rows_delivered: u64, total: Option<u64>) -> Self {
        let mut data = serde_json::json!({
            "progressToken": token,
            "progress": rows_delivered,
        });
        if let Some(total) = total {
            data["total"] = serde_json::json!(total);
        }
        Self {
            notification_type: NotificationType::Progress,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_has_no_capabilities_by_default() {
        let result = ToolResult::ok(serde_json::json!({"rows": 0}));
        assert!(result.capabilities_used.is_empty());
    }

    #[test]
    fn progress_notification_includes_total_when_present() {
        let notification = ToolNotification::progress("req-1", 50, Some(200));
        assert_eq!(notification.data["total"], 200);
        assert_eq!(notification.notification_type.method_name(), "notifications/progress");
    }
}
