// ABOUTME: Response Formatter — wraps a ToolResult into the uniform envelope the dispatcher writes (§4.8).
// ABOUTME: Never invents data: execution_ms is measured, capabilities_used is copied, errors never leak SQL text.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response formatter (§3 Response Envelope, §4.8).

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::oracle::capability::CapabilityTag;

use super::result::{ToolNotification, ToolResult};

/// The uniform envelope every `tools/call` produces, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    /// `"success"` or `"error"`.
    pub status: &'static str,
    /// Handler-specific payload, `null` on error.
    pub data: Option<Value>,
    /// Call metadata.
    pub metadata: ResponseMetadata,
    /// Populated only on failure.
    pub error: Option<ErrorObject>,
}

/// Metadata attached to every response, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    /// Name of the tool that was called.
    pub tool: String,
    /// Wall-clock milliseconds from validation start to handler return.
    pub execution_ms: u64,
    /// Detected Oracle version string.
    pub oracle_version: String,
    /// Capability tags the handler queried or relied on.
    pub capabilities_used: Vec<CapabilityTag>,
}

/// Error object shape (§3 "Error Object").
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// Closed error category.
    pub kind: crate::errors::ErrorKind,
    /// Stable machine-readable token or raw Oracle error code.
    pub code: String,
    /// Client-safe message; never a stack trace or raw SQL text.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&AppError> for ErrorObject {
    fn from(error: &AppError) -> Self {
        Self {
            kind: error.kind,
            code: error.code.clone(),
            message: error.message.clone(),
            hint: error.hint.clone(),
        }
    }
}

/// Tracks the validation-start timestamp and produces the final envelope,
/// measuring `execution_ms` from construction to [`Self::success`]/
/// [`Self::failure`].
pub struct ResponseFormatter {
    tool: String,
    started_at: Instant,
    oracle_version: String,
}

impl ResponseFormatter {
    /// Start timing a call. `oracle_version` should come from the current
    /// capability snapshot (`"unknown"` if the detector has never probed
    /// successfully).
    #[must_use]
    pub fn start(tool: impl Into<String>, oracle_version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            started_at: Instant::now(),
            oracle_version: oracle_version.into(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn metadata(&self, capabilities_used: Vec<CapabilityTag>) -> ResponseMetadata {
        ResponseMetadata {
            tool: self.tool.clone(),
            execution_ms: self.elapsed_ms(),
            oracle_version: self.oracle_version.clone(),
            capabilities_used,
        }
    }

    /// Wrap a successful [`ToolResult`] into the envelope.
    #[must_use]
    pub fn success(self, result: ToolResult) -> ResponseEnvelope {
        ResponseEnvelope {
            status: "success",
            data: Some(result.content),
            metadata: self.metadata(result.capabilities_used),
            error: None,
        }
    }

    /// Wrap a failure into the envelope. `data` is always `null`.
    #[must_use]
    pub fn failure(self, error: &AppError) -> ResponseEnvelope {
        ResponseEnvelope {
            status: "error",
            data: None,
            metadata: self.metadata(Vec::new()),
            error: Some(error.into()),
        }
    }
}

/// Truncate a LOB preview to `limit` bytes at a UTF-8-safe boundary, marking
/// whether truncation occurred (§4.8 "LOB previews").
#[must_use]
pub fn truncate_lob_preview(text: &str, limit: usize) -> (String, bool) {
    if text.len() <= limit {
        return (text.to_owned(), false);
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_owned(), true)
}

/// Serialize any progress [`ToolNotification`] list into MCP
/// `notifications/progress` frames, for the dispatcher to write alongside
/// the final response.
#[must_use]
pub fn notification_frames(notifications: &[ToolNotification]) -> Vec<Value> {
    notifications
        .iter()
        .map(|notification| {
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": notification.notification_type.method_name(),
                "params": notification.data,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_has_null_error() {
        let formatter = ResponseFormatter::start("list_databases", "19.3.0.0.0");
        let envelope = formatter.success(ToolResult::ok(json!({"databases": []})));
        assert_eq!(envelope.status, "success");
        assert!(envelope.error.is_none());
        assert!(envelope.data.is_some());
    }

    #[test]
    fn failure_envelope_has_null_data() {
        let formatter = ResponseFormatter::start("create_user", "19.3.0.0.0");
        let error = AppError::validation("username is required");
        let envelope = formatter.failure(&error);
        assert_eq!(envelope.status, "error");
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.unwrap().code, "validation_error");
    }

    #[test]
    fn lob_preview_truncates_at_char_boundary() {
        let (preview, truncated) = truncate_lob_preview("hello world", 5);
        assert_eq!(preview, "hello");
        assert!(truncated);
    }

    #[test]
    fn lob_preview_under_limit_is_not_truncated() {
        let (preview, truncated) = truncate_lob_preview("hi", 5);
        assert_eq!(preview, "hi");
        assert!(!truncated);
    }
}
