// ABOUTME: JSON-RPC 2.0 frame types exchanged over the stdio transport.
// ABOUTME: Request/response/notification shapes only; routing lives in dispatcher.rs.
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! JSON-RPC 2.0 wire types (§6).
//!
//! The server never writes anything but these frames to stdout; every other
//! diagnostic goes to stderr via `tracing`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON-RPC request frame read from stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Present for requests; absent for notifications (`$/cancelNotification`).
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn jsonrpc_version() -> String {
    "2.0".to_owned()
}

impl McpRequest {
    /// `true` if this frame carries no `id` and is therefore a notification
    /// (no response frame is ever emitted for it).
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC response frame written to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct McpResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    #[must_use]
    pub fn failure(id: Value, error: McpError) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(error) }
    }
}

/// JSON-RPC-level error (transport/protocol faults, not tool-call failures —
/// those are reported inside a successful `tools/call` result envelope
/// instead, per §4.8).
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("unknown method '{method}'"))
    }

    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message.into())
    }
}

/// `$/cancelNotification` params: `{id}` naming the in-flight request to cancel.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelNotificationParams {
    pub id: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_id_is_a_notification() {
        let request: McpRequest = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "method": "$/cancelNotification",
            "params": {"id": 1},
        }))
        .unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn success_response_omits_error_field() {
        let response = McpResponse::success(Value::from(1), serde_json::json!({"ok": true}));
        let encoded = serde_json::to_value(&response).unwrap();
        assert!(encoded.get("error").is_none());
    }

    #[test]
    fn failure_response_omits_result_field() {
        let response = McpResponse::failure(Value::from(1), McpError::method_not_found("bogus"));
        let encoded = serde_json::to_value(&response).unwrap();
        assert!(encoded.get("result").is_none());
        assert_eq!(encoded["error"]["code"], McpError::METHOD_NOT_FOUND);
    }
}
