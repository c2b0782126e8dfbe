// ABOUTME: MCP protocol schema definitions shared by the dispatcher and the tool registry.
// ABOUTME: Tool schemas themselves come from each McpTool::input_schema(), not a hardcoded catalog.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MCP protocol schema definitions (§4.7 stdio transport, §3 Tool Descriptor).
//!
//! Unlike a REST-facing server, this one has no OAuth/auth capability surface
//! to advertise: the MCP client authenticates to the OS process (stdio), and
//! the process authenticates to Oracle once at startup via `ORACLE_USER`/
//! `ORACLE_PASSWORD`. `ServerCapabilities` only ever reports `tools` and
//! `logging`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const JSONRPC_VERSION: &str = "2.0";
const METHOD_PROGRESS: &str = "notifications/progress";
const METHOD_CANCELLED: &str = "notifications/cancelled";

/// MCP protocol version negotiated at `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolInfo {
    /// MCP protocol version (e.g., "2025-06-18").
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
}

/// Server identity reported in `initialize`'s response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name identifier.
    pub name: String,
    /// Server version string.
    pub version: String,
}

/// Tool schema published via `tools/list` (§3 Tool Descriptor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name, matching `^[a-z][a-z0-9_]{0,63}$`.
    pub name: String,
    /// Human-readable description for LLM consumption.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema for a tool's input object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type, always `"object"` for a tool's top-level input schema.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions for object schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    /// Names of properties that must be present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl JsonSchema {
    /// An empty object schema, for tools that take no arguments.
    #[must_use]
    pub fn empty_object() -> Self {
        Self {
            schema_type: "object".to_owned(),
            properties: None,
            required: None,
        }
    }
}

/// JSON Schema property definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property type (e.g., "string", "number", "boolean", "array").
    #[serde(rename = "type")]
    pub property_type: String,
    /// Human-readable property description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values, for enum-constrained properties.
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    /// Element schema, for `"array"` properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    /// Default value, surfaced to the client for optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl PropertySchema {
    /// A plain, undescribed property of the given JSON type.
    #[must_use]
    pub fn of_type(property_type: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            description: None,
            enum_values: None,
            items: None,
            default: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Constrain to an explicit set of allowed string values.
    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A call to a registered tool, as delivered by `tools/call` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name to execute.
    pub name: String,
    /// Tool arguments as JSON.
    pub arguments: Option<serde_json::Value>,
}

/// MCP server capability advertisement (§4.7 `initialize`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Server logging capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
    /// Server tools capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability: whether `tools/list` can change after `initialize`.
/// This server's registry is frozen after startup, so `list_changed` is
/// always `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether the server emits `notifications/tools/list_changed`.
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Logging capability marker (presence means the server may emit
/// `notifications/message`-shaped log records, which this server does not
/// currently do over stdio — logging goes to stderr, not JSON-RPC frames).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Client capabilities negotiated at `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Experimental client capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, serde_json::Value>>,
    /// Client roots capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
}

/// Roots capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootsCapability {
    /// Whether the client supports list-changed notifications.
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Complete MCP `initialize` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// Negotiated protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Operator-facing usage note surfaced to the connecting client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `initialize` request from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Client's requested protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Client information.
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
    /// Client capabilities.
    pub capabilities: ClientCapabilities,
}

/// Client identity reported in `initialize`'s request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name identifier.
    pub name: String,
    /// Client version string.
    pub version: String,
}

impl InitializeResponse {
    /// Build the fixed initialize response this server advertises. There is
    /// no per-deployment capability negotiation: the tool catalog (filtered
    /// by [`crate::config::ExposureMode`] and detected edition) is the only
    /// thing that varies between instances, and that is discovered via
    /// `tools/list`, not `initialize`.
    #[must_use]
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities {
                logging: Some(LoggingCapability {}),
                tools: Some(ToolsCapability { list_changed: Some(false) }),
            },
            instructions: Some(
                "Oracle database tools over stdio JSON-RPC. Call tools/list to see what this \
                 instance's edition and configured exposure mode make available."
                    .to_owned(),
            ),
        }
    }
}

/// Progress notification for long-running `stream`-mode tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNotification {
    /// JSON-RPC version (`"2.0"`).
    pub jsonrpc: String,
    /// Method name (`"notifications/progress"` or `"notifications/cancelled"`).
    pub method: String,
    /// Progress notification parameters.
    pub params: ProgressParams,
}

/// Progress notification parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressParams {
    /// Token identifying the operation being tracked.
    #[serde(rename = "progressToken")]
    pub progress_token: String,
    /// Current progress value (rows delivered so far, for `stream` calls).
    pub progress: f64,
    /// Optional total value for percentage calculation.
    pub total: Option<f64>,
    /// Optional human-readable progress message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressNotification {
    /// Build a progress notification.
    #[must_use]
    pub fn new(progress_token: String, progress: f64, total: Option<f64>, message: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: METHOD_PROGRESS.to_owned(),
            params: ProgressParams {
                progress_token,
                progress,
                total,
                message,
            },
        }
    }

    /// Build a cancellation acknowledgement notification.
    #[must_use]
    pub fn cancelled(progress_token: String, message: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: METHOD_CANCELLED.to_owned(),
            params: ProgressParams {
                progress_token,
                progress: 0.0,
                total: None,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_response_advertises_tools_and_logging_only() {
        let response = InitializeResponse::new("2025-06-18".to_owned(), "oracle-mcp-server".to_owned(), "0.1.0".to_owned());
        assert!(response.capabilities.tools.is_some());
        assert!(response.capabilities.logging.is_some());
        assert_eq!(response.capabilities.tools.unwrap().list_changed, Some(false));
    }

    #[test]
    fn property_schema_builder_sets_enum_values() {
        let schema = PropertySchema::of_type("string")
            .with_description("execution mode")
            .with_enum(["query", "stream", "execute", "plsql"]);
        assert_eq!(schema.enum_values.unwrap().len(), 4);
    }

    #[test]
    fn empty_object_schema_has_no_required_fields() {
        let schema = JsonSchema::empty_object();
        assert!(schema.required.is_none());
        assert_eq!(schema.schema_type, "object");
    }
}
