// ABOUTME: Stdio dispatcher — reads JSON-RPC frames from stdin, routes them, writes responses to stdout.
// ABOUTME: Owns per-request worker spawning, the serialized stdout writer, cancellation, and graceful shutdown (§4.7, §5).
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatcher (§4.7).
//!
//! One process, one stdio peer. Every request with a distinct `id` runs on
//! its own worker task so concurrent `tools/call`s can overlap; stdout
//! writes are serialized through a single writer task so frames never
//! interleave. `stdout` carries JSON-RPC frames exclusively — every
//! diagnostic goes through `tracing` to stderr instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::environment::ExposureMode;
use crate::errors::AppError;
use crate::mcp::protocol::{CancelNotificationParams, McpError, McpRequest, McpResponse};
use crate::mcp::resources::ServerResources;
use crate::mcp::schema::{InitializeResponse, ToolCall};
use crate::tools::context::ToolExecutionContext;
use crate::tools::formatter::ResponseFormatter;
use crate::tools::registry::ExposureFilter;
use crate::tools::validator::{self, UnknownFieldPolicy};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "oracle-mcp-server";
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request deadline (§5 "a per-call deadline, defaulting to 300s"),
/// overridden downward by `query.timeout_ms` inside individual handlers.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Keys a request's cancellation token by the string form of its JSON-RPC
/// `id` (ids are numbers or strings on the wire; `Value` itself has no
/// total-order `Hash` impl because of floats, so the canonical string is
/// what both the registry and `$/cancelNotification` agree on).
type CancellationRegistry = Arc<Mutex<HashMap<String, CancellationToken>>>;

fn id_key(id: &Value) -> String {
    id.to_string()
}

/// Owns the stdio read loop, the worker pool, and the write-serializing
/// channel. Construct once per process.
pub struct Dispatcher {
    resources: Arc<ServerResources>,
    cancellations: CancellationRegistry,
    root_cancellation: CancellationToken,
    drain_timeout: Duration,
}

impl Dispatcher {
    /// Build a dispatcher over already-assembled server resources.
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self {
            resources,
            cancellations: Arc::new(Mutex::new(HashMap::new())),
            root_cancellation: CancellationToken::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Run the stdio loop to completion: reads frames until stdin closes or
    /// a `shutdown` request is served, then drains in-flight work.
    ///
    /// # Errors
    ///
    /// Returns an error only for an unrecoverable stdin/stdout I/O fault;
    /// malformed or unknown-method frames are reported back to the client
    /// as JSON-RPC errors, not propagated here.
    pub async fn run(self) -> Result<(), AppError> {
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(frame) = writer_rx.recv().await {
                let mut line = match serde_json::to_string(&frame) {
                    Ok(line) => line,
                    Err(error) => {
                        error!(%error, "failed to serialize outgoing frame");
                        continue;
                    }
                };
                line.push('\n');
                if let Err(error) = stdout.write_all(line.as_bytes()).await {
                    error!(%error, "stdout write failed");
                    break;
                }
                if let Err(error) = stdout.flush().await {
                    error!(%error, "stdout flush failed");
                    break;
                }
            }
        });

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let mut workers = JoinSet::new();
        let mut shutting_down = false;

        loop {
            tokio::select! {
                line = lines.next_line(), if !shutting_down => {
                    let Some(line) = line.map_err(AppError::from)? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let request: McpRequest = match serde_json::from_str(&line) {
                        Ok(request) => request,
                        Err(error) => {
                            warn!(%error, "dropping unparseable frame");
                            let _ = writer_tx.send(serde_json::to_value(
                                McpResponse::failure(Value::Null, McpError::new(McpError::PARSE_ERROR, error.to_string())),
                            ).unwrap_or(Value::Null));
                            continue;
                        }
                    };

                    if request.method == "shutdown" {
                        shutting_down = true;
                        if let Some(id) = request.id.clone() {
                            let _ = writer_tx.send(serde_json::to_value(McpResponse::success(id, serde_json::json!({"draining": true}))).unwrap());
                        }
                        continue;
                    }

                    if request.method == "$/cancelNotification" {
                        self.handle_cancel(request.params);
                        continue;
                    }

                    if request.is_notification() {
                        debug!(method = %request.method, "ignoring unsupported notification");
                        continue;
                    }

                    let resources = Arc::clone(&self.resources);
                    let cancellations = Arc::clone(&self.cancellations);
                    let root = self.root_cancellation.clone();
                    let tx = writer_tx.clone();
                    workers.spawn(async move {
                        let id = request.id.clone().unwrap_or(Value::Null);
                        let response = handle_request(request, &resources, &cancellations, &root).await;
                        let _ = tx.send(serde_json::to_value(response).unwrap_or_else(|_| {
                            serde_json::to_value(McpResponse::failure(id, McpError::new(McpError::INTERNAL_ERROR, "response serialization failed"))).unwrap()
                        }));
                    });
                }
                Some(result) = workers.join_next() => {
                    if let Err(error) = result {
                        error!(%error, "worker task panicked");
                    }
                    if shutting_down && workers.is_empty() {
                        break;
                    }
                }
                else => break,
            }
        }

        if shutting_down {
            info!(timeout_secs = self.drain_timeout.as_secs(), "draining in-flight requests");
            let drained = tokio::time::timeout(self.drain_timeout, async {
                while let Some(result) = workers.join_next().await {
                    if let Err(error) = result {
                        error!(%error, "worker task panicked during drain");
                    }
                }
            })
            .await;
            if drained.is_err() {
                warn!("drain timeout elapsed with requests still in flight; cancelling remainder");
                self.root_cancellation.cancel();
                workers.shutdown().await;
            }
        }

        drop(writer_tx);
        let _ = writer_task.await;
        info!(total_connections = self.resources.pool.total_created().await, "dispatcher exiting");
        Ok(())
    }

    fn handle_cancel(&self, params: Option<Value>) {
        let Some(params) = params.and_then(|p| serde_json::from_value::<CancelNotificationParams>(p).ok()) else {
            warn!("malformed $/cancelNotification, ignoring");
            return;
        };
        let key = id_key(&params.id);
        if let Some(token) = self.cancellations.lock().get(&key) {
            token.cancel();
        }
    }
}

async fn handle_request(
    request: McpRequest,
    resources: &Arc<ServerResources>,
    cancellations: &CancellationRegistry,
    root: &CancellationToken,
) -> McpResponse {
    let id = request.id.clone().unwrap_or(Value::Null);
    match request.method.as_str() {
        "initialize" => {
            let response = InitializeResponse::new(PROTOCOL_VERSION.to_owned(), SERVER_NAME.to_owned(), env!("CARGO_PKG_VERSION").to_owned());
            McpResponse::success(id, serde_json::to_value(response).unwrap_or(Value::Null))
        }
        "tools/list" => {
            let filter = match resources.config.exposure {
                ExposureMode::Public => ExposureFilter::Public,
                ExposureMode::All => ExposureFilter::All,
            };
            let tools = resources.registry.list(filter);
            McpResponse::success(id, serde_json::json!({"tools": tools}))
        }
        "tools/call" => handle_tools_call(id, request.params, resources, cancellations, root).await,
        "ping" => McpResponse::success(id, serde_json::json!({})),
        other => McpResponse::failure(id, McpError::method_not_found(other)),
    }
}

async fn handle_tools_call(
    id: Value,
    params: Option<Value>,
    resources: &Arc<ServerResources>,
    cancellations: &CancellationRegistry,
    root: &CancellationToken,
) -> McpResponse {
    let Some(call) = params.and_then(|p| serde_json::from_value::<ToolCall>(p).ok()) else {
        return McpResponse::failure(id, McpError::invalid_params("tools/call requires {name, arguments}"));
    };

    let tool = match resources.registry.lookup(&call.name) {
        Ok(tool) => Arc::clone(tool),
        Err(error) => return wrap_tool_error(id, &call.name, error.into()),
    };

    let exposure_allowed = match resources.config.exposure {
        ExposureMode::All => true,
        ExposureMode::Public => tool.exposure() == crate::tools::traits::ToolExposure::Public,
    };
    if !exposure_allowed {
        crate::security::audit::AuditEvent {
            tool_name: &call.name,
            outcome: crate::security::audit::AuditOutcome::BlockedExposure,
            detail: "tool is restricted under the current exposure mode",
            request_id: None,
        }
        .record();
        let error = AppError::security(format!("tool '{}' is not exposed under the current exposure mode", call.name))
            .with_code("E_TOOL_NOT_EXPOSED");
        return wrap_tool_error(id, &call.name, error);
    }

    let unknown_field_policy = if resources.config.security.strict_unknown_fields {
        UnknownFieldPolicy::Strict
    } else {
        UnknownFieldPolicy::Lenient
    };

    let validated = match validator::validate(&call.name, &tool.input_schema(), call.arguments, unknown_field_policy) {
        Ok(validated) => validated,
        Err(error) => return wrap_tool_error(id, &call.name, error.into()),
    };
    for warning in &validated.warnings {
        warn!(tool = %call.name, %warning, "argument validation warning");
    }

    let key = id_key(&id);
    let context = ToolExecutionContext::new(Arc::clone(resources), DEFAULT_CALL_TIMEOUT, root).with_request_id(id.clone());
    cancellations.lock().insert(key.clone(), context.cancellation.clone());

    let oracle_version = context.capabilities().await.version.clone();
    let formatter = ResponseFormatter::start(call.name.clone(), oracle_version);
    let started = Instant::now();

    let outcome = tool.execute(validated.value, &context).await;
    cancellations.lock().remove(&key);

    let envelope = match outcome {
        Ok(result) => formatter.success(result),
        Err(error) => {
            error!(tool = %call.name, elapsed_ms = started.elapsed().as_millis() as u64, error = %error.internal_details(), "tool call failed");
            formatter.failure(&error)
        }
    };
    let is_error = envelope.status == "error";
    let text = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_owned());
    McpResponse::success(
        id,
        serde_json::json!({
            "content": [{"type": "text", "text": text}],
            "isError": is_error,
        }),
    )
}

fn wrap_tool_error(id: Value, tool_name: &str, error: AppError) -> McpResponse {
    let formatter = ResponseFormatter::start(tool_name.to_owned(), "unknown".to_owned());
    let envelope = formatter.failure(&error);
    let text = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_owned());
    McpResponse::success(id, serde_json::json!({"content": [{"type": "text", "text": text}], "isError": true}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::resources::test_support::test_resources;

    #[tokio::test]
    async fn initialize_reports_the_negotiated_protocol_version() {
        let resources = test_resources();
        let cancellations: CancellationRegistry = Arc::new(Mutex::new(HashMap::new()));
        let root = CancellationToken::new();
        let request = McpRequest { jsonrpc: "2.0".to_owned(), id: Some(Value::from(1)), method: "initialize".to_owned(), params: None };
        let response = handle_request(request, &resources, &cancellations, &root).await;
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn unknown_method_yields_method_not_found() {
        let resources = test_resources();
        let cancellations: CancellationRegistry = Arc::new(Mutex::new(HashMap::new()));
        let root = CancellationToken::new();
        let request = McpRequest { jsonrpc: "2.0".to_owned(), id: Some(Value::from(1)), method: "bogus/method".to_owned(), params: None };
        let response = handle_request(request, &resources, &cancellations, &root).await;
        assert_eq!(response.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_call_for_unknown_tool_reports_iserror_true() {
        let resources = test_resources();
        let cancellations: CancellationRegistry = Arc::new(Mutex::new(HashMap::new()));
        let root = CancellationToken::new();
        let response = handle_tools_call(Value::from(1), Some(serde_json::json!({"name": "nope", "arguments": {}})), &resources, &cancellations, &root).await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn tools_list_honors_public_exposure_filter() {
        let resources = test_resources();
        let cancellations: CancellationRegistry = Arc::new(Mutex::new(HashMap::new()));
        let root = CancellationToken::new();
        let request = McpRequest { jsonrpc: "2.0".to_owned(), id: Some(Value::from(1)), method: "tools/list".to_owned(), params: None };
        let response = handle_request(request, &resources, &cancellations, &root).await;
        assert!(response.result.is_some());
    }
}
