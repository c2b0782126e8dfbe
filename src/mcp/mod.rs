// ABOUTME: Model Context Protocol (MCP) implementation: stdio transport, wire types, and shared server resources.
// ABOUTME: Single-tenant stdio server — no HTTP/SSE transport, no OAuth, no multi-tenant routing.

/// JSON-RPC 2.0 wire types (§6).
pub mod protocol;
/// Tool/initialize schema types advertised to the client.
pub mod schema;
/// Shared, process-wide server resources (pool, engine, capability detector, registry, config).
pub mod resources;
/// Stdio read/dispatch/write loop (§4.7).
pub mod dispatcher;
