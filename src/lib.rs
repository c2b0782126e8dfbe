// ABOUTME: Library entry point for the Oracle Database MCP server.
// ABOUTME: Wires configuration, the Oracle driver layer, the tool catalog, and the stdio MCP transport together.
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Oracle MCP Server
//!
//! A Model Context Protocol server exposing a curated set of Oracle
//! Database operations — schema and user management, analytical queries,
//! vector search, and AWR diagnostics — to MCP clients over stdio.
//!
//! ## Architecture
//!
//! - [`config`] — environment-driven server configuration.
//! - [`oracle`] — capability detection, the SQL builder/dialect layer, the
//!   bounded connection pool, and the execution engine.
//! - [`tools`] — the tool trait, startup registry, argument validator,
//!   response formatter, and the built-in tool catalog.
//! - [`mcp`] — JSON-RPC wire types, shared server resources, and the stdio
//!   dispatcher.
//! - [`security`] — the system-object denylist and audit log shared across
//!   the layers above.
//! - [`logging`] — stderr-only structured logging (stdout is reserved for
//!   JSON-RPC frames).
//!
//! ## Example
//!
//! ```rust,no_run
//! use oracle_mcp_server::config::ServerConfig;
//! use oracle_mcp_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let _ = oracle_mcp_server::logging::init(&config.log_level);
//!     Ok(())
//! }
//! ```

/// Environment-driven server configuration.
pub mod config;
/// Closed error taxonomy and the crate-wide `AppResult` alias.
pub mod errors;
/// Stderr-only structured logging (stdout carries JSON-RPC frames exclusively).
pub mod logging;
/// Model Context Protocol implementation: wire types, shared resources, stdio dispatcher.
pub mod mcp;
/// Oracle capability detection, SQL builder, connection pool, and execution engine.
pub mod oracle;
/// System-object denylist and security audit log.
pub mod security;
/// Tool trait, registry, validator, formatter, and the built-in tool catalog.
pub mod tools;
