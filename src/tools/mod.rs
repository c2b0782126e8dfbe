// ABOUTME: Tool subsystem — trait, registry, execution context, validation, and response shaping.
// ABOUTME: The catalog itself lives in implementations/, assembled by registry::register_builtin_tools.
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
//! Tool execution subsystem (§4.1, §4.6, §4.8, §4.10).
//!
//! [`traits`] defines the capability vocabulary and the [`traits::McpTool`]
//! trait every catalog handler implements; [`registry`] owns the frozen
//! startup catalog; [`context`] is what a handler sees of the live server;
//! [`validator`] and [`formatter`] sit on either side of a call.

/// Tool capability flags, exposure, category, and the `McpTool` trait.
pub mod traits;
/// Startup-only tool registration and lookup.
pub mod registry;
/// What a handler sees of the live server during a call.
pub mod context;
/// Handler output before it reaches the Response Formatter.
pub mod result;
/// Tool-facing error type, distinct from the closed `AppError` taxonomy.
pub mod errors;
/// Argument coercion and constraint checking against a tool's JSON Schema.
pub mod validator;
/// Uniform response envelope construction.
pub mod formatter;
/// The built-in tool catalog.
pub mod implementations;
