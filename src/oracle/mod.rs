// ABOUTME: Oracle Capability & Dialect Layer plus Connection & Execution Substrate (spec components C1-C4).
// ABOUTME: Every other module that touches Oracle goes through one of these submodules, never the driver directly.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Oracle integration layer.
//!
//! Four pieces, each independently testable without a live database:
//! - [`capability`] — feature detection and TTL-cached capability snapshots.
//! - [`identifier`] — the only place a raw identifier touches SQL text.
//! - [`builder`] — typed statement construction from structured tool input.
//! - [`pool`] — bounded connection pool with leak detection.
//! - [`engine`] — statement execution: query/stream/execute/plsql modes.
//! - [`probe`] — the concrete [`capability::ProbeRunner`] backed by the pool.

pub mod builder;
pub mod capability;
pub mod engine;
pub mod identifier;
pub mod pool;
pub mod probe;
