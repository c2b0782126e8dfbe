// ABOUTME: Configuration management entry point — re-exports the environment-driven ServerConfig.
// ABOUTME: Single source of truth for every environment variable the server reads.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management.
//!
//! All configuration is environment-variable driven (see [`environment`]);
//! there is no config file format, matching the server's stateless-across-
//! restarts design — every piece of durable state lives in Oracle itself.

/// Environment-variable driven server configuration.
pub mod environment;

pub use environment::{
    Edition, ExposureMode, FeatureDetectionConfig, OracleConnectionConfig, PoolConfig,
    QueryConfig, SecurityConfig, ServerConfig,
};
