// ABOUTME: Centralized resource container for dependency injection across the dispatcher and tool catalog.
// ABOUTME: Built once at startup via ServerResourcesBuilder, then shared read-only (Arc) for the process lifetime.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server resources (§4.7 process lifecycle, §4.1-4.5 component wiring).
//!
//! Mirrors the teacher's builder-pattern resource container, scaled down to
//! what a single-connection-cohort Oracle MCP server actually shares across
//! tool invocations: the pool, the execution engine built on top of it, the
//! capability detector, the frozen tool registry, and the validated config.

use std::sync::Arc;

use crate::config::environment::ServerConfig;
use crate::oracle::capability::CapabilityDetector;
use crate::oracle::engine::ExecutionEngine;
use crate::oracle::pool::ConnectionPool;
use crate::oracle::probe::PoolProbeRunner;
use crate::tools::registry::ToolRegistry;

/// Shared, immutable-after-startup resource bundle.
pub struct ServerResources {
    /// Bounded Oracle connection pool.
    pub pool: Arc<ConnectionPool>,
    /// Statement execution engine built on top of `pool`.
    pub engine: Arc<ExecutionEngine>,
    /// TTL-cached capability/dialect detector.
    pub capability_detector: Arc<CapabilityDetector<PoolProbeRunner>>,
    /// Frozen tool registry.
    pub registry: Arc<ToolRegistry>,
    /// Validated server configuration.
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Start building a `ServerResources` from a validated config.
    #[must_use]
    pub fn builder(config: Arc<ServerConfig>) -> ServerResourcesBuilder {
        ServerResourcesBuilder::new(config)
    }
}

/// Builder for [`ServerResources`], mirroring the teacher's
/// `ServerResourcesBuilder` shape: `with_*` setters returning `Self`, a
/// fallible `build()`.
pub struct ServerResourcesBuilder {
    config: Arc<ServerConfig>,
    registry: Option<ToolRegistry>,
}

impl ServerResourcesBuilder {
    /// A builder seeded with the server's validated configuration.
    #[must_use]
    pub const fn new(config: Arc<ServerConfig>) -> Self {
        Self { config, registry: None }
    }

    /// Provide a pre-populated tool registry (e.g. for tests that only
    /// register a subset of tools). If omitted, [`Self::build`] registers
    /// and freezes the full built-in catalog.
    #[must_use]
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Assemble the pool, engine, capability detector, and registry into a
    /// `ServerResources`.
    ///
    /// # Errors
    ///
    /// Propagates the first registry registration failure, if a registry
    /// was not supplied via [`Self::with_registry`] and the built-in catalog
    /// fails to register (a programming error, not a runtime condition).
    pub fn build(self) -> crate::errors::AppResult<ServerResources> {
        let pool = Arc::new(ConnectionPool::new(self.config.oracle.clone(), self.config.pool));
        let engine = Arc::new(ExecutionEngine::new(Arc::clone(&pool)));
        let probe_runner = PoolProbeRunner::new(Arc::clone(&pool));
        let capability_detector = Arc::new(CapabilityDetector::new(probe_runner, self.config.features.ttl()));

        let mut registry = match self.registry {
            Some(registry) => registry,
            None => {
                let mut registry = ToolRegistry::new();
                crate::tools::registry::register_builtin_tools(&mut registry)?;
                registry
            }
        };
        if !registry.is_frozen() {
            registry.freeze();
        }

        Ok(ServerResources {
            pool,
            engine,
            capability_detector,
            registry: Arc::new(registry),
            config: self.config,
        })
    }

    /// [`Self::build`], wrapped in an `Arc`.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub fn build_arc(self) -> crate::errors::AppResult<Arc<ServerResources>> {
        Ok(Arc::new(self.build()?))
    }
}

/// Test-only helpers for constructing `ServerResources` without a live
/// Oracle instance. The pool/engine/detector are real objects — they simply
/// never get a chance to dial out unless a test explicitly calls
/// `pool.acquire()`.
#[cfg(test)]
pub mod test_support {
    use super::{Arc, ServerResources, ServerResourcesBuilder};
    use crate::config::environment::{Edition, OracleConnectionConfig, SecretString, ServerConfig};

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            oracle: OracleConnectionConfig {
                url: "localhost:1521/XEPDB1".to_owned(),
                user: "app".to_owned(),
                password: SecretString::from("unused-in-unit-tests".to_owned()),
                edition: Edition::Express,
            },
            exposure: crate::config::environment::ExposureMode::Public,
            pool: crate::config::environment::PoolConfig::default(),
            query: crate::config::environment::QueryConfig::default(),
            features: crate::config::environment::FeatureDetectionConfig::default(),
            security: crate::config::environment::SecurityConfig::default(),
            log_level: "info".to_owned(),
        })
    }

    /// An `Arc<ServerResources>` with an empty, frozen registry and a pool
    /// that has never dialed out. Safe to build in any test.
    pub fn test_resources() -> Arc<ServerResources> {
        let mut registry = crate::tools::registry::ToolRegistry::new();
        registry.freeze();
        ServerResourcesBuilder::new(test_config())
            .with_registry(registry)
            .build_arc()
            .expect("test resources must build")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_resources;

    #[test]
    fn builder_produces_a_frozen_registry() {
        let resources = test_resources();
        assert!(resources.registry.is_frozen());
    }
}
