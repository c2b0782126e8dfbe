// ABOUTME: Dialect feature detection — probes an Oracle connection once per TTL window and caches the result.
// ABOUTME: The cache is never mutated in place; a refresh builds a new CapabilitySet and atomically swaps the pointer.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability & dialect detection (§4.2).
//!
//! A [`CapabilityTag`] vocabulary is closed: unknown tags always evaluate to
//! `false` rather than erroring, so a tool that references a tag the
//! detector doesn't know about degrades instead of panicking. The detector
//! itself borrows a pool connection to run a fixed probe set and never holds
//! a lock across that probe — readers always see either the previous
//! snapshot or the new one, never a half-built one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::Edition;

/// Closed vocabulary of optional Oracle features a tool may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTag {
    /// Multitenant pluggable-database support (CDB/PDB).
    Pdb,
    /// Automatic Workload Repository views available.
    Awr,
    /// Partitioning option licensed and enabled.
    Partitioning,
    /// Native `VECTOR` datatype and vector search operators (23ai+).
    Vector,
    /// Native JSON datatype / `IS JSON` dialect (12c+).
    Json,
    /// Transparent Data Encryption option.
    Tde,
    /// Oracle Data Vault option.
    Vault,
    /// Parallel query/DML enabled.
    Parallel,
}

impl CapabilityTag {
    /// Parse a capability tag from its wire/config name, if it names a known
    /// tag. Unknown names are not an error at this layer — callers that
    /// need a hard failure on an unknown *requirement* check that
    /// separately against the registry's known-tag set.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdb" => Some(Self::Pdb),
            "awr" => Some(Self::Awr),
            "partitioning" => Some(Self::Partitioning),
            "vector" => Some(Self::Vector),
            "json" => Some(Self::Json),
            "tde" => Some(Self::Tde),
            "vault" => Some(Self::Vault),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }
}

/// Snapshot of what a live connection cohort supports, refreshed on TTL
/// expiry or connection replacement. Cheap to clone: every field is `Copy`
/// or a small owned string.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitySet {
    /// Oracle version string as reported by `v$version` (e.g. "19.3.0.0.0").
    pub version: String,
    /// Detected edition.
    pub edition: Edition,
    /// Whether the instance is a container database.
    pub is_cdb: bool,
    /// Individually toggled optional features.
    pub pdb: bool,
    /// See [`CapabilityTag::Awr`].
    pub awr: bool,
    /// See [`CapabilityTag::Partitioning`].
    pub partitioning: bool,
    /// See [`CapabilityTag::Vector`].
    pub vector: bool,
    /// See [`CapabilityTag::Json`].
    pub json: bool,
    /// See [`CapabilityTag::Tde`].
    pub tde: bool,
    /// See [`CapabilityTag::Vault`].
    pub vault: bool,
    /// See [`CapabilityTag::Parallel`].
    pub parallel: bool,
    /// When this snapshot was produced.
    #[serde(skip)]
    pub detected_at: Instant,
    /// Set when the probe failed and every optional flag above was forced
    /// false as a conservative fallback.
    pub degraded: bool,
}

impl CapabilitySet {
    /// A conservative all-flags-false snapshot used before the first probe
    /// completes and whenever a probe fails.
    fn degraded(version: impl Into<String>, edition: Edition) -> Self {
        Self {
            version: version.into(),
            edition,
            is_cdb: false,
            pdb: false,
            awr: false,
            partitioning: false,
            vector: false,
            json: false,
            tde: false,
            vault: false,
            parallel: false,
            detected_at: Instant::now(),
            degraded: true,
        }
    }

    /// `true` if `tag` is enabled in this snapshot. Unknown tags never occur
    /// here since [`CapabilityTag`] is a closed enum, but the boolean-field
    /// mapping below is the single place a new tag must be wired in.
    #[must_use]
    pub const fn supports(&self, tag: CapabilityTag) -> bool {
        match tag {
            CapabilityTag::Pdb => self.pdb,
            CapabilityTag::Awr => self.awr,
            CapabilityTag::Partitioning => self.partitioning,
            CapabilityTag::Vector => self.vector,
            CapabilityTag::Json => self.json,
            CapabilityTag::Tde => self.tde,
            CapabilityTag::Vault => self.vault,
            CapabilityTag::Parallel => self.parallel,
        }
    }
}

/// Raw results of the fixed probe set (§4.2 step 1), decoupled from how the
/// probe connection was obtained so the detector's refresh logic is
/// testable without a real Oracle session.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// `v$version`/`product_component_version` banner text.
    pub version: String,
    /// Detected edition.
    pub edition: Edition,
    /// `v$database.cdb = 'YES'`.
    pub is_cdb: bool,
    /// `v$option` rows keyed by the feature's capability tag.
    pub options: Vec<CapabilityTag>,
}

/// Anything that can run the fixed probe set against a live connection.
/// Implemented by [`crate::oracle::pool::ConnectionPool`] in production and
/// by a fixture in tests, so the detector's caching/TTL logic never needs a
/// real database to exercise.
#[async_trait::async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Run the fixed probe set and return the raw findings, or an error if
    /// no connection could be borrowed or the probe query failed.
    async fn probe(&self) -> Result<ProbeResult, crate::errors::AppError>;
}

/// Caches a [`CapabilitySet`] behind a read-write lock with a TTL, refreshing
/// by atomic pointer swap rather than in-place mutation (§4.2 invariants).
pub struct CapabilityDetector<R: ProbeRunner> {
    runner: R,
    ttl: Duration,
    /// Minimum spacing between probe attempts after a failure, independent
    /// of `ttl`, so a down database doesn't get re-probed on every call.
    failure_backoff: Duration,
    snapshot: RwLock<Arc<CapabilitySet>>,
    last_probe_attempt: RwLock<Option<Instant>>,
}

impl<R: ProbeRunner> CapabilityDetector<R> {
    /// Build a detector that has not yet probed; the first `supports`/`info`
    /// call triggers an initial probe.
    pub fn new(runner: R, ttl: Duration) -> Self {
        Self {
            runner,
            ttl,
            failure_backoff: Duration::from_secs(30),
            snapshot: RwLock::new(Arc::new(CapabilitySet::degraded("unknown", Edition::default()))),
            last_probe_attempt: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshing first if the TTL has expired and the
    /// failure backoff window has passed. Never blocks beyond a quick lock
    /// acquisition plus, at most, one probe.
    pub async fn info(&self) -> Arc<CapabilitySet> {
        self.refresh_if_stale().await;
        self.snapshot.read().clone()
    }

    /// `true` if `tag` is enabled in the current (possibly stale-by-one-TTL)
    /// snapshot. Does not itself trigger a refresh; call [`Self::info`]
    /// first on a cold path, or accept eventual consistency on a hot one.
    #[must_use]
    pub fn supports_cached(&self, tag: CapabilityTag) -> bool {
        self.snapshot.read().supports(tag)
    }

    async fn refresh_if_stale(&self) {
        let is_stale = {
            let snapshot = self.snapshot.read();
            snapshot.degraded || snapshot.detected_at.elapsed() >= self.ttl
        };
        if !is_stale {
            return;
        }
        {
            let mut last = self.last_probe_attempt.write();
            if let Some(at) = *last {
                if at.elapsed() < self.failure_backoff {
                    return;
                }
            }
            *last = Some(Instant::now());
        }
        let new_snapshot = match self.runner.probe().await {
            Ok(probe) => Arc::new(CapabilitySet {
                version: probe.version,
                edition: probe.edition,
                is_cdb: probe.is_cdb,
                pdb: probe.options.contains(&CapabilityTag::Pdb),
                awr: probe.options.contains(&CapabilityTag::Awr),
                partitioning: probe.options.contains(&CapabilityTag::Partitioning),
                vector: probe.options.contains(&CapabilityTag::Vector),
                json: probe.options.contains(&CapabilityTag::Json),
                tde: probe.options.contains(&CapabilityTag::Tde),
                vault: probe.options.contains(&CapabilityTag::Vault),
                parallel: probe.options.contains(&CapabilityTag::Parallel),
                detected_at: Instant::now(),
                degraded: false,
            }),
            Err(error) => {
                tracing::warn!(error = %error, "capability probe failed; caching degraded capability set");
                let edition = self.snapshot.read().edition;
                Arc::new(CapabilitySet::degraded("unknown", edition))
            }
        };
        *self.snapshot.write() = new_snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRunner {
        calls: AtomicUsize,
        result: Result<ProbeResult, crate::errors::AppError>,
    }

    #[async_trait::async_trait]
    impl ProbeRunner for FixedRunner {
        async fn probe(&self) -> Result<ProbeResult, crate::errors::AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn first_access_triggers_probe_and_caches_result() {
        let runner = FixedRunner {
            calls: AtomicUsize::new(0),
            result: Ok(ProbeResult {
                version: "19.3.0.0.0".to_owned(),
                edition: Edition::Enterprise,
                is_cdb: true,
                options: vec![CapabilityTag::Pdb, CapabilityTag::Json],
            }),
        };
        let detector = CapabilityDetector::new(runner, Duration::from_secs(3600));
        let info = detector.info().await;
        assert!(info.pdb);
        assert!(info.json);
        assert!(!info.vector);
        assert_eq!(detector.runner.calls.load(Ordering::SeqCst), 1);

        // second call within TTL should not re-probe
        let _ = detector.info().await;
        assert_eq!(detector.runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_probe_yields_degraded_snapshot() {
        let runner = FixedRunner {
            calls: AtomicUsize::new(0),
            result: Err(crate::errors::AppError::internal("probe connection refused")),
        };
        let detector = CapabilityDetector::new(runner, Duration::from_secs(3600));
        let info = detector.info().await;
        assert!(info.degraded);
        assert!(!info.supports(CapabilityTag::Pdb));
    }

    #[test]
    fn unknown_tag_name_parses_to_none() {
        assert_eq!(CapabilityTag::from_str_opt("not_a_real_tag"), None);
        assert_eq!(CapabilityTag::from_str_opt("PDB"), Some(CapabilityTag::Pdb));
    }
}
