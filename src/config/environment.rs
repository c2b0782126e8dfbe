// ABOUTME: Environment-variable driven configuration for the Oracle MCP server.
// ABOUTME: ServerConfig::from_env() is the single place environment variables are read.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration management.
//!
//! The server has no config-file format: every setting is read from the
//! process environment once, validated, and frozen into an immutable
//! `Arc<ServerConfig>` for the lifetime of the process (see
//! [`crate::mcp::resources::ServerResources`]). This keeps the server
//! stateless across restarts — the only durable state lives in Oracle.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::{AppError, AppResult};

/// Oracle edition, as reported by `v$instance` or inferred from `ORACLE_EDITION`.
///
/// Distinct from [`crate::oracle::capability::CapabilityTag`] — this is the
/// configured expectation, the capability detector confirms it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    /// Express Edition: no PDBs, no AWR, limited parallelism.
    Express,
    /// Standard Edition / Standard Edition 2.
    #[default]
    Standard,
    /// Enterprise Edition: full capability surface (PDB, AWR, partitioning).
    Enterprise,
}

impl Edition {
    fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "xe" | "express" => Self::Express,
            "ee" | "enterprise" => Self::Enterprise,
            _ => Self::Standard,
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Express => "express",
            Self::Standard => "standard",
            Self::Enterprise => "enterprise",
        };
        write!(f, "{s}")
    }
}

/// Which tools are advertised in `tools/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    /// Only tools tagged `public` are listed and callable.
    #[default]
    Public,
    /// Every registered tool, including `restricted` ones, is listed.
    All,
}

impl ExposureMode {
    fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "all" => Self::All,
            _ => Self::Public,
        }
    }
}

/// Password wrapper that zeroizes on drop and never implements `Display`/`Debug`
/// with its contents — only `redacted()` is printable.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretString(String);

impl SecretString {
    /// Expose the underlying secret. Callers must not log the result.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A value safe to print in logs or `summary()`.
    #[must_use]
    pub fn redacted(&self) -> &'static str {
        "***"
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({})", self.redacted())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Oracle connection parameters (§6 `oracle.*`).
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConnectionConfig {
    /// JDBC-style connect string: `host:port/service_name` or `host:port:sid`.
    pub url: String,
    /// Database user the pool authenticates as.
    pub user: String,
    /// Database password. Never logged; redacted in `summary()`.
    pub password: SecretString,
    /// Expected edition; the capability detector confirms this at startup.
    pub edition: Edition,
}

impl fmt::Debug for OracleConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConnectionConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.redacted())
            .field("edition", &self.edition)
            .finish()
    }
}

/// Bounded connection pool configuration (§4.4/§6 `pool.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Hard ceiling on live connections.
    pub max_size: u32,
    /// Connections kept warm even when idle.
    pub min_idle: u32,
    /// How long an acquire request waits before `AppError::timeout`.
    pub acquire_timeout_ms: u64,
    /// Connections older than this are recycled on next release.
    pub max_lifetime_ms: u64,
    /// Idle connections older than this are evicted by the sweep task.
    pub idle_timeout_ms: u64,
    /// A borrower holding a connection longer than this is logged as a leak.
    pub leak_threshold_ms: u64,
}

impl PoolConfig {
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    #[must_use]
    pub const fn max_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_lifetime_ms)
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    #[must_use]
    pub const fn leak_threshold(&self) -> Duration {
        Duration::from_millis(self.leak_threshold_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 1,
            acquire_timeout_ms: 5_000,
            max_lifetime_ms: 1_800_000,
            idle_timeout_ms: 600_000,
            leak_threshold_ms: 60_000,
        }
    }
}

/// Query execution defaults (§4.5/§6 `query.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Rows fetched per round-trip unless a tool overrides it.
    pub default_fetch_size: u32,
    /// Hard cap on rows returned by any single `query`/`stream` call.
    pub max_rows: u64,
    /// Default statement timeout.
    pub timeout_ms: u64,
}

impl QueryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_fetch_size: 100,
            max_rows: 10_000,
            timeout_ms: 30_000,
        }
    }
}

/// Capability-detection cache configuration (§4.2/§6 `features.detect.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureDetectionConfig {
    /// How long a detected capability set is trusted before re-probing.
    pub ttl_ms: u64,
}

impl FeatureDetectionConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for FeatureDetectionConfig {
    fn default() -> Self {
        Self { ttl_ms: 300_000 }
    }
}

/// Security policy knobs (§4.3/§6 `security.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Reject any statement that targets `SYS`/`SYSTEM`/`SYSAUX`/`DBSNMP` or
    /// `V$`/`DBA_`/`GV$` views, even when explicitly requested.
    pub block_system_users: bool,
    /// Unknown fields in tool arguments are rejected rather than ignored.
    pub strict_unknown_fields: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            block_system_users: true,
            strict_unknown_fields: true,
        }
    }
}

/// Top-level, validated, immutable server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Oracle connection parameters.
    pub oracle: OracleConnectionConfig,
    /// Which tools `tools/list` advertises.
    pub exposure: ExposureMode,
    /// Connection pool bounds.
    pub pool: PoolConfig,
    /// Query execution defaults.
    pub query: QueryConfig,
    /// Capability-cache TTL.
    pub features: FeatureDetectionConfig,
    /// Security policy.
    pub security: SecurityConfig,
    /// `tracing` env-filter directive, e.g. `info` or `oracle_mcp_server=debug`.
    pub log_level: String,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_owned())
}

fn env_u32(key: &str, default: u32) -> AppResult<u32> {
    env_var(key).map_or(Ok(default), |v| {
        v.parse().map_err(|_| {
            AppError::internal(format!("{key} must be a non-negative integer, got '{v}'"))
        })
    })
}

fn env_u64(key: &str, default: u64) -> AppResult<u64> {
    env_var(key).map_or(Ok(default), |v| {
        v.parse().map_err(|_| {
            AppError::internal(format!("{key} must be a non-negative integer, got '{v}'"))
        })
    })
}

fn env_bool(key: &str, default: bool) -> bool {
    env_var(key).map_or(default, |v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a numeric
    /// variable fails to parse, or [`Self::validate`] rejects the result.
    pub fn from_env() -> AppResult<Self> {
        let oracle = OracleConnectionConfig {
            url: env_var("ORACLE_URL").ok_or_else(|| {
                AppError::internal("ORACLE_URL is required (host:port/service_name)")
            })?,
            user: env_var("ORACLE_USER")
                .ok_or_else(|| AppError::internal("ORACLE_USER is required"))?,
            password: env_var("ORACLE_PASSWORD")
                .ok_or_else(|| AppError::internal("ORACLE_PASSWORD is required"))?
                .into(),
            edition: Edition::from_str_or_default(&env_or("ORACLE_EDITION", "standard")),
        };

        let exposure = ExposureMode::from_str_or_default(&env_or("TOOLS_EXPOSURE", "public"));

        let pool = PoolConfig {
            max_size: env_u32("POOL_MAX_SIZE", PoolConfig::default().max_size)?,
            min_idle: env_u32("POOL_MIN_IDLE", PoolConfig::default().min_idle)?,
            acquire_timeout_ms: env_u64(
                "POOL_ACQUIRE_TIMEOUT_MS",
                PoolConfig::default().acquire_timeout_ms,
            )?,
            max_lifetime_ms: env_u64(
                "POOL_MAX_LIFETIME_MS",
                PoolConfig::default().max_lifetime_ms,
            )?,
            idle_timeout_ms: env_u64(
                "POOL_IDLE_TIMEOUT_MS",
                PoolConfig::default().idle_timeout_ms,
            )?,
            leak_threshold_ms: env_u64(
                "POOL_LEAK_THRESHOLD_MS",
                PoolConfig::default().leak_threshold_ms,
            )?,
        };

        let query = QueryConfig {
            default_fetch_size: env_u32(
                "QUERY_DEFAULT_FETCH_SIZE",
                QueryConfig::default().default_fetch_size,
            )?,
            max_rows: env_u64("QUERY_MAX_ROWS", QueryConfig::default().max_rows)?,
            timeout_ms: env_u64("QUERY_TIMEOUT_MS", QueryConfig::default().timeout_ms)?,
        };

        let features = FeatureDetectionConfig {
            ttl_ms: env_u64(
                "FEATURES_DETECT_TTL_MS",
                FeatureDetectionConfig::default().ttl_ms,
            )?,
        };

        let security = SecurityConfig {
            block_system_users: env_bool("SECURITY_BLOCK_SYSTEM_USERS", true),
            strict_unknown_fields: env_bool("SECURITY_STRICT_UNKNOWN_FIELDS", true),
        };

        let log_level = env_or("RUST_LOG", "info");

        let config = Self {
            oracle,
            exposure,
            pool,
            query,
            features,
            security,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject internally contradictory configuration before the server binds
    /// its first connection.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first contradiction found.
    pub fn validate(&self) -> AppResult<()> {
        if self.pool.max_size == 0 {
            return Err(AppError::internal("POOL_MAX_SIZE must be at least 1"));
        }
        if self.pool.min_idle > self.pool.max_size {
            return Err(AppError::internal(
                "POOL_MIN_IDLE cannot exceed POOL_MAX_SIZE",
            ));
        }
        if self.query.default_fetch_size == 0 {
            return Err(AppError::internal(
                "QUERY_DEFAULT_FETCH_SIZE must be at least 1",
            ));
        }
        if self.query.max_rows == 0 {
            return Err(AppError::internal("QUERY_MAX_ROWS must be at least 1"));
        }
        if !self.security.block_system_users {
            tracing::warn!(
                "SECURITY_BLOCK_SYSTEM_USERS=false: system-object denylist is disabled"
            );
        }
        Ok(())
    }

    /// Redacted, loggable summary — never includes the password.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "oracle={{user={}, edition={}, exposure={:?}}} pool={{max_size={}, min_idle={}}} \
             query={{fetch_size={}, max_rows={}}} security={{block_system_users={}}}",
            self.oracle.user,
            self.oracle.edition,
            self.exposure,
            self.pool.max_size,
            self.pool.min_idle,
            self.query.default_fetch_size,
            self.query.max_rows,
            self.security.block_system_users,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_validate_rejects_min_idle_above_max() {
        let mut config_pool = PoolConfig::default();
        config_pool.min_idle = config_pool.max_size + 1;
        let config = ServerConfig {
            oracle: OracleConnectionConfig {
                url: "localhost:1521/freepdb1".into(),
                user: "app".into(),
                password: "secret".to_owned().into(),
                edition: Edition::Standard,
            },
            exposure: ExposureMode::Public,
            pool: config_pool,
            query: QueryConfig::default(),
            features: FeatureDetectionConfig::default(),
            security: SecurityConfig::default(),
            log_level: "info".into(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn summary_never_contains_password() {
        let config = ServerConfig {
            oracle: OracleConnectionConfig {
                url: "localhost:1521/freepdb1".into(),
                user: "app".into(),
                password: "super-secret".to_owned().into(),
                edition: Edition::Enterprise,
            },
            exposure: ExposureMode::All,
            pool: PoolConfig::default(),
            query: QueryConfig::default(),
            features: FeatureDetectionConfig::default(),
            security: SecurityConfig::default(),
            log_level: "info".into(),
        };
        assert!(!config.summary().contains("super-secret"));
    }

    #[test]
    fn edition_parses_common_aliases() {
        assert_eq!(Edition::from_str_or_default("XE"), Edition::Express);
        assert_eq!(Edition::from_str_or_default("ee"), Edition::Enterprise);
        assert_eq!(Edition::from_str_or_default("anything-else"), Edition::Standard);
    }
}
