// ABOUTME: Bounded connection pool with acquire timeout, idle/max-lifetime eviction, and leak detection (§4.4).
// ABOUTME: Every borrow is a scoped guard — the underlying handle always returns to idle or is destroyed on drop.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool (§4.4).
//!
//! The `oracle_driver` crate is synchronous (ODPI-C bound); every call that
//! touches a live connection — including opening one — runs inside
//! `tokio::task::spawn_blocking` so the pool and its callers stay on the
//! async executor. The pool itself only ever manipulates metadata
//! (`ConnectionEntry`, counts, the FIFO queue) on the async side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::config::environment::{OracleConnectionConfig, PoolConfig};
use crate::errors::{AppError, AppResult};

/// Lifecycle state of a pooled connection (§3 Connection Entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Sitting in the free list, available to be borrowed.
    Idle,
    /// Lent to exactly one caller.
    InUse,
    /// Failed validation or a driver call; never returned to the free list.
    Broken,
    /// On its way out after `Broken` or `max_lifetime` eviction.
    Closing,
}

/// Opaque identifier correlating a leak-detection warning with the borrower
/// that triggered it.
pub type BorrowerToken = Uuid;

struct PooledHandle {
    connection: oracle_driver::Connection,
    created_at: Instant,
    last_used_at: Instant,
    state: ConnectionState,
}

/// A connection borrowed from the pool. Returns the handle to the idle set
/// (or destroys it, if broken) when dropped — scoped acquisition guarantees
/// release on every exit path, including early `?` returns and panics
/// unwinding through the guard.
pub struct PooledConnection {
    handle: Option<PooledHandle>,
    pool: Arc<PoolInner>,
    borrower_token: BorrowerToken,
    acquired_at: Instant,
}

impl PooledConnection {
    /// Run a blocking closure against the underlying driver connection on a
    /// blocking-pool thread, handing the handle over for the duration of the
    /// call and taking it back afterward.
    ///
    /// # Errors
    ///
    /// Returns `AppError::internal` if the blocking task panicked, or
    /// whatever `AppError` the closure itself returns.
    pub async fn with_connection<F, T>(&mut self, f: F) -> AppResult<T>
    where
        F: FnOnce(&oracle_driver::Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| AppError::internal("pooled connection already released"))?;
        let (result, handle) = tokio::task::spawn_blocking(move || {
            let result = f(&handle.connection);
            (result, handle)
        })
        .await
        .map_err(|join_error| AppError::internal(format!("blocking task panicked: {join_error}")))?;
        self.handle = Some(handle);
        result
    }

    /// Mark this connection broken so it is destroyed rather than recycled
    /// on drop, e.g. after a driver call returned a connectivity error.
    pub fn mark_broken(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.state = ConnectionState::Broken;
        }
    }

    /// Ask the driver to interrupt whatever call is currently in flight on
    /// this connection (e.g. on a statement timeout). Best-effort: a
    /// connection interrupted this way is no longer trustworthy, so the
    /// caller should follow up with [`Self::mark_broken`] regardless of
    /// whether the break itself succeeds.
    pub fn cancel_in_flight(&self) {
        if let Some(handle) = self.handle.as_ref() {
            if let Err(error) = handle.connection.break_execution() {
                tracing::warn!(error = %error, "failed to break in-flight Oracle call after timeout");
            }
        }
    }

    /// Token identifying this borrow, surfaced in leak-detection warnings.
    #[must_use]
    pub const fn borrower_token(&self) -> BorrowerToken {
        self.borrower_token
    }

    /// When this connection was handed out, for diagnostics.
    #[must_use]
    pub const fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.last_used_at = Instant::now();
            self.pool.release(handle, self.borrower_token);
        }
    }
}

struct InFlightBorrow {
    token: BorrowerToken,
    acquired_at: Instant,
}

struct PoolInner {
    oracle_config: OracleConnectionConfig,
    pool_config: PoolConfig,
    idle: Mutex<VecDeque<PooledHandle>>,
    in_flight: Mutex<Vec<InFlightBorrow>>,
    total_created: AtomicU64,
    acquire_waiters: Notify,
}

impl PoolInner {
    fn release(self: &Arc<Self>, handle: PooledHandle, token: BorrowerToken) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            pool.in_flight.lock().await.retain(|b| b.token != token);
            let exceeded_lifetime = handle.created_at.elapsed() >= pool.pool_config.max_lifetime();
            if handle.state == ConnectionState::Broken || exceeded_lifetime {
                pool.total_created.fetch_sub(1, Ordering::SeqCst);
                drop(handle);
            } else {
                pool.idle.lock().await.push_back(handle);
            }
            pool.acquire_waiters.notify_one();
        });
    }
}

/// Bounded pool of Oracle connections (§4.4).
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Build an empty pool; connections are created lazily on first
    /// acquisition, up to `pool_config.max_size`.
    #[must_use]
    pub fn new(oracle_config: OracleConnectionConfig, pool_config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                oracle_config,
                pool_config,
                idle: Mutex::new(VecDeque::new()),
                in_flight: Mutex::new(Vec::new()),
                total_created: AtomicU64::new(0),
                acquire_waiters: Notify::new(),
            }),
        }
    }

    /// Acquire a connection, waiting on a FIFO queue up to
    /// `acquire_timeout` if the pool is at capacity (§4.4 acquisition
    /// protocol).
    ///
    /// # Errors
    ///
    /// Returns `AppError::timeout` (`E_POOL_TIMEOUT`) if no connection
    /// becomes available within the configured timeout, or
    /// `AppError::driver` if establishing a new connection fails.
    pub async fn acquire(&self) -> AppResult<PooledConnection> {
        let deadline = Instant::now() + self.inner.pool_config.acquire_timeout();
        loop {
            if let Some(handle) = self.try_take_idle().await {
                return Ok(self.wrap_borrow(handle));
            }
            if self.try_reserve_slot() {
                return match self.create_connection().await {
                    Ok(handle) => Ok(self.wrap_borrow(handle)),
                    Err(error) => {
                        self.inner.total_created.fetch_sub(1, Ordering::SeqCst);
                        Err(error)
                    }
                };
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AppError::timeout("timed out waiting for a free pool connection")
                    .with_code("E_POOL_TIMEOUT")
                    .with_hint("increase pool max_size or acquire_timeout_ms, or reduce concurrent tool calls"));
            }
            let _ignored = tokio::time::timeout(remaining, self.inner.acquire_waiters.notified()).await;
        }
    }

    /// Atomically reserve a creation slot so concurrent acquirers can never
    /// push `total_created` past `max_size` (§4.4 invariant).
    fn try_reserve_slot(&self) -> bool {
        self.inner
            .total_created
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < u64::from(self.inner.pool_config.max_size)).then_some(current + 1)
            })
            .is_ok()
    }

    async fn try_take_idle(&self) -> Option<PooledHandle> {
        let mut idle = self.inner.idle.lock().await;
        while let Some(mut handle) = idle.pop_front() {
            if self.is_still_valid(&handle) {
                handle.state = ConnectionState::InUse;
                return Some(handle);
            }
            self.inner.total_created.fetch_sub(1, Ordering::SeqCst);
        }
        None
    }

    fn is_still_valid(&self, handle: &PooledHandle) -> bool {
        handle.created_at.elapsed() < self.inner.pool_config.max_lifetime()
            && handle.last_used_at.elapsed() < self.inner.pool_config.idle_timeout()
    }

    async fn create_connection(&self) -> AppResult<PooledHandle> {
        let config = self.inner.oracle_config.clone();
        let connection = tokio::task::spawn_blocking(move || {
            oracle_driver::Connection::connect(&config.user, config.password.expose(), &config.url)
        })
        .await
        .map_err(|join_error| AppError::internal(format!("connection task panicked: {join_error}")))?
        .map_err(|driver_error| {
            AppError::driver("ORA-12541", format!("failed to establish Oracle connection: {driver_error}"))
        })?;
        let now = Instant::now();
        Ok(PooledHandle {
            connection,
            created_at: now,
            last_used_at: now,
            state: ConnectionState::InUse,
        })
    }

    fn wrap_borrow(&self, handle: PooledHandle) -> PooledConnection {
        let token = Uuid::new_v4();
        let pool = Arc::clone(&self.inner);
        let acquired_at = Instant::now();
        let leak_threshold = pool.pool_config.leak_threshold();
        tokio::spawn({
            let pool = Arc::clone(&pool);
            async move {
                pool.in_flight.lock().await.push(InFlightBorrow { token, acquired_at });
                tokio::time::sleep(leak_threshold).await;
                let still_borrowed = pool.in_flight.lock().await.iter().any(|b| b.token == token);
                if still_borrowed {
                    tracing::warn!(
                        borrower_token = %token,
                        held_for_ms = acquired_at.elapsed().as_millis() as u64,
                        "pool connection held past leak_detection_threshold; not forcibly reclaiming"
                    );
                }
            }
        });
        PooledConnection {
            handle: Some(handle),
            pool,
            borrower_token: token,
            acquired_at,
        }
    }

    /// Number of connections currently created (idle + in-use), for
    /// diagnostics and `tools/list`-adjacent health reporting.
    pub async fn total_created(&self) -> u64 {
        self.inner.total_created.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment::SecretString;

    fn test_pool_config() -> PoolConfig {
        PoolConfig {
            max_size: 2,
            min_idle: 0,
            acquire_timeout_ms: 50,
            max_lifetime_ms: 1_800_000,
            idle_timeout_ms: 600_000,
            leak_threshold_ms: 60_000,
        }
    }

    fn test_oracle_config() -> OracleConnectionConfig {
        OracleConnectionConfig {
            url: "localhost:1521/XEPDB1".to_owned(),
            user: "app".to_owned(),
            password: SecretString::from("unused-in-unit-tests".to_owned()),
            edition: crate::config::Edition::Express,
        }
    }

    #[test]
    fn pool_starts_with_zero_created_connections() {
        let pool = ConnectionPool::new(test_oracle_config(), test_pool_config());
        assert_eq!(pool.inner.total_created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn slot_reservation_never_exceeds_max_size() {
        let pool = ConnectionPool::new(test_oracle_config(), test_pool_config());
        assert!(pool.try_reserve_slot());
        assert!(pool.try_reserve_slot());
        assert!(!pool.try_reserve_slot());
        assert_eq!(pool.inner.total_created.load(Ordering::SeqCst), 2);
    }
}
