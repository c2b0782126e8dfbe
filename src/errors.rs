// ABOUTME: Closed error taxonomy for the Oracle MCP server and its Result alias.
// ABOUTME: Every fallible path in the crate converges on AppError before crossing the tool boundary.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Error Handling
//!
//! `AppError` is the single error type returned at the tool-call boundary. It
//! carries a closed `ErrorKind`, a stable `code` token (or the raw Oracle
//! error code when one is available), a human message, and an optional
//! `hint` suggesting a corrective action. Component-local error enums
//! (`crate::oracle::*`, `crate::tools::errors::ToolError`) convert into this
//! type via `From` at their module boundary rather than leaking their own
//! shape into the response envelope.

use serde::Serialize;
use std::fmt;

/// Closed vocabulary of error categories. Nothing outside this set is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Arguments failed schema or semantic validation before execution began.
    Validation,
    /// The target edition/version lacks the capability the tool requires.
    Capability,
    /// The operation was blocked by a privilege or ownership check.
    Privilege,
    /// The SQL builder refused to construct the statement (denylist, syntax).
    Dialect,
    /// The Oracle driver returned an error while executing a statement.
    Driver,
    /// The operation exceeded its configured deadline.
    Timeout,
    /// The operation was cancelled via `$/cancelNotification`.
    Cancelled,
    /// A security policy (system-user guard, exposure gate) rejected the call.
    Security,
    /// Anything else: pool exhaustion, bugs, unexpected internal state.
    Internal,
}

impl ErrorKind {
    /// Default JSON-RPC-ish numeric code bucket for this kind, used only when
    /// no more specific `code` token applies.
    #[must_use]
    pub const fn default_code(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Capability => "capability_unavailable",
            Self::Privilege => "privilege_denied",
            Self::Dialect => "dialect_rejected",
            Self::Driver => "driver_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Security => "security_blocked",
            Self::Internal => "internal_error",
        }
    }
}

/// Structured application error returned from every tool execution path.
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    /// Closed category for dispatcher-level handling and metrics.
    pub kind: ErrorKind,
    /// Stable machine-readable token, or the raw `ORA-NNNNN` code when the
    /// error originated from the driver.
    pub code: String,
    /// Human-readable message. Never includes bind values or credentials.
    pub message: String,
    /// Optional suggestion for resolving the error (e.g. "retry with a
    /// smaller fetch_size", "request capability X is unavailable on XE").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl AppError {
    /// Build a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.default_code().to_owned(),
            kind,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable code token, replacing the kind's default.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attach a corrective hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Validation failure (bad argument shape, unknown field under strict
    /// policy, constraint violation).
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Requested tool needs a capability the detected edition/version lacks.
    #[must_use]
    pub fn capability(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Capability, message)
    }

    /// Operation blocked by an ownership/privilege check.
    #[must_use]
    pub fn privilege(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Privilege, message)
    }

    /// SQL builder refused to construct the statement.
    #[must_use]
    pub fn dialect(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dialect, message)
    }

    /// Oracle driver returned an error; `ora_code` is the raw `ORA-NNNNN`.
    #[must_use]
    pub fn driver(ora_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Driver, message).with_code(ora_code)
    }

    /// Operation exceeded its deadline.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Operation was cancelled by the client.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Security policy rejected the call (system user, exposure gate).
    #[must_use]
    pub fn security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Security, message)
    }

    /// Internal/unexpected failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Details safe to log internally (never sent verbatim to a client
    /// beyond `message`/`hint`, which are already scrubbed at creation).
    #[must_use]
    pub fn internal_details(&self) -> String {
        format!("[{:?}/{}] {}", self.kind, self.code, self.message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.kind.default_code(), self.message)
    }
}

impl std::error::Error for AppError {}

/// Result alias used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::internal(format!("IO error: {error}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation(format!("JSON error: {error}"))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("operation exceeded its configured deadline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_code_matches_kind() {
        assert_eq!(ErrorKind::Validation.default_code(), "validation_error");
        assert_eq!(ErrorKind::Cancelled.default_code(), "cancelled");
    }

    #[test]
    fn driver_error_carries_ora_code() {
        let err = AppError::driver("ORA-00942", "table or view does not exist");
        assert_eq!(err.kind, ErrorKind::Driver);
        assert_eq!(err.code, "ORA-00942");
    }

    #[test]
    fn hint_is_optional_in_serialization() {
        let err = AppError::validation("bad input");
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("hint").is_none());
    }
}
