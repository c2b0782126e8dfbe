// ABOUTME: Tool-registry and argument-validation errors, converted to AppError at the module boundary.
// ABOUTME: Every variant carries a stable E_* code so dispatcher responses are machine-matchable.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-registry and validation error types (§4.1 Registry, §4.6 Validator).
//!
//! `ToolError` never crosses the tool-call boundary directly — it converts
//! into [`AppError`] via `From`, the way `crate::oracle::*` components do.

use std::error::Error;
use std::fmt;

use crate::errors::AppError;

/// Errors raised by the tool registry or the argument validator, before a
/// tool's own `execute` body ever runs.
#[derive(Debug, Clone)]
pub enum ToolError {
    /// `tools/call` named a tool the registry has no entry for.
    UnknownTool {
        /// The requested, unrecognized name.
        tool_name: String,
    },
    /// Registration was attempted for a name already present.
    DuplicateTool {
        /// The name that collided.
        tool_name: String,
    },
    /// A tool's declared `input_schema` is not a valid JSON Schema object.
    InvalidSchema {
        /// The tool whose schema failed to validate.
        tool_name: String,
        /// Why the schema was rejected.
        reason: String,
    },
    /// Registration was attempted after the registry was frozen at startup.
    RegistryFrozen {
        /// The name that could not be registered.
        tool_name: String,
    },
    /// A required argument was absent.
    MissingParameter {
        /// The tool being validated.
        tool_name: String,
        /// The missing property name.
        parameter: String,
    },
    /// An argument was present but failed a type, range, or pattern check.
    InvalidParameter {
        /// The tool being validated.
        tool_name: String,
        /// The offending property name.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// An argument object had a property not declared in the schema, under
    /// strict unknown-field policy.
    UnknownField {
        /// The tool being validated.
        tool_name: String,
        /// The undeclared property name.
        field: String,
    },
    /// The requested tool exists but the live instance lacks a capability it
    /// requires.
    CapabilityUnavailable {
        /// The tool being checked.
        tool_name: String,
        /// The missing capability, as a display string.
        required: String,
    },
}

impl ToolError {
    /// Name of the tool this error concerns.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool { tool_name }
            | Self::DuplicateTool { tool_name }
            | Self::InvalidSchema { tool_name, .. }
            | Self::RegistryFrozen { tool_name }
            | Self::MissingParameter { tool_name, .. }
            | Self::InvalidParameter { tool_name, .. }
            | Self::UnknownField { tool_name, .. }
            | Self::CapabilityUnavailable { tool_name, .. } => tool_name,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { tool_name } => write!(f, "unknown tool '{tool_name}'"),
            Self::DuplicateTool { tool_name } => write!(f, "tool '{tool_name}' is already registered"),
            Self::InvalidSchema { tool_name, reason } => {
                write!(f, "tool '{tool_name}' has an invalid input schema: {reason}")
            }
            Self::RegistryFrozen { tool_name } => {
                write!(f, "cannot register '{tool_name}': registry is frozen after startup")
            }
            Self::MissingParameter { tool_name, parameter } => {
                write!(f, "tool '{tool_name}' is missing required parameter '{parameter}'")
            }
            Self::InvalidParameter {
                tool_name,
                parameter,
                reason,
            } => write!(f, "tool '{tool_name}' parameter '{parameter}' is invalid: {reason}"),
            Self::UnknownField { tool_name, field } => {
                write!(f, "tool '{tool_name}' rejects unknown field '{field}'")
            }
            Self::CapabilityUnavailable { tool_name, required } => {
                write!(f, "tool '{tool_name}' requires {required}, which this instance does not support")
            }
        }
    }
}

impl Error for ToolError {}

impl From<ToolError> for AppError {
    fn from(error: ToolError) -> Self {
        match &error {
            ToolError::UnknownTool { .. } => AppError::validation(error.to_string()).with_code("E_UNKNOWN_TOOL"),
            ToolError::DuplicateTool { .. } => AppError::internal(error.to_string()).with_code("E_DUPLICATE_TOOL"),
            ToolError::InvalidSchema { .. } => AppError::internal(error.to_string()).with_code("E_INVALID_SCHEMA"),
            ToolError::RegistryFrozen { .. } => AppError::internal(error.to_string()).with_code("E_REGISTRY_FROZEN"),
            ToolError::MissingParameter { .. } => {
                AppError::validation(error.to_string()).with_code("E_MISSING_PARAMETER")
            }
            ToolError::InvalidParameter { .. } => {
                AppError::validation(error.to_string()).with_code("E_INVALID_PARAMETER")
            }
            ToolError::UnknownField { .. } => AppError::validation(error.to_string()).with_code("E_UNKNOWN_FIELD"),
            ToolError::CapabilityUnavailable { .. } => {
                AppError::capability(error.to_string()).with_code("E_UNSUPPORTED_FEATURE")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_maps_to_validation_with_stable_code() {
        let error = ToolError::UnknownTool {
            tool_name: "nonexistent_tool".to_owned(),
        };
        let app_error: AppError = error.into();
        assert_eq!(app_error.code, "E_UNKNOWN_TOOL");
        assert_eq!(app_error.kind, crate::errors::ErrorKind::Validation);
    }

    #[test]
    fn capability_unavailable_maps_to_capability_kind() {
        let error = ToolError::CapabilityUnavailable {
            tool_name: "create_pdb".to_owned(),
            required: "pdb".to_owned(),
        };
        let app_error: AppError = error.into();
        assert_eq!(app_error.kind, crate::errors::ErrorKind::Capability);
        assert_eq!(app_error.code, "E_UNSUPPORTED_FEATURE");
    }

    #[test]
    fn tool_name_accessor_covers_every_variant() {
        let error = ToolError::MissingParameter {
            tool_name: "run_query".to_owned(),
            parameter: "sql".to_owned(),
        };
        assert_eq!(error.tool_name(), "run_query");
    }
}
