// ABOUTME: Argument validator — enforces each tool's parameter contract before the handler runs (§4.6).
// ABOUTME: Coerces numeric strings and loose booleans, honors schema constraints, redacts secrets from errors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument validator (§4.6).
//!
//! Runs between the registry lookup and `McpTool::execute`: every tool gets
//! its arguments pre-validated against its own `input_schema()`, so handler
//! bodies never have to re-check presence or type.

use serde_json::{Map, Value};

use crate::mcp::schema::{JsonSchema, PropertySchema};

use super::errors::ToolError;

/// Unknown-property policy applied when an arguments object carries a field
/// the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Reject the call with `E_UNKNOWN_FIELD`.
    Strict,
    /// Ignore the field, noting it in `warnings`.
    Lenient,
}

/// Outcome of a successful validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArgs {
    /// Arguments coerced to the types their schema declares.
    pub value: Value,
    /// Non-fatal notes (e.g. ignored unknown fields under the lenient policy).
    pub warnings: Vec<String>,
}

/// Property names treated as secrets: redacted from any error-context
/// serialization rather than echoed back to the caller.
const SECRET_PROPERTY_NAMES: &[&str] = &["password", "new_password", "old_password"];

/// Validate `arguments` against `schema` for `tool_name`, applying type
/// coercion and constraint checks.
///
/// # Errors
///
/// Returns `ToolError::MissingParameter`, `ToolError::InvalidParameter`, or
/// `ToolError::UnknownField` (under [`UnknownFieldPolicy::Strict`]) on the
/// first violation encountered, in schema property order.
pub fn validate(
    tool_name: &str,
    schema: &JsonSchema,
    arguments: Option<Value>,
    unknown_field_policy: UnknownFieldPolicy,
) -> Result<ValidatedArgs, ToolError> {
    let input = match arguments {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Map::new(),
        Some(_) => {
            return Err(ToolError::InvalidParameter {
                tool_name: tool_name.to_owned(),
                parameter: "<root>".to_owned(),
                reason: "arguments must be a JSON object".to_owned(),
            })
        }
    };

    let properties = schema.properties.as_ref();
    let required = schema.required.as_deref().unwrap_or(&[]);

    for name in required {
        if !input.contains_key(name) {
            return Err(ToolError::MissingParameter {
                tool_name: tool_name.to_owned(),
                parameter: name.clone(),
            });
        }
    }

    let mut warnings = Vec::new();
    let mut output = Map::new();
    for (key, raw_value) in &input {
        let Some(property) = properties.and_then(|props| props.get(key)) else {
            match unknown_field_policy {
                UnknownFieldPolicy::Strict => {
                    return Err(ToolError::UnknownField {
                        tool_name: tool_name.to_owned(),
                        field: key.clone(),
                    })
                }
                UnknownFieldPolicy::Lenient => {
                    warnings.push(format!("ignored unknown field '{key}'"));
                    continue;
                }
            }
        };
        let coerced = coerce_and_check(tool_name, key, raw_value, property)?;
        output.insert(key.clone(), coerced);
    }

    if let Some(props) = properties {
        for (name, property) in props {
            if !output.contains_key(name) {
                if let Some(default) = &property.default {
                    output.insert(name.clone(), default.clone());
                }
            }
        }
    }

    Ok(ValidatedArgs {
        value: Value::Object(output),
        warnings,
    })
}

fn coerce_and_check(
    tool_name: &str,
    parameter: &str,
    value: &Value,
    property: &PropertySchema,
) -> Result<Value, ToolError> {
    let invalid = |reason: String| ToolError::InvalidParameter {
        tool_name: tool_name.to_owned(),
        parameter: parameter.to_owned(),
        reason,
    };

    let coerced = match property.property_type.as_str() {
        "integer" | "number" => coerce_number(value).ok_or_else(|| invalid(format!("expected a number, got {value}")))?,
        "boolean" => coerce_bool(value).ok_or_else(|| invalid(format!("expected a boolean, got {value}")))?,
        "string" => match value {
            Value::String(_) => value.clone(),
            _ => return Err(invalid(format!("expected a string, got {value}"))),
        },
        "array" => match value {
            Value::Array(items) => {
                if let Some(element_schema) = &property.items {
                    let mut coerced_items = Vec::with_capacity(items.len());
                    for item in items {
                        coerced_items.push(coerce_and_check(tool_name, parameter, item, element_schema)?);
                    }
                    Value::Array(coerced_items)
                } else {
                    value.clone()
                }
            }
            _ => return Err(invalid(format!("expected an array, got {value}"))),
        },
        _ => value.clone(),
    };

    if let Some(allowed) = &property.enum_values {
        let Some(as_str) = coerced.as_str() else {
            return Err(invalid("enum-constrained property must be a string".to_owned()));
        };
        if !allowed.iter().any(|candidate| candidate == as_str) {
            return Err(invalid(format!(
                "'{as_str}' is not one of the allowed values: {}",
                allowed.join(", ")
            )));
        }
    }

    Ok(coerced)
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Redact secret-property values from an arguments object before it is
/// embedded in an error message or log line (§4.6 "Secrets ... redacted").
#[must_use]
pub fn redact_secrets(arguments: &Value) -> Value {
    let Value::Object(map) = arguments else {
        return arguments.clone();
    };
    let redacted = map
        .iter()
        .map(|(key, value)| {
            let is_secret = SECRET_PROPERTY_NAMES.iter().any(|secret| secret.eq_ignore_ascii_case(key));
            let shown = if is_secret { Value::String("***".to_owned()) } else { value.clone() };
            (key.clone(), shown)
        })
        .collect();
    Value::Object(redacted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema_with(properties: &[(&str, PropertySchema)], required: &[&str]) -> JsonSchema {
        JsonSchema {
            schema_type: "object".to_owned(),
            properties: Some(properties.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect::<HashMap<_, _>>()),
            required: Some(required.iter().map(|s| (*s).to_owned()).collect()),
        }
    }

    #[test]
    fn missing_required_property_is_rejected() {
        let schema = schema_with(&[("username", PropertySchema::of_type("string"))], &["username"]);
        let error = validate("create_user", &schema, Some(json!({})), UnknownFieldPolicy::Strict).unwrap_err();
        assert!(matches!(error, ToolError::MissingParameter { .. }));
    }

    #[test]
    fn numeric_string_is_coerced_for_integer_property() {
        let schema = schema_with(&[("limit", PropertySchema::of_type("integer"))], &[]);
        let result = validate("query_records", &schema, Some(json!({"limit": "25"})), UnknownFieldPolicy::Strict).unwrap();
        assert_eq!(result.value["limit"], json!(25.0));
    }

    #[test]
    fn loose_boolean_strings_are_coerced() {
        let schema = schema_with(&[("include_pdbs", PropertySchema::of_type("boolean"))], &[]);
        let result =
            validate("list_databases", &schema, Some(json!({"include_pdbs": "TRUE"})), UnknownFieldPolicy::Strict).unwrap();
        assert_eq!(result.value["include_pdbs"], json!(true));
    }

    #[test]
    fn strict_policy_rejects_unknown_field() {
        let schema = schema_with(&[], &[]);
        let error = validate("ping", &schema, Some(json!({"extra": 1})), UnknownFieldPolicy::Strict).unwrap_err();
        assert!(matches!(error, ToolError::UnknownField { .. }));
    }

    #[test]
    fn lenient_policy_warns_instead_of_rejecting() {
        let schema = schema_with(&[], &[]);
        let result = validate("ping", &schema, Some(json!({"extra": 1})), UnknownFieldPolicy::Lenient).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn enum_violation_is_rejected() {
        let schema = schema_with(
            &[("metric", PropertySchema::of_type("string").with_enum(["cosine", "euclidean"]))],
            &[],
        );
        let error = validate("vector_search", &schema, Some(json!({"metric": "manhattan2"})), UnknownFieldPolicy::Strict)
            .unwrap_err();
        assert!(matches!(error, ToolError::InvalidParameter { .. }));
    }

    #[test]
    fn password_field_is_redacted() {
        let redacted = redact_secrets(&json!({"username": "mcp_test", "password": "s3cret!"}));
        assert_eq!(redacted["password"], json!("***"));
        assert_eq!(redacted["username"], json!("mcp_test"));
    }
}
