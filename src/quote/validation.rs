//! Payload validation for inbound quote data.
//!
//! Validation is a pure function from an untyped JSON value to either a
//! [`QuoteRecord`] or a tagged [`ValidationError`]. Nothing here logs or
//! touches the network, so the rules are testable in isolation.

use serde_json::Value;
use thiserror::Error;

use super::models::{QuoteRecord, MANDATORY_FIELDS, REQUIRED_FIELDS};

/// Reasons an inbound payload can be rejected before rendering.
///
/// Validation errors are terminal for a message: redelivering the same payload
/// will fail identically, so callers should not treat them as transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid JSON in message body: {0}")]
    MalformedPayload(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' must be a string, got {1}")]
    WrongType(&'static str, String),
    #[error("required field '{0}' must not be empty")]
    EmptyRequiredField(&'static str),
    #[error("mandatory fields cannot be empty: {}", .0.join(", "))]
    MandatoryFieldsBlank(Vec<String>),
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate an untyped JSON value as a quote record.
///
/// Checks run in order and short-circuit at the first failure: object shape,
/// then presence and type of all 27 required fields, then the mandatory-field
/// blank check (collecting every blank name instead of stopping at the
/// first), then per-field non-blankness of the remaining required fields.
/// Optional fields default to `""` via serde.
pub fn validate_quote(raw: &Value) -> Result<QuoteRecord, ValidationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ValidationError::MalformedPayload("payload is not a JSON object".into()))?;

    for field in REQUIRED_FIELDS {
        match object.get(field) {
            None => return Err(ValidationError::MissingField(field)),
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(ValidationError::WrongType(
                    field,
                    json_type_name(other).into(),
                ))
            }
        }
    }

    // Blank mandatory fields are reported collectively so a caller sees every
    // offending field at once rather than one per redelivery.
    let blank_mandatory: Vec<String> = MANDATORY_FIELDS
        .iter()
        .filter(|field| {
            object
                .get(**field)
                .and_then(Value::as_str)
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|field| field.to_string())
        .collect();

    if !blank_mandatory.is_empty() {
        return Err(ValidationError::MandatoryFieldsBlank(blank_mandatory));
    }

    // Blankness is still enforced on all 27 fields; at this point only the
    // non-mandatory ones can trip it.
    for field in REQUIRED_FIELDS {
        if let Some(Value::String(value)) = object.get(field) {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyRequiredField(field));
            }
        }
    }

    serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}

/// Parse a raw message body as JSON and validate it as a quote record.
pub fn parse_quote_payload(body: &str) -> Result<QuoteRecord, ValidationError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;
    validate_quote(&value)
}
