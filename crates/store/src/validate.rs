//! Declarative input validation.
//!
//! Pure functions over JSON payloads. Each takes the candidate data, a rule,
//! and a resource name for messages, and either returns normally or fails
//! with a VALIDATION-coded error. Required-field and type checks collect
//! every violation before failing; the per-field checks fail on the first
//! violation at their call site.

use chrono::{DateTime, Utc};
use serde_json::Value;

use scribehub_core::{DomainError, DomainResult};

use crate::backend::Row;

/// Expected primitive shape of a JSON field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Inclusive bounds rule shared by range/length checks.
#[derive(Debug, Copy, Clone, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Bounds<T> {
    pub fn at_least(min: T) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: T) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// A field is missing if absent, `null`, or an empty string. Every missing
/// field is named in one error.
pub fn validate_required(data: &Row, fields: &[&str], resource: &str) -> DomainResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|field| {
            match data.get(**field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            }
        })
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(
            resource,
            format!("missing required fields: {}", missing.join(", ")),
        ))
    }
}

/// Check the primitive type of every field present (and non-null) in the
/// payload. Every mismatch is named in one error.
pub fn validate_types(data: &Row, rules: &[(&str, ValueKind)], resource: &str) -> DomainResult<()> {
    let mismatched: Vec<String> = rules
        .iter()
        .filter_map(|(field, expected)| match data.get(*field) {
            None | Some(Value::Null) => None,
            Some(value) if expected.matches(value) => None,
            Some(value) => Some(format!(
                "{field} (expected {}, got {})",
                expected.as_str(),
                kind_of(value)
            )),
        })
        .collect();

    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(
            resource,
            format!("invalid type for fields: {}", mismatched.join(", ")),
        ))
    }
}

/// Exact membership in an allowed set; the error names every allowed value.
pub fn validate_enum(
    value: &str,
    allowed: &[&str],
    field: &str,
    resource: &str,
) -> DomainResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(DomainError::validation(
            resource,
            format!(
                "invalid {field} '{value}': expected one of {}",
                allowed.join(", ")
            ),
        ))
    }
}

/// Inclusive numeric bounds.
pub fn validate_range(
    value: f64,
    bounds: Bounds<f64>,
    field: &str,
    resource: &str,
) -> DomainResult<()> {
    if let Some(min) = bounds.min {
        if value < min {
            return Err(DomainError::validation(
                resource,
                format!("{field} must be at least {min}"),
            ));
        }
    }
    if let Some(max) = bounds.max {
        if value > max {
            return Err(DomainError::validation(
                resource,
                format!("{field} must be at most {max}"),
            ));
        }
    }
    Ok(())
}

/// Inclusive bounds on a string's character count or an array's element
/// count.
pub fn validate_length(
    value: &Value,
    bounds: Bounds<usize>,
    field: &str,
    resource: &str,
) -> DomainResult<()> {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        other => {
            return Err(DomainError::validation(
                resource,
                format!("{field} has no length (got {})", kind_of(other)),
            ));
        }
    };

    if let Some(min) = bounds.min {
        if len < min {
            return Err(DomainError::validation(
                resource,
                format!("{field} must have length at least {min}"),
            ));
        }
    }
    if let Some(max) = bounds.max {
        if len > max {
            return Err(DomainError::validation(
                resource,
                format!("{field} must have length at most {max}"),
            ));
        }
    }
    Ok(())
}

/// Inclusive bounds on a parsed RFC 3339 timestamp.
pub fn validate_date_range(
    value: &str,
    bounds: Bounds<DateTime<Utc>>,
    field: &str,
    resource: &str,
) -> DomainResult<()> {
    let parsed: DateTime<Utc> = value.parse().map_err(|e| {
        DomainError::validation(resource, format!("{field} is not a valid timestamp: {e}"))
    })?;

    if let Some(min) = bounds.min {
        if parsed < min {
            return Err(DomainError::validation(
                resource,
                format!("{field} must not be before {min}"),
            ));
        }
    }
    if let Some(max) = bounds.max {
        if parsed > max {
            return Err(DomainError::validation(
                resource,
                format!("{field} must not be after {max}"),
            ));
        }
    }
    Ok(())
}

/// Inclusive bounds on element count.
pub fn validate_array_length(
    array: &[Value],
    bounds: Bounds<usize>,
    field: &str,
    resource: &str,
) -> DomainResult<()> {
    if let Some(min) = bounds.min {
        if array.len() < min {
            return Err(DomainError::validation(
                resource,
                format!("{field} must contain at least {min} items"),
            ));
        }
    }
    if let Some(max) = bounds.max {
        if array.len() > max {
            return Err(DomainError::validation(
                resource,
                format!("{field} must contain at most {max} items"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribehub_core::ErrorCode;
    use serde_json::json;

    fn payload(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn required_collects_every_missing_field() {
        let data = payload(json!({"category": "Meetings", "type": ""}));
        let err =
            validate_required(&data, &["category", "type", "sub_type"], "TranscriptType")
                .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.message(),
            "TranscriptType: missing required fields: type, sub_type"
        );
    }

    #[test]
    fn required_treats_null_and_empty_string_as_missing() {
        let data = payload(json!({"a": null, "b": "", "c": 0, "d": false}));
        let err = validate_required(&data, &["a", "b", "c", "d"], "Thing").unwrap_err();
        assert_eq!(err.message(), "Thing: missing required fields: a, b");
    }

    #[test]
    fn types_collects_every_mismatch_and_skips_absent_fields() {
        let data = payload(json!({"title": 42, "duration_seconds": "long", "language": null}));
        let err = validate_types(
            &data,
            &[
                ("title", ValueKind::String),
                ("duration_seconds", ValueKind::Number),
                ("language", ValueKind::String),
                ("tags", ValueKind::Array),
            ],
            "Transcript",
        )
        .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.message(),
            "Transcript: invalid type for fields: title (expected string, got number), \
             duration_seconds (expected number, got string)"
        );
    }

    #[test]
    fn enum_accepts_every_allowed_value_and_names_them_on_failure() {
        for value in ["audio", "video", "text"] {
            validate_enum(value, &["audio", "video", "text"], "type", "Transcript").unwrap();
        }

        let err =
            validate_enum("pdf", &["audio", "video", "text"], "type", "Transcript").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.message(),
            "Transcript: invalid type 'pdf': expected one of audio, video, text"
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        validate_range(0.0, Bounds::at_least(0.0), "duration_seconds", "Transcript").unwrap();
        validate_range(10.0, Bounds::between(0.0, 10.0), "duration_seconds", "Transcript")
            .unwrap();
        assert!(
            validate_range(-1.0, Bounds::at_least(0.0), "duration_seconds", "Transcript").is_err()
        );
        assert!(
            validate_range(10.1, Bounds::at_most(10.0), "duration_seconds", "Transcript").is_err()
        );
    }

    #[test]
    fn length_covers_strings_and_arrays() {
        validate_length(&json!("en"), Bounds::between(2, 16), "language", "Preference").unwrap();
        validate_length(&json!(["a", "b"]), Bounds::at_most(2), "tags", "Transcript").unwrap();
        assert!(
            validate_length(&json!("x"), Bounds::at_least(2), "language", "Preference").is_err()
        );
        assert!(validate_length(&json!(7), Bounds::at_least(1), "tags", "Transcript").is_err());
    }

    #[test]
    fn date_range_parses_then_compares() {
        let min = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        validate_date_range("2026-06-01T00:00:00Z", Bounds::at_least(min), "expires_at", "Credit")
            .unwrap();
        assert!(validate_date_range(
            "2025-06-01T00:00:00Z",
            Bounds::at_least(min),
            "expires_at",
            "Credit"
        )
        .is_err());
        assert!(
            validate_date_range("yesterday", Bounds::at_least(min), "expires_at", "Credit")
                .is_err()
        );
    }

    #[test]
    fn array_length_bounds_are_inclusive() {
        let items = vec![json!("a"), json!("b")];
        validate_array_length(&items, Bounds::between(2, 2), "transcript_ids", "Playlist")
            .unwrap();
        assert!(
            validate_array_length(&items, Bounds::at_most(1), "transcript_ids", "Playlist")
                .is_err()
        );
        assert!(
            validate_array_length(&items, Bounds::at_least(3), "transcript_ids", "Playlist")
                .is_err()
        );
    }
}
