//! Route modules, one per resource, plus shared extraction helpers.

pub mod accounts;
pub mod billing;
pub mod outputs;
pub mod playlists;
pub mod providers;
pub mod teams;
pub mod transcript_types;
pub mod transcripts;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use scribehub_core::{RecordId, UserId};
use scribehub_store::Row;

use crate::errors::{domain_error_to_response, json_error};

/// Request bodies must be JSON objects; anything else is a 400 before the
/// operation modules ever see it.
pub(crate) fn object_payload(value: Value) -> Result<Row, Response> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "request body must be a JSON object",
        )),
    }
}

pub(crate) fn parse_record_id(raw: &str) -> Result<RecordId, Response> {
    raw.parse::<RecordId>()
        .map_err(|err| domain_error_to_response(&err))
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, Response> {
    raw.parse::<UserId>()
        .map_err(|err| domain_error_to_response(&err))
}

pub(crate) fn required_str<'a>(payload: &'a Row, field: &str) -> Result<&'a str, Response> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                format!("{field} is required"),
            )
        })
}
