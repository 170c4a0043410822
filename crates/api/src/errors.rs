//! Domain error → HTTP translation and the response envelope.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use scribehub_core::{DomainError, ErrorCode};
use scribehub_store::PageMeta;

/// Map the closed taxonomy onto status codes. Unauthorized (401) is produced
/// only by the auth middleware; everything unlisted is a 500.
pub fn domain_error_to_response(err: &DomainError) -> axum::response::Response {
    let status = match err.code() {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Permission => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Duplicate
        | ErrorCode::ForeignKey
        | ErrorCode::Transaction
        | ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(code = %err.code(), error = %err, "request failed");
    }

    (
        status,
        axum::Json(json!({
            "error": err.message(),
            "code": err.code(),
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "code": code,
        })),
    )
        .into_response()
}

/// Success envelope: `{"data": ...}`.
pub fn data_response<T: Serialize>(status: StatusCode, value: &T) -> axum::response::Response {
    (status, axum::Json(json!({ "data": value }))).into_response()
}

/// Listing envelope with pagination metadata.
pub fn page_response<T: Serialize>(
    value: &T,
    meta: PageMeta,
    page: Option<u64>,
    page_size: Option<u64>,
) -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(json!({
            "data": value,
            "meta": {
                "total": meta.total,
                "page": page,
                "page_size": page_size,
                "has_more": meta.has_more,
            },
        })),
    )
        .into_response()
}
