//! Transcript routes.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use scribehub_auth::Session;
use scribehub_store::CursorPage;
use scribehub_transcripts::{TranscriptFilter, TranscriptStatus};

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response, json_error, page_response};

use super::{object_payload, parse_record_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transcripts", get(list).post(create))
        .route(
            "/transcripts/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/transcripts/:id/status", patch(set_status))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    source_kind: Option<String>,
    search: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
    /// Cursor value (`created_at` of the last row seen). Presence of either
    /// cursor field selects cursor pagination.
    cursor: Option<String>,
    limit: Option<u64>,
}

async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.transcripts.create(session.tenant_id, payload).await {
        Ok(transcript) => data_response(StatusCode::CREATED, &transcript),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Response {
    let cursor_mode = query.cursor.is_some() || query.limit.is_some();
    let filter = TranscriptFilter {
        status: query.status,
        source_kind: query.source_kind,
        search: query.search,
        cursor: cursor_mode.then(|| {
            let mut cursor = CursorPage::new(query.limit.unwrap_or(25));
            if let Some(value) = &query.cursor {
                cursor = cursor.after(json!(value));
            }
            cursor
        }),
        page: query.page,
        page_size: query.page_size,
    };

    let (page, page_size) = if cursor_mode {
        (None, None)
    } else {
        (
            Some(filter.page.unwrap_or(1)),
            Some(filter.page_size.unwrap_or(25)),
        )
    };

    match state.transcripts.list(session.tenant_id, filter).await {
        Ok((transcripts, meta)) => page_response(&transcripts, meta, page, page_size),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_one(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.transcripts.get(session.tenant_id, id).await {
        Ok(transcript) => data_response(StatusCode::OK, &transcript),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.transcripts.update(session.tenant_id, id, payload).await {
        Ok(transcript) => data_response(StatusCode::OK, &transcript),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.transcripts.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

fn parse_status(raw: &str) -> Result<TranscriptStatus, Response> {
    match raw {
        "uploaded" => Ok(TranscriptStatus::Uploaded),
        "processing" => Ok(TranscriptStatus::Processing),
        "transcribed" => Ok(TranscriptStatus::Transcribed),
        "failed" => Ok(TranscriptStatus::Failed),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "status must be one of: uploaded, processing, transcribed, failed",
        )),
    }
}

async fn set_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let status = match payload.get("status").and_then(|v| v.as_str()) {
        Some(raw) => match parse_status(raw) {
            Ok(status) => status,
            Err(response) => return response,
        },
        None => {
            return json_error(StatusCode::BAD_REQUEST, "validation", "status is required");
        }
    };

    match state
        .transcripts
        .mark_status(session.tenant_id, id, status)
        .await
    {
        Ok(transcript) => data_response(StatusCode::OK, &transcript),
        Err(err) => domain_error_to_response(&err),
    }
}
