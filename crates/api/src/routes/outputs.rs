//! Output type and output file routes.

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
use scribehub_outputs::OutputFileStatus;

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response, json_error};

use super::{object_payload, parse_record_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/output-types", get(list_types).post(create_type))
        .route("/output-types/:id", get(get_type).delete(remove_type))
        .route("/output-files", get(list_files).post(create_file))
        .route("/output-files/:id", get(get_file).delete(remove_file))
        .route("/output-files/:id/status", patch(set_file_status))
}

#[derive(Debug, Deserialize)]
struct TypeQuery {
    format: Option<String>,
}

async fn create_type(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.output_types.create(session.tenant_id, payload).await {
        Ok(output_type) => data_response(StatusCode::CREATED, &output_type),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list_types(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TypeQuery>,
) -> Response {
    match state
        .output_types
        .list(session.tenant_id, query.format.as_deref())
        .await
    {
        Ok(types) => data_response(StatusCode::OK, &types),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_type(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.output_types.get(session.tenant_id, id).await {
        Ok(output_type) => data_response(StatusCode::OK, &output_type),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn remove_type(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.output_types.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    transcript_id: String,
}

async fn create_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.output_files.create(session.tenant_id, payload).await {
        Ok(file) => data_response(StatusCode::CREATED, &file),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list_files(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<FileQuery>,
) -> Response {
    let transcript_id = match parse_record_id(&query.transcript_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state
        .output_files
        .list_for_transcript(session.tenant_id, transcript_id)
        .await
    {
        Ok(files) => data_response(StatusCode::OK, &files),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.output_files.get(session.tenant_id, id).await {
        Ok(file) => data_response(StatusCode::OK, &file),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn remove_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.output_files.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

fn parse_file_status(raw: &str) -> Result<OutputFileStatus, Response> {
    match raw {
        "pending" => Ok(OutputFileStatus::Pending),
        "generating" => Ok(OutputFileStatus::Generating),
        "ready" => Ok(OutputFileStatus::Ready),
        "failed" => Ok(OutputFileStatus::Failed),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "status must be one of: pending, generating, ready, failed",
        )),
    }
}

async fn set_file_status(
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
        Some(raw) => match parse_file_status(raw) {
            Ok(status) => status,
            Err(response) => return response,
        },
        None => {
            return json_error(StatusCode::BAD_REQUEST, "validation", "status is required");
        }
    };

    match state
        .output_files
        .mark_status(session.tenant_id, id, status)
        .await
    {
        Ok(file) => data_response(StatusCode::OK, &file),
        Err(err) => domain_error_to_response(&err),
    }
}
