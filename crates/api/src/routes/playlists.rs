//! Playlist routes.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use scribehub_auth::Session;
use scribehub_core::RecordId;

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response, json_error};

use super::{object_payload, parse_record_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/playlists", get(list).post(create))
        .route(
            "/playlists/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/playlists/:id/transcripts", post(add_transcripts))
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
    match state.playlists.create(session.tenant_id, payload).await {
        Ok(playlist) => data_response(StatusCode::CREATED, &playlist),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.playlists.list(session.tenant_id).await {
        Ok(playlists) => data_response(StatusCode::OK, &playlists),
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
    match state.playlists.get(session.tenant_id, id).await {
        Ok(playlist) => data_response(StatusCode::OK, &playlist),
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
    match state.playlists.update(session.tenant_id, id, payload).await {
        Ok(playlist) => data_response(StatusCode::OK, &playlist),
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
    match state.playlists.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn add_transcripts(
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

    let Some(raw_ids) = payload.get("transcript_ids").and_then(|v| v.as_array()) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "transcript_ids is required",
        );
    };

    let mut transcript_ids: Vec<RecordId> = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        let Some(raw) = raw.as_str() else {
            return json_error(
                StatusCode::BAD_REQUEST,
                "validation",
                "transcript_ids must contain id strings",
            );
        };
        match parse_record_id(raw) {
            Ok(parsed) => transcript_ids.push(parsed),
            Err(response) => return response,
        }
    }

    match state
        .playlists
        .add_transcripts(session.tenant_id, id, &transcript_ids)
        .await
    {
        Ok(playlist) => data_response(StatusCode::OK, &playlist),
        Err(err) => domain_error_to_response(&err),
    }
}
