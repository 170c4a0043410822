//! Transcript type catalog routes.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use scribehub_auth::Session;

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response};

use super::{object_payload, parse_record_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transcript-types", get(list).post(create))
        .route("/transcript-types/:id", get(get_one).delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
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
    match state
        .transcript_types
        .create(session.tenant_id, payload)
        .await
    {
        Ok(kind) => data_response(StatusCode::CREATED, &kind),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state
        .transcript_types
        .list(session.tenant_id, query.category.as_deref())
        .await
    {
        Ok(kinds) => data_response(StatusCode::OK, &kinds),
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
    match state.transcript_types.get(session.tenant_id, id).await {
        Ok(kind) => data_response(StatusCode::OK, &kind),
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
    match state.transcript_types.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}
