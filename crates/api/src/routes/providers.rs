//! AI provider and model routes.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use scribehub_auth::Session;

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response};

use super::{object_payload, parse_record_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/providers", get(list).post(create))
        .route(
            "/providers/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/providers/:id/models", get(list_models))
        .route("/models", post(create_model))
        .route("/models/:id", get(get_model).delete(remove_model))
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
    match state.providers.create(session.tenant_id, payload).await {
        Ok(provider) => data_response(StatusCode::CREATED, &provider),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.providers.list(session.tenant_id).await {
        Ok(providers) => data_response(StatusCode::OK, &providers),
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
    match state.providers.get(session.tenant_id, id).await {
        Ok(provider) => data_response(StatusCode::OK, &provider),
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
    match state.providers.update(session.tenant_id, id, payload).await {
        Ok(provider) => data_response(StatusCode::OK, &provider),
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
    match state.providers.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn create_model(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.models.create(session.tenant_id, payload).await {
        Ok(model) => data_response(StatusCode::CREATED, &model),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list_models(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let provider_id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state
        .models
        .list_for_provider(session.tenant_id, provider_id)
        .await
    {
        Ok(models) => data_response(StatusCode::OK, &models),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_model(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.models.get(session.tenant_id, id).await {
        Ok(model) => data_response(StatusCode::OK, &model),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn remove_model(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.models.delete(session.tenant_id, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}
