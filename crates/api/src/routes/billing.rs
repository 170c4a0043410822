//! Cost, subscription, and feature-gate routes.

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
        .route("/costs", post(create_cost))
        .route("/transcripts/:id/costs", get(transcript_costs))
        .route("/billing/total", get(total))
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions/active", get(active_subscription))
        .route("/subscriptions/:id", axum::routing::patch(update_subscription))
        .route("/subscriptions/:id/cancel", post(cancel_subscription))
        .route("/features/:key", get(feature))
}

async fn create_cost(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.costs.create(session.tenant_id, payload).await {
        Ok(cost) => data_response(StatusCode::CREATED, &cost),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn transcript_costs(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let transcript_id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state
        .costs
        .list_for_transcript(session.tenant_id, transcript_id)
        .await
    {
        Ok(costs) => data_response(StatusCode::OK, &costs),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn total(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.costs.total_cents(session.tenant_id).await {
        Ok(total_cents) => data_response(StatusCode::OK, &json!({"total_cents": total_cents})),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn create_subscription(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.subscriptions.create(session.tenant_id, payload).await {
        Ok(subscription) => data_response(StatusCode::CREATED, &subscription),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn active_subscription(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.subscriptions.active(session.tenant_id).await {
        Ok(subscription) => data_response(StatusCode::OK, &subscription),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn update_subscription(
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
    match state
        .subscriptions
        .update(session.tenant_id, id, payload)
        .await
    {
        Ok(subscription) => data_response(StatusCode::OK, &subscription),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.subscriptions.cancel(session.tenant_id, id).await {
        Ok(subscription) => data_response(StatusCode::OK, &subscription),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn feature(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(key): Path<String>,
) -> Response {
    match state
        .subscriptions
        .feature_enabled(session.tenant_id, &key)
        .await
    {
        Ok(enabled) => data_response(StatusCode::OK, &json!({"key": key, "enabled": enabled})),
        Err(err) => domain_error_to_response(&err),
    }
}
