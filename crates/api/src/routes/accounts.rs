//! Current-user routes: profile, preferences, credits.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use scribehub_auth::{verify_role, Role, Session};

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response, json_error};

use super::{object_payload, parse_user_id, required_str};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(whoami))
        .route("/me/profile", get(get_profile).post(create_profile).patch(update_profile))
        .route("/me/preferences", get(get_preferences).put(put_preferences))
        .route("/me/credits", get(credits))
        .route("/me/credits/consume", post(consume_credits))
        .route("/credits/grants", post(grant_credits))
}

async fn whoami(Extension(session): Extension<Session>) -> Response {
    data_response(
        StatusCode::OK,
        &json!({
            "user_id": session.user_id,
            "tenant_id": session.tenant_id,
            "role": session.role,
        }),
    )
}

async fn create_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state
        .profiles
        .create(session.tenant_id, session.user_id, payload)
        .await
    {
        Ok(profile) => data_response(StatusCode::CREATED, &profile),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state
        .profiles
        .get_by_user(session.tenant_id, session.user_id)
        .await
    {
        Ok(profile) => data_response(StatusCode::OK, &profile),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state
        .profiles
        .update(session.tenant_id, session.user_id, payload)
        .await
    {
        Ok(profile) => data_response(StatusCode::OK, &profile),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn get_preferences(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state
        .preferences
        .get(session.tenant_id, session.user_id)
        .await
    {
        Ok(preference) => data_response(StatusCode::OK, &preference),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn put_preferences(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state
        .preferences
        .upsert(session.tenant_id, session.user_id, payload)
        .await
    {
        Ok(preference) => data_response(StatusCode::OK, &preference),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn credits(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    let grants = match state
        .credits
        .active_grants(session.tenant_id, session.user_id)
        .await
    {
        Ok(grants) => grants,
        Err(err) => return domain_error_to_response(&err),
    };
    let balance: i64 = grants.iter().map(|g| g.amount).sum();
    data_response(StatusCode::OK, &json!({"balance": balance, "grants": grants}))
}

async fn consume_credits(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let Some(amount) = payload.get("amount").and_then(|v| v.as_i64()) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "amount must be an integer",
        );
    };

    match state
        .credits
        .consume(session.tenant_id, session.user_id, amount)
        .await
    {
        Ok(receipt) => data_response(StatusCode::OK, &receipt),
        Err(err) => domain_error_to_response(&err),
    }
}

/// Administrators top up any user in their tenant.
async fn grant_credits(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(err) = verify_role(
        &session,
        &[Role::Owner, Role::Admin],
        "Only administrators can grant credits.",
    ) {
        return domain_error_to_response(&err);
    }

    let mut payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let user_id = match required_str(&payload, "user_id").and_then(|raw| parse_user_id(raw)) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    payload.remove("user_id");

    match state.credits.grant(session.tenant_id, user_id, payload).await {
        Ok(grant) => data_response(StatusCode::CREATED, &grant),
        Err(err) => domain_error_to_response(&err),
    }
}
