//! Team and membership routes.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use scribehub_auth::{Role, Session};

use crate::app::AppState;
use crate::errors::{data_response, domain_error_to_response, json_error};

use super::{object_payload, parse_record_id, parse_user_id, required_str};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list).post(create))
        .route("/teams/:id", get(get_one).patch(update).delete(remove))
        .route("/teams/:id/members", get(members).post(add_member))
        .route(
            "/teams/:id/members/:user_id",
            axum::routing::patch(update_member_role).delete(remove_member),
        )
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
    match state.teams.create(session.tenant_id, &session, payload).await {
        Ok(team) => data_response(StatusCode::CREATED, &team),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.teams.list(session.tenant_id).await {
        Ok(teams) => data_response(StatusCode::OK, &teams),
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
    match state.teams.get(session.tenant_id, id).await {
        Ok(team) => data_response(StatusCode::OK, &team),
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
    match state
        .teams
        .update(session.tenant_id, &session, id, payload)
        .await
    {
        Ok(team) => data_response(StatusCode::OK, &team),
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
    match state.teams.delete(session.tenant_id, &session, id).await {
        Ok(()) => data_response(StatusCode::OK, &json!({"deleted": true})),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn members(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.teams.members(session.tenant_id, &session, id).await {
        Ok(members) => data_response(StatusCode::OK, &members),
        Err(err) => domain_error_to_response(&err),
    }
}

fn parse_role(raw: &str) -> Result<Role, Response> {
    raw.parse::<Role>()
        .map_err(|err| domain_error_to_response(&err))
}

async fn add_member(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let team_id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let user_id = match required_str(&payload, "user_id").and_then(|raw| parse_user_id(raw)) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let role = match payload.get("role").and_then(|v| v.as_str()) {
        Some(raw) => match parse_role(raw) {
            Ok(role) => role,
            Err(response) => return response,
        },
        None => Role::Member,
    };

    match state
        .teams
        .add_member(session.tenant_id, &session, team_id, user_id, role)
        .await
    {
        Ok(member) => data_response(StatusCode::CREATED, &member),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn update_member_role(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((id, user_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let team_id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let user_id = match parse_user_id(&user_id) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let payload = match object_payload(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let role = match payload.get("role").and_then(|v| v.as_str()) {
        Some(raw) => match parse_role(raw) {
            Ok(role) => role,
            Err(response) => return response,
        },
        None => {
            return json_error(StatusCode::BAD_REQUEST, "validation", "role is required");
        }
    };

    match state
        .teams
        .update_member_role(session.tenant_id, &session, team_id, user_id, role)
        .await
    {
        Ok(member) => data_response(StatusCode::OK, &member),
        Err(err) => domain_error_to_response(&err),
    }
}

async fn remove_member(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((id, user_id)): Path<(String, String)>,
) -> Response {
    let team_id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let user_id = match parse_user_id(&user_id) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match state
        .teams
        .remove_member(session.tenant_id, &session, team_id, user_id)
        .await
    {
        Ok(()) => data_response(StatusCode::OK, &json!({"removed": true})),
        Err(err) => domain_error_to_response(&err),
    }
}
