//! Application wiring: services, router, middleware.

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;

use scribehub_accounts::{CreditService, PreferenceService, ProfileService};
use scribehub_auth::IdentityProvider;
use scribehub_billing::{CostService, SubscriptionService};
use scribehub_outputs::{OutputFileService, OutputTypeService};
use scribehub_providers::{AiModelService, AiProviderService};
use scribehub_store::Store;
use scribehub_teams::TeamService;
use scribehub_transcripts::{PlaylistService, TranscriptService, TranscriptTypeService};

use crate::middleware::{auth_middleware, AuthState};
use crate::routes;

/// Every resource service over one injected store handle.
#[derive(Clone)]
pub struct AppState {
    pub transcripts: TranscriptService,
    pub transcript_types: TranscriptTypeService,
    pub playlists: PlaylistService,
    pub output_types: OutputTypeService,
    pub output_files: OutputFileService,
    pub teams: TeamService,
    pub profiles: ProfileService,
    pub preferences: PreferenceService,
    pub credits: CreditService,
    pub providers: AiProviderService,
    pub models: AiModelService,
    pub costs: CostService,
    pub subscriptions: SubscriptionService,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            transcripts: TranscriptService::new(store.clone()),
            transcript_types: TranscriptTypeService::new(store.clone()),
            playlists: PlaylistService::new(store.clone()),
            output_types: OutputTypeService::new(store.clone()),
            output_files: OutputFileService::new(store.clone()),
            teams: TeamService::new(store.clone()),
            profiles: ProfileService::new(store.clone()),
            preferences: PreferenceService::new(store.clone()),
            credits: CreditService::new(store.clone()),
            providers: AiProviderService::new(store.clone()),
            models: AiModelService::new(store.clone()),
            costs: CostService::new(store.clone()),
            subscriptions: SubscriptionService::new(store),
        }
    }
}

/// Build the full router. Everything except `/health` sits behind the auth
/// middleware.
pub fn build_app(store: Store, identity: Arc<dyn IdentityProvider>) -> Router {
    let state = AppState::new(store);
    let auth = AuthState { identity };

    let api = Router::new()
        .merge(routes::transcripts::router())
        .merge(routes::transcript_types::router())
        .merge(routes::playlists::router())
        .merge(routes::outputs::router())
        .merge(routes::teams::router())
        .merge(routes::accounts::router())
        .merge(routes::providers::router())
        .merge(routes::billing::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(auth, auth_middleware)),
        )
        .with_state(state);

    Router::new().route("/health", get(health)).merge(api)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
