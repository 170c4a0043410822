use std::sync::Arc;

use scribehub_auth::{Role, Session, StaticTokenProvider};
use scribehub_core::{TenantId, UserId};
use scribehub_store::{PostgresBackend, Store, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scribehub_observability::init();

    let store = if std::env::var("SCRIBEHUB_IN_MEMORY").is_ok_and(|v| v == "1") {
        tracing::warn!("SCRIBEHUB_IN_MEMORY=1: using the in-memory store; data is not persisted");
        Store::in_memory()
    } else {
        let config = StoreConfig::from_env()?;
        let backend = PostgresBackend::connect(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to store: {e}"))?;
        Store::new(Arc::new(backend))
    };

    // The hosted identity provider is wired in by the deployment; the static
    // provider here serves dev setups that export a fixed token.
    let identity = Arc::new(StaticTokenProvider::new());
    if let Ok(token) = std::env::var("SCRIBEHUB_DEV_TOKEN") {
        let session = Session::new(UserId::new(), TenantId::new(), Role::Owner);
        tracing::warn!(
            tenant_id = %session.tenant_id,
            user_id = %session.user_id,
            "SCRIBEHUB_DEV_TOKEN set: registering an owner session for it"
        );
        identity.register(token, session);
    }

    let app = scribehub_api::app::build_app(store, identity);

    let addr =
        std::env::var("SCRIBEHUB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
