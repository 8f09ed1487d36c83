//! # Syncboard API Server
//!
//! Collaborative task tracker backend: REST task engine, JWT auth, and a
//! websocket event stream that keeps every connected client's view of the
//! task set in sync with server-side mutations.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/syncboard \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p syncboard-api
//! ```

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syncboard_api::app::{build_router, AppState};
use syncboard_api::config::Config;
use syncboard_api::realtime::fanout::WsFanout;
use syncboard_api::realtime::registry::SessionRegistry;
use syncboard_shared::auth::verifier::JwtVerifier;
use syncboard_shared::db::pool::{create_pool, DatabaseConfig};
use syncboard_shared::service::TaskService;
use syncboard_shared::store::postgres::{PgTaskStore, PgUserDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syncboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Syncboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let registry = Arc::new(SessionRegistry::new());
    let users = Arc::new(PgUserDirectory::new(pool.clone()));
    let service = TaskService::new(
        Arc::new(PgTaskStore::new(pool)),
        users.clone(),
        Arc::new(WsFanout::new(registry.clone())),
    );
    let verifier = Arc::new(JwtVerifier::new(config.jwt.secret.clone()));

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = AppState::new(service, users, registry, verifier, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining...");
}
