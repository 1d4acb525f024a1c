//! relay-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and SSE endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use relay_gateway::api;
use relay_gateway::app_state::AppState;
use relay_gateway::config::RelayConfig;
use relay_gateway::domain::EventBus;
use relay_gateway::persistence::{ConversationStore, MemoryStore, PostgresStore};
use relay_gateway::service::RelayService;
use relay_gateway::sse::handler::events_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting relay-gateway");

    // Select the conversation store
    let store: Arc<dyn ConversationStore> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("postgres store ready");
        Arc::new(PostgresStore::new(pool))
    } else {
        tracing::warn!("persistence disabled; conversation log is in-memory only");
        Arc::new(MemoryStore::new())
    };

    // Build domain and service layers
    let event_bus = EventBus::new();
    let relay_service = Arc::new(RelayService::new(store, event_bus));

    // Build application state
    let app_state = AppState {
        relay_service,
        heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/api/v1/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
