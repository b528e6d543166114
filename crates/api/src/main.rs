//! AgroSense enqueue API binary entrypoint.

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use agrosense_common::config::AppConfig;
use agrosense_common::db;

use agrosense_api::routes::create_router;
use agrosense_api::state::AppState;

/// Notification requests are small JSON objects.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("agrosense_api=debug,agrosense_common=info,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting AgroSense API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    if config.api_jwt_secret.is_none() {
        anyhow::bail!("API_JWT_SECRET environment variable is required");
    }
    let addr: SocketAddr = config
        .api_bind_addr
        .parse()
        .map_err(|_| anyhow::anyhow!("API_BIND_ADDR must be a socket address"))?;

    // Create database connection pool
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::migrate(&pool).await?;

    // Build application state
    let state = AppState::new(pool, config);

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
