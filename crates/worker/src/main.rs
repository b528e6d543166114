use std::sync::Arc;
use std::time::Duration;

use agrosense_common::config::AppConfig;
use agrosense_common::db;
use agrosense_worker::poller::QueuePoller;
use agrosense_worker::store::{PgEndpointStore, PgNotificationQueue};
use agrosense_worker::ticker::IntervalTicker;
use agrosense_worker::transport::{VapidCredentials, WebPushOptions, WebPushTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agrosense_worker=info,agrosense_common=info".into()),
        )
        .json()
        .init();

    tracing::info!("AgroSense push worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Push transport
    let credentials = VapidCredentials::from_config(&config)?;
    let transport = WebPushTransport::new(credentials, WebPushOptions::from_config(&config))?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::migrate(&pool).await?;

    let poller = QueuePoller::new(
        Arc::new(PgNotificationQueue::new(pool.clone())),
        Arc::new(PgEndpointStore::new(pool)),
        Arc::new(transport),
    )
    .with_batch_size(config.worker_batch_size);

    let mut ticker = IntervalTicker::new(Duration::from_millis(config.worker_poll_interval_ms));

    tracing::info!(
        poll_interval_ms = config.worker_poll_interval_ms,
        batch_size = config.worker_batch_size,
        "Starting delivery loop"
    );

    // In-flight notifications stay pending and are retried on the next start.
    tokio::select! {
        _ = poller.run(&mut ticker) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("AgroSense push worker stopped.");
    Ok(())
}
