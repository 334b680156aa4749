//! Visitdesk Server - field visit query and export
//!
//! REST API server backing the visit list of the operations dashboard.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use visitdesk_server::{
    api,
    config::{AppConfig, LoggingConfig, PersistenceBackend},
    repository::Repository,
    services::{
        persistence::{MemoryPersistence, PersistenceAdapter},
        redis::RedisPersistence,
        Services,
    },
    AppState,
};

/// Install the global subscriber. The returned guard flushes file logs on drop.
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("visitdesk_server={},tower_http=debug", logging.level).into());

    let (writer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "visitdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let fmt_layer = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Visitdesk Server v{}", env!("CARGO_PKG_VERSION"));

    // Filter state store
    let persistence: Arc<dyn PersistenceAdapter> = match config.persistence.backend {
        PersistenceBackend::Redis => {
            let redis = RedisPersistence::new(&config.redis.url, &config.persistence)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Connected to Redis");
            Arc::new(redis)
        }
        PersistenceBackend::Memory => {
            tracing::warn!("Using in-memory filter store; filters are lost on restart");
            Arc::new(MemoryPersistence::new())
        }
    };

    // Record API client
    let repository =
        Repository::http(&config.record_api).context("Failed to create record API client")?;
    tracing::info!("Record API at {}", config.record_api.base_url);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid host address")?,
        config.server.port,
    );

    // Create services and application state
    let services = Services::new(repository, persistence, &config);
    if config.session.idle_ttl_seconds > 0 {
        let every = Duration::from_secs(config.session.sweep_interval_seconds.max(1));
        services.visits.spawn_idle_sweeper(every);
        tracing::info!(
            "Evicting visit screens idle for {}s",
            config.session.idle_ttl_seconds
        );
    }
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
