//! Pollstar-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use pollstar_api::{AppState, router as api_router};
use pollstar_common::Config;
use pollstar_core::repository::PollRepository;
use pollstar_core::services::{EventPublisherService, PollService};
use pollstar_db::PgTableStore;
use pollstar_db::table::TableStoreHandle;
use pollstar_realtime::RedisPubSub;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollstar=debug,tower_http=debug".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    info!("Starting pollstar-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = pollstar_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    pollstar_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis Pub/Sub
    info!("Connecting to Redis...");
    let pubsub = RedisPubSub::new(&config.redis.url).await?;
    pubsub.start();
    info!("Connected to Redis Pub/Sub");

    // Wire services
    let store: TableStoreHandle = Arc::new(PgTableStore::new(Arc::new(db)));
    let events: EventPublisherService = Arc::new(pubsub.clone());
    let poll_service = PollService::new(PollRepository::new(store.clone()), events);

    let state = AppState::new(poll_service, store);

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pubsub.shutdown().await?;
    info!("Server shutdown complete");
    Ok(())
}
