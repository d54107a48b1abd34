//! Doorwatch - badge access and motion-camera event server
//!
//! Main entry point for the Doorwatch application.

use doorwatch::{
    device_adapters::{run_supervised, SerialBadgeConnector, SysfsMotionConnector},
    state::{AppConfig, AppState},
    web_api,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doorwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Doorwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        storage = ?config.storage_backend,
        max_events = config.max_events,
        max_photos = config.max_photos,
        motion_cooldown_ms = config.motion_cooldown.as_millis() as u64,
        motion_rearm = ?config.motion_rearm,
        "Configuration loaded"
    );

    let state = AppState::build(config).await?;
    state.feedback.init().await;
    tracing::info!("Components initialized");

    let mut device_tasks = Vec::new();

    // Badge reader task
    if state.config.badge_reader_enabled {
        let connector = SerialBadgeConnector::new(state.config.serial_port.clone());
        let pipeline = state.pipeline.clone();
        let policy = state.config.device_retry;
        device_tasks.push(tokio::spawn(async move {
            run_supervised(connector, policy, |reader| {
                let pipeline = pipeline.clone();
                async move { pipeline.run_badge_session(reader).await }
            })
            .await;
        }));
        tracing::info!(port = %state.config.serial_port.display(), "Badge reader task started");
    } else {
        tracing::info!("Badge reader disabled");
    }

    // Motion sensor task
    if state.config.motion_enabled {
        let connector = SysfsMotionConnector::new(
            state.config.pir_value_path.clone(),
            state.config.motion_poll_interval,
        );
        let pipeline = state.pipeline.clone();
        let policy = state.config.device_retry;
        device_tasks.push(tokio::spawn(async move {
            run_supervised(connector, policy, |sensor| {
                let pipeline = pipeline.clone();
                async move { pipeline.run_motion_session(sensor).await }
            })
            .await;
        }));
        tracing::info!(path = %state.config.pir_value_path.display(), "Motion sensor task started");
    } else {
        tracing::info!("Motion sensor disabled");
    }

    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in device_tasks {
        task.abort();
    }
    state.feedback.shutdown().await;
    tracing::info!("Doorwatch stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
