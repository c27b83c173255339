use std::net::SocketAddr;

use community_forum::routes::create_routes;
use community_forum::{AppConfig, AppState};
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically delete expired refresh-token sessions
fn spawn_session_pruner(app_state: AppState) {
    tokio::spawn(async move {
        let mut ticker = interval(SESSION_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = app_state.session_service.prune_expired().await {
                error!("❌ SESSION: Failed to prune expired sessions: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ SHUTDOWN: Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("🛑 SHUTDOWN: Ctrl-C received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("community_forum=info,tower_http=info")),
        )
        .init();

    info!("Starting community forum server...");

    // Load configuration from environment
    let config = AppConfig::from_env();
    info!("Server configuration loaded");

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;
    info!("Application state initialized ({} store)", app_state.db.backend_name());

    spawn_session_pruner(app_state.clone());

    // Build our application with routes
    let app = create_routes(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config.server_address().parse()?;
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
