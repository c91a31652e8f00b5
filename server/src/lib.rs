pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notes;
pub mod routes;
pub mod stream;
pub mod upload;

use std::net::SocketAddr;
use anyhow::Context;
use tokio::net::TcpListener;

pub use app_state::AppState; // Re-export for convenience
pub use config::Config;

/// Bind the configured address and relay until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.media.upload_dir)
        .await
        .with_context(|| format!("creating upload dir {}", config.media.upload_dir.display()))?;

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("binding {}", config.server.bind_address))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    let app = routes::create_router(AppState::new(config));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Serve on an already-bound listener with the given state.
pub async fn serve(listener: TcpListener, state: app_state::SharedState) -> anyhow::Result<()> {
    let app = routes::create_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
