use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const HEALTH_TEXT: &str = "ModMail Bot is running!";

pub fn app() -> Router {
    Router::new().route("/", get(|| async { HEALTH_TEXT }))
}

/// Serve the liveness endpoint on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
    axum::serve(listener, app())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

pub async fn run(port: u16, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind health server to {addr}: {e}"))?;
    tracing::info!(%addr, "health server listening");
    serve(listener, shutdown).await
}
