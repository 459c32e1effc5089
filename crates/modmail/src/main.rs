use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use modmail_core::config::{Config, SettingsStore};

mod health;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    modmail_core::logging::init("modmail")?;

    let cfg = Arc::new(Config::load()?);
    let settings = Arc::new(SettingsStore::load(
        cfg.settings_path.clone(),
        cfg.guild_id,
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let health_shutdown = shutdown.clone();
    let port = cfg.http_port;
    tokio::spawn(async move {
        if let Err(e) = health::run(port, health_shutdown.clone()).await {
            tracing::error!(error = %e, "health server failed");
            health_shutdown.cancel();
        }
    });

    let res = modmail_discord::router::run_gateway(cfg, settings, shutdown.clone()).await;
    shutdown.cancel();
    res
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
