use std::sync::Arc;

use serenity::all::{Client, Context, GatewayIntents};
use tokio_util::sync::CancellationToken;

use modmail_core::{
    config::{Config, SettingsStore},
    domain::UserId,
    messaging::port::ChatPlatform,
    relay::{RelayState, TicketRelay},
};

use crate::handlers::{self, Handler};
use crate::DiscordMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub relay: RelayState,
}

impl AppState {
    /// Relay bound to the Discord client behind `ctx`.
    pub fn relay(&self, ctx: &Context) -> TicketRelay {
        let platform: Arc<dyn ChatPlatform> =
            Arc::new(DiscordMessenger::new(ctx.http.clone(), ctx.cache.clone()));
        let bot_id = UserId(ctx.cache.current_user().id.get());
        TicketRelay::new(self.relay.clone(), platform, bot_id)
    }
}

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Connect to the gateway and serve events until `shutdown` fires.
///
/// On shutdown the guild's slash commands are removed before the shards stop.
pub async fn run_gateway(
    cfg: Arc<Config>,
    settings: Arc<SettingsStore>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        relay: RelayState::new(settings, cfg.guild_id),
    });

    let mut client = Client::builder(&cfg.discord_bot_token, intents())
        .event_handler(Handler::new(state))
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Discord client: {e}"))?;

    let http = client.http.clone();
    let shard_manager = client.shard_manager.clone();

    tracing::info!(guild_id = cfg.guild_id.0, "connecting to Discord gateway");
    tokio::select! {
        res = client.start() => {
            res.map_err(|e| anyhow::anyhow!("Discord gateway stopped: {e}"))?;
        }
        _ = shutdown.cancelled() => {
            tracing::info!("shutdown requested; removing slash commands");
            handlers::commands::deregister(&http, cfg.guild_id).await;
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}
