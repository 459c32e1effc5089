//! Gateway event handlers.
//!
//! Each handler converts the serenity payload into a core event and hands it
//! to a `TicketRelay` built for the current context.

use std::sync::Arc;

use async_trait::async_trait;

use serenity::all::{ActivityData, Context, EventHandler, Interaction, Message, Ready};

use crate::router::AppState;

pub mod commands;
mod interaction;
mod message;

pub struct Handler {
    state: Arc<AppState>,
}

impl Handler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "bot is ready");
        ctx.set_activity(Some(ActivityData::playing(
            self.state.cfg.status_text.clone(),
        )));

        commands::register(&ctx.http, self.state.cfg.guild_id).await;

        match self.state.relay(&ctx).recover_tickets().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(restored = n, "restored open tickets"),
            Err(e) => tracing::warn!(error = %e, "ticket recovery failed"),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        message::handle_message(&ctx, &msg, &self.state).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(cmd) = interaction {
            interaction::handle_command(&ctx, &cmd, &self.state).await;
        }
    }
}
