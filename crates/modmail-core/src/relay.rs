//! Executes routing decisions: opens tickets and mirrors messages both ways.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    commands::Dispatcher,
    config::{SettingsStore, TicketSettings},
    domain::{ChannelId, GuildId, UserId},
    embeds,
    errors::Error,
    messaging::{
        port::{send_direct_embed, ChatPlatform},
        types::{CommandInvocation, CommandReply, IncomingEvent, InboundMessage},
    },
    registry::{TicketRegistry, UserLocks},
    router::{IgnoreReason, Route, Router},
    tickets::TicketManager,
    Result,
};

pub const TICKET_OPENED_ACK: &str =
    "Thank you! A new support ticket has been opened. A staff member will respond shortly.";
pub const USER_DELIVERY_FAILED: &str =
    "Sorry, your message could not be delivered to staff. Please try again later.";
pub const STAFF_DELIVERY_FAILED: &str =
    "⚠️ Could not deliver this message to the user. They may have left the server or disabled DMs.";
pub const REACTION_DELIVERED: &str = "✅";

/// Shared state that outlives any single event.
#[derive(Clone)]
pub struct RelayState {
    pub settings: Arc<SettingsStore>,
    pub registry: Arc<TicketRegistry>,
    pub user_locks: Arc<UserLocks>,
    pub guild_id: GuildId,
}

impl RelayState {
    pub fn new(settings: Arc<SettingsStore>, guild_id: GuildId) -> Self {
        Self {
            settings,
            registry: Arc::new(TicketRegistry::new()),
            user_locks: Arc::new(UserLocks::default()),
            guild_id,
        }
    }
}

/// Result of handling one inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    TicketOpened(ChannelId),
    /// Ticket could not be created; the user got an apology.
    TicketRefused,
    ForwardedToStaff(ChannelId),
    ForwardedToUser(UserId),
    /// Forwarding failed; the sender was told.
    DeliveryFailed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    Message(Outcome),
    Command(CommandReply),
}

pub struct TicketRelay {
    state: RelayState,
    platform: Arc<dyn ChatPlatform>,
    bot_id: UserId,
}

impl TicketRelay {
    pub fn new(state: RelayState, platform: Arc<dyn ChatPlatform>, bot_id: UserId) -> Self {
        Self {
            state,
            platform,
            bot_id,
        }
    }

    fn router<'a>(&'a self, settings: &'a TicketSettings) -> Router<'a> {
        Router {
            platform: self.platform.as_ref(),
            registry: &self.state.registry,
            settings,
            guild_id: self.state.guild_id,
            bot_id: self.bot_id,
        }
    }

    fn tickets(&self) -> TicketManager<'_> {
        TicketManager::new(
            self.platform.as_ref(),
            &self.state.registry,
            self.state.guild_id,
        )
    }

    pub async fn handle(&self, event: IncomingEvent) -> Result<Handled> {
        match event {
            IncomingEvent::DirectMessage(msg) => self.handle_direct(&msg).await.map(Handled::Message),
            IncomingEvent::ChannelMessage(msg) => {
                self.handle_channel(&msg).await.map(Handled::Message)
            }
            IncomingEvent::SlashCommand(inv) => Ok(Handled::Command(self.handle_command(&inv).await)),
        }
    }

    /// A DM to the bot. Serialized per author so one user never gets two tickets.
    pub async fn handle_direct(&self, msg: &InboundMessage) -> Result<Outcome> {
        let _guard = self.state.user_locks.lock_user(msg.author.id).await;
        let settings = self.state.settings.snapshot().await;

        let route = self.router(&settings).route_direct(msg).await;
        if route == Route::Ignore(IgnoreReason::NotConfigured) {
            self.reply_in_place(msg, Error::ConfigIncomplete.user_message())
                .await;
            return Ok(Outcome::TicketRefused);
        }
        self.execute(route, msg, &settings).await
    }

    /// A message in a guild channel.
    pub async fn handle_channel(&self, msg: &InboundMessage) -> Result<Outcome> {
        let settings = self.state.settings.snapshot().await;
        let route = self.router(&settings).route_channel(msg).await?;
        self.execute(route, msg, &settings).await
    }

    pub async fn handle_command(&self, inv: &CommandInvocation) -> CommandReply {
        Dispatcher {
            platform: self.platform.as_ref(),
            registry: &self.state.registry,
            settings: &self.state.settings,
            guild_id: self.state.guild_id,
        }
        .dispatch(inv)
        .await
    }

    /// Re-register tickets left over from a previous run.
    pub async fn recover_tickets(&self) -> Result<usize> {
        let settings = self.state.settings.snapshot().await;
        self.tickets()
            .recover(&settings, &self.state.user_locks)
            .await
    }

    async fn execute(
        &self,
        route: Route,
        msg: &InboundMessage,
        settings: &TicketSettings,
    ) -> Result<Outcome> {
        match route {
            Route::Ignore(reason) => {
                tracing::debug!(channel_id = msg.channel_id().0, ?reason, "message ignored");
                Ok(Outcome::Ignored(reason))
            }
            Route::OpenTicket => self.open_ticket(msg, settings).await,
            Route::ForwardToStaff(channel) => Ok(self.forward_to_staff(msg, channel).await),
            Route::ForwardToUser(owner) => Ok(self.forward_to_user(msg, owner).await),
        }
    }

    async fn open_ticket(&self, msg: &InboundMessage, settings: &TicketSettings) -> Result<Outcome> {
        let channel = match self.tickets().create_ticket(&msg.author, settings).await {
            Ok(ch) => ch,
            Err(e) => {
                tracing::error!(user_id = msg.author.id.0, error = %e, "error creating new ticket");
                self.reply_in_place(msg, Error::ConfigIncomplete.user_message())
                    .await;
                return Ok(Outcome::TicketRefused);
            }
        };

        match self.state.registry.insert(msg.author.id, channel).await {
            Ok(()) => {}
            Err(Error::TicketExists {
                channel: existing, ..
            }) => {
                tracing::warn!(user_id = msg.author.id.0, channel_id = existing.0, "ticket registered while creating; using it");
                self.discard_channel(channel).await;
                return Ok(self.forward_to_staff(msg, existing).await);
            }
            Err(e) => {
                tracing::error!(user_id = msg.author.id.0, channel_id = channel.0, error = %e, "failed to register ticket");
                self.discard_channel(channel).await;
                self.reply_in_place(msg, USER_DELIVERY_FAILED).await;
                return Ok(Outcome::TicketRefused);
            }
        }

        if let Outcome::DeliveryFailed = self.forward_to_staff(msg, channel).await {
            return Ok(Outcome::TicketOpened(channel));
        }
        self.reply_in_place(msg, TICKET_OPENED_ACK).await;
        Ok(Outcome::TicketOpened(channel))
    }

    async fn forward_to_staff(&self, msg: &InboundMessage, channel: ChannelId) -> Outcome {
        match self
            .platform
            .send_embed(channel, embeds::user_message(msg, Utc::now()))
            .await
        {
            Ok(_) => Outcome::ForwardedToStaff(channel),
            Err(e) => {
                tracing::warn!(user_id = msg.author.id.0, channel_id = channel.0, error = %e, "failed to forward user message");
                self.reply_in_place(msg, USER_DELIVERY_FAILED).await;
                Outcome::DeliveryFailed
            }
        }
    }

    async fn forward_to_user(&self, msg: &InboundMessage, owner: UserId) -> Outcome {
        match send_direct_embed(
            self.platform.as_ref(),
            owner,
            embeds::staff_reply(msg, Utc::now()),
        )
        .await
        {
            Ok(_) => {
                if let Err(e) = self
                    .platform
                    .add_reaction(msg.message, REACTION_DELIVERED)
                    .await
                {
                    tracing::debug!(error = %e, "failed to add delivery reaction");
                }
                Outcome::ForwardedToUser(owner)
            }
            Err(e) => {
                tracing::warn!(user_id = owner.0, channel_id = msg.channel_id().0, error = %e, "failed to deliver staff reply");
                self.reply_in_place(msg, STAFF_DELIVERY_FAILED).await;
                Outcome::DeliveryFailed
            }
        }
    }

    /// Delete a ticket channel that never got registered.
    async fn discard_channel(&self, channel: ChannelId) {
        if let Err(e) = self.platform.delete_channel(channel).await {
            tracing::warn!(channel_id = channel.0, error = %e, "failed to delete unregistered ticket channel");
        }
    }

    /// Best-effort text reply in the channel the message came from.
    async fn reply_in_place(&self, msg: &InboundMessage, text: &str) {
        if let Err(e) = self.platform.send_text(msg.channel_id(), text).await {
            tracing::warn!(channel_id = msg.channel_id().0, error = %e, "failed to send reply");
        }
    }
}
