//! Decides what an inbound message means for the ticket state machine.

use crate::{
    config::TicketSettings,
    domain::{ChannelId, GuildId, RoleId, UserId},
    messaging::{port::ChatPlatform, types::InboundMessage},
    registry::TicketRegistry,
    Result,
};

/// Why a message was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    NotConfigured,
    NotTicketChannel,
    NoTicketOwner,
    NotStaff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Ignore(IgnoreReason),
    /// First DM from a user without a ticket.
    OpenTicket,
    ForwardToStaff(ChannelId),
    ForwardToUser(UserId),
}

/// True when `roles` contains the configured staff role. An unset role matches nobody.
pub fn is_staff(roles: &[RoleId], staff_role: Option<RoleId>) -> bool {
    match staff_role {
        Some(role) => roles.contains(&role),
        None => false,
    }
}

pub struct Router<'a> {
    pub platform: &'a dyn ChatPlatform,
    pub registry: &'a TicketRegistry,
    pub settings: &'a TicketSettings,
    pub guild_id: GuildId,
    pub bot_id: UserId,
}

impl Router<'_> {
    fn precheck(&self, msg: &InboundMessage) -> Option<IgnoreReason> {
        if msg.author.id == self.bot_id {
            return Some(IgnoreReason::OwnMessage);
        }
        if self.settings.category_id.is_none() {
            return Some(IgnoreReason::NotConfigured);
        }
        None
    }

    /// Route a DM. Callers must hold the author's user lock until the route is acted on.
    pub async fn route_direct(&self, msg: &InboundMessage) -> Route {
        if let Some(reason) = self.precheck(msg) {
            return Route::Ignore(reason);
        }
        match self.registry.lookup_channel(msg.author.id).await {
            Some(channel) => Route::ForwardToStaff(channel),
            None => Route::OpenTicket,
        }
    }

    /// Route a guild channel message.
    ///
    /// Forwarded iff the channel sits in the ticket category, has a registered
    /// owner, and the author carries the staff role.
    pub async fn route_channel(&self, msg: &InboundMessage) -> Result<Route> {
        if let Some(reason) = self.precheck(msg) {
            return Ok(Route::Ignore(reason));
        }

        let info = self.platform.channel_info(msg.channel_id()).await?;
        if info.parent.is_none() || info.parent != self.settings.category_id {
            return Ok(Route::Ignore(IgnoreReason::NotTicketChannel));
        }

        let Some(owner) = self.registry.lookup_user(msg.channel_id()).await else {
            return Ok(Route::Ignore(IgnoreReason::NoTicketOwner));
        };

        if self.settings.staff_role_id.is_none() {
            return Ok(Route::Ignore(IgnoreReason::NotStaff));
        }
        let roles = self
            .platform
            .member_roles(self.guild_id, msg.author.id)
            .await?;
        if !is_staff(&roles, self.settings.staff_role_id) {
            return Ok(Route::Ignore(IgnoreReason::NotStaff));
        }

        Ok(Route::ForwardToUser(owner))
    }
}
