//! Ticket lifecycle: open a staff-only channel for a user, tear it down on close/delete.

use std::cmp::Reverse;

use chrono::Utc;

use crate::{
    config::TicketSettings,
    domain::{ChannelId, GuildId, RoleId, UserId},
    embeds,
    errors::Error,
    messaging::{
        port::{send_direct_embed, ChatPlatform},
        types::{
            Author, ChannelPermissions, NewChannel, OverwriteTarget, PermissionOverwrite,
        },
    },
    registry::{TicketRegistry, UserLocks},
    Result,
};

pub const CHANNEL_SUFFIX: &str = "-ticket";
/// Discord's channel name limit.
pub const MAX_CHANNEL_NAME: usize = 100;
pub const TOPIC_PREFIX: &str = "ModMail ticket for user ";
/// Topic of a closed ticket. Recovery does not match it.
pub const CLOSED_TOPIC_PREFIX: &str = "Closed ModMail ticket for user ";
pub const DEFAULT_CLOSE_REASON: &str = "No reason provided";

/// How a ticket is being torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseMode {
    /// Routing stops; the channel stays.
    Close,
    /// Routing stops and the channel is deleted.
    Delete,
}

impl CloseMode {
    pub fn verb(self) -> &'static str {
        match self {
            CloseMode::Close => "closed",
            CloseMode::Delete => "deleted",
        }
    }
}

/// What `close_ticket` managed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseReport {
    pub owner: Option<UserId>,
    pub owner_notified: bool,
    pub logged: bool,
}

/// `<display name>-ticket`, lower-cased, at most 100 chars with the suffix kept.
pub fn ticket_channel_name(display_name: &str) -> String {
    let lowered = display_name.trim().to_lowercase();
    let base = if lowered.is_empty() {
        "user".to_string()
    } else {
        lowered
    };
    let max_base = MAX_CHANNEL_NAME - CHANNEL_SUFFIX.len();
    let base: String = base.chars().take(max_base).collect();
    format!("{base}{CHANNEL_SUFFIX}")
}

pub fn ticket_topic(user: UserId) -> String {
    format!("{TOPIC_PREFIX}{}", user.0)
}

pub fn closed_ticket_topic(user: UserId) -> String {
    format!("{CLOSED_TOPIC_PREFIX}{}", user.0)
}

/// Owner recorded in an open ticket channel's topic, if any.
pub fn parse_ticket_topic(topic: &str) -> Option<UserId> {
    let rest = topic.trim().strip_prefix(TOPIC_PREFIX)?;
    crate::config::parse_snowflake(rest).map(UserId)
}

/// Hide the channel from @everyone; let the staff role view, write and read history.
pub fn ticket_overwrites(staff_role: RoleId) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite {
            target: OverwriteTarget::Everyone,
            allow: ChannelPermissions::NONE,
            deny: ChannelPermissions::VIEW,
        },
        PermissionOverwrite {
            target: OverwriteTarget::Role(staff_role),
            allow: ChannelPermissions::PARTICIPATE,
            deny: ChannelPermissions::NONE,
        },
    ]
}

pub struct TicketManager<'a> {
    platform: &'a dyn ChatPlatform,
    registry: &'a TicketRegistry,
    guild_id: GuildId,
}

impl<'a> TicketManager<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, registry: &'a TicketRegistry, guild_id: GuildId) -> Self {
        Self {
            platform,
            registry,
            guild_id,
        }
    }

    /// Create the ticket channel and post the opening announcement.
    ///
    /// The caller registers the returned channel.
    pub async fn create_ticket(&self, user: &Author, settings: &TicketSettings) -> Result<ChannelId> {
        let (Some(category), Some(staff_role)) = (settings.category_id, settings.staff_role_id) else {
            return Err(Error::ConfigIncomplete);
        };

        let channel = self
            .platform
            .create_channel(
                self.guild_id,
                NewChannel {
                    name: ticket_channel_name(user.shown_name()),
                    parent: category,
                    topic: Some(ticket_topic(user.id)),
                    overwrites: ticket_overwrites(staff_role),
                },
            )
            .await?;

        let now = Utc::now();
        let created_at = user.id.created_at().unwrap_or(now);
        if let Err(e) = self
            .platform
            .send_embed(channel, embeds::ticket_opened(user, created_at, now))
            .await
        {
            tracing::warn!(channel_id = channel.0, error = %e, "failed to post ticket announcement");
        }

        tracing::info!(user_id = user.id.0, channel_id = channel.0, "ticket channel created");
        Ok(channel)
    }

    /// Close or delete the ticket living in `channel`.
    ///
    /// Works on unmapped channels too: the DM notice is skipped, the log entry
    /// and channel action still happen.
    pub async fn close_ticket(
        &self,
        channel: ChannelId,
        actor: &Author,
        mode: CloseMode,
        reason: &str,
        settings: &TicketSettings,
    ) -> Result<CloseReport> {
        let now = Utc::now();
        let owner = self.registry.lookup_user(channel).await;

        let mut owner_notified = false;
        if let Some(owner) = owner {
            match send_direct_embed(
                self.platform,
                owner,
                embeds::close_notice(actor, mode, reason, now),
            )
            .await
            {
                Ok(_) => owner_notified = true,
                Err(e) => {
                    tracing::warn!(user_id = owner.0, error = %e, "could not notify ticket owner")
                }
            }
        }

        let mut logged = false;
        if let Some(log_channel) = settings.log_channel_id {
            match self
                .platform
                .send_embed(
                    log_channel,
                    embeds::close_log(owner, channel, actor, mode, reason, now),
                )
                .await
            {
                Ok(_) => logged = true,
                Err(e) => {
                    tracing::warn!(channel_id = log_channel.0, error = %e, "failed to write close log")
                }
            }
        }

        if mode == CloseMode::Close {
            self.mark_closed(channel, owner).await;
        }
        self.registry.remove(channel).await;
        tracing::info!(
            channel_id = channel.0,
            owner = owner.map(|u| u.0),
            actor = actor.id.0,
            "ticket {}",
            mode.verb()
        );

        if mode == CloseMode::Delete {
            self.platform.delete_channel(channel).await?;
        }

        Ok(CloseReport {
            owner,
            owner_notified,
            logged,
        })
    }

    /// Swap the topic to the closed marker so a later recovery leaves the channel alone.
    ///
    /// Unmapped channels fall back to the owner named in their current topic.
    async fn mark_closed(&self, channel: ChannelId, owner: Option<UserId>) {
        let owner = match owner {
            Some(user) => Some(user),
            None => match self.platform.channel_info(channel).await {
                Ok(info) => info.topic.as_deref().and_then(parse_ticket_topic),
                Err(e) => {
                    tracing::warn!(channel_id = channel.0, error = %e, "failed to read ticket topic");
                    None
                }
            },
        };
        let Some(owner) = owner else {
            return;
        };
        if let Err(e) = self
            .platform
            .set_channel_topic(channel, &closed_ticket_topic(owner))
            .await
        {
            tracing::warn!(channel_id = channel.0, error = %e, "failed to mark ticket closed");
        }
    }

    /// Rebuild registry entries from open ticket topics under the configured category.
    ///
    /// Each insert holds the owner's user lock, so a ticket being opened by a
    /// concurrent DM is never clobbered. Among duplicates the newest channel wins.
    pub async fn recover(&self, settings: &TicketSettings, locks: &UserLocks) -> Result<usize> {
        let Some(category) = settings.category_id else {
            return Ok(0);
        };

        let mut tickets: Vec<(ChannelId, UserId)> = self
            .platform
            .guild_channels(self.guild_id)
            .await?
            .into_iter()
            .filter(|ch| ch.parent == Some(category))
            .filter_map(|ch| {
                let owner = ch.topic.as_deref().and_then(parse_ticket_topic)?;
                Some((ch.id, owner))
            })
            .collect();
        // Snowflakes grow with time.
        tickets.sort_by_key(|(channel, _)| Reverse(channel.0));

        let mut restored = 0;
        for (channel, owner) in tickets {
            let _guard = locks.lock_user(owner).await;
            // Gateway reconnects re-run recovery.
            if self.registry.lookup_channel(owner).await == Some(channel) {
                continue;
            }
            match self.registry.insert(owner, channel).await {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::warn!(channel_id = channel.0, user_id = owner.0, error = %e, "skipping ticket during recovery")
                }
            }
        }
        Ok(restored)
    }
}
