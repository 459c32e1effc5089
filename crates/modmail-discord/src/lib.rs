//! Discord adapter (serenity).
//!
//! This crate implements the `modmail-core` ChatPlatform port over the Discord
//! REST API and drives the gateway connection.

use std::sync::Arc;

use async_trait::async_trait;

use serenity::all::{
    Cache, Channel, ChannelType, CreateChannel, CreateEmbed, CreateEmbedAuthor,
    CreateEmbedFooter, CreateMessage, EditChannel, GuildChannel, Http, PermissionOverwriteType, Permissions,
    ReactionType, Timestamp,
};

pub mod handlers;
pub mod router;

use modmail_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, RoleId, UserId},
    errors::Error,
    messaging::{
        port::ChatPlatform,
        types::{
            ChannelInfo, ChannelKind, ChannelPermissions, Embed, NewChannel, OverwriteTarget,
            PermissionOverwrite,
        },
    },
    Result,
};

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn dc_channel(id: ChannelId) -> serenity::all::ChannelId {
        serenity::all::ChannelId::new(id.0)
    }

    fn dc_guild(id: GuildId) -> serenity::all::GuildId {
        serenity::all::GuildId::new(id.0)
    }

    fn dc_user(id: UserId) -> serenity::all::UserId {
        serenity::all::UserId::new(id.0)
    }

    fn msg_ref(msg: &serenity::all::Message) -> MessageRef {
        MessageRef {
            channel_id: ChannelId(msg.channel_id.get()),
            message_id: MessageId(msg.id.get()),
        }
    }

    fn map_err(e: serenity::Error) -> Error {
        Error::External(format!("discord error: {e}"))
    }

    /// Failures the other human should hear about (blocked DMs, missing access).
    fn delivery_err(e: serenity::Error) -> Error {
        Error::Delivery(format!("discord error: {e}"))
    }
}

pub(crate) fn to_permissions(p: ChannelPermissions) -> Permissions {
    let mut out = Permissions::empty();
    if p.view {
        out |= Permissions::VIEW_CHANNEL;
    }
    if p.send {
        out |= Permissions::SEND_MESSAGES;
    }
    if p.read_history {
        out |= Permissions::READ_MESSAGE_HISTORY;
    }
    out
}

fn to_overwrite(guild: GuildId, o: &PermissionOverwrite) -> serenity::all::PermissionOverwrite {
    // @everyone shares its id with the guild.
    let role = match o.target {
        OverwriteTarget::Everyone => serenity::all::RoleId::new(guild.0),
        OverwriteTarget::Role(r) => serenity::all::RoleId::new(r.0),
    };
    serenity::all::PermissionOverwrite {
        allow: to_permissions(o.allow),
        deny: to_permissions(o.deny),
        kind: PermissionOverwriteType::Role(role),
    }
}

pub(crate) fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Private => ChannelKind::Direct,
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}

fn guild_channel_info(gc: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: ChannelId(gc.id.get()),
        kind: channel_kind(gc.kind),
        parent: gc.parent_id.map(|p| ChannelId(p.get())),
        topic: gc.topic.clone(),
    }
}

fn to_create_embed(e: Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new();
    if let Some(title) = e.title {
        out = out.title(title);
    }
    if let Some(desc) = e.description {
        out = out.description(desc);
    }
    if let Some(color) = e.color {
        out = out.colour(color);
    }
    if let Some(author) = e.author {
        let mut a = CreateEmbedAuthor::new(author.name);
        if let Some(icon) = author.icon_url {
            a = a.icon_url(icon);
        }
        out = out.author(a);
    }
    for f in e.fields {
        out = out.field(f.name, f.value, f.inline);
    }
    if let Some(url) = e.image_url {
        out = out.image(url);
    }
    if let Some(text) = e.footer {
        out = out.footer(CreateEmbedFooter::new(text));
    }
    if let Some(ts) = e.timestamp.and_then(|at| Timestamp::from_unix_timestamp(at.timestamp()).ok()) {
        out = out.timestamp(ts);
    }
    out
}

#[async_trait]
impl ChatPlatform for DiscordMessenger {
    async fn open_direct_channel(&self, user: UserId) -> Result<ChannelId> {
        let dm = Self::dc_user(user)
            .create_dm_channel(self.http.as_ref())
            .await
            .map_err(Self::delivery_err)?;
        Ok(ChannelId(dm.id.get()))
    }

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageRef> {
        let msg = Self::dc_channel(channel)
            .send_message(self.http.as_ref(), CreateMessage::new().content(text))
            .await
            .map_err(Self::delivery_err)?;
        Ok(Self::msg_ref(&msg))
    }

    async fn send_embed(&self, channel: ChannelId, embed: Embed) -> Result<MessageRef> {
        let msg = Self::dc_channel(channel)
            .send_message(
                self.http.as_ref(),
                CreateMessage::new().embed(to_create_embed(embed)),
            )
            .await
            .map_err(Self::delivery_err)?;
        Ok(Self::msg_ref(&msg))
    }

    async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<ChannelId> {
        let overwrites: Vec<_> = channel
            .overwrites
            .iter()
            .map(|o| to_overwrite(guild, o))
            .collect();
        let mut req = CreateChannel::new(channel.name)
            .kind(ChannelType::Text)
            .category(Self::dc_channel(channel.parent))
            .permissions(overwrites);
        if let Some(topic) = channel.topic {
            req = req.topic(topic);
        }
        let created = Self::dc_guild(guild)
            .create_channel(self.http.as_ref(), req)
            .await
            .map_err(Self::map_err)?;
        Ok(ChannelId(created.id.get()))
    }

    async fn set_channel_topic(&self, channel: ChannelId, topic: &str) -> Result<()> {
        Self::dc_channel(channel)
            .edit(self.http.as_ref(), EditChannel::new().topic(topic))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        Self::dc_channel(channel)
            .delete(self.http.as_ref())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo> {
        // Cache first; `to_channel` falls back to REST on a miss.
        let found = Self::dc_channel(channel)
            .to_channel((&self.cache, self.http.as_ref()))
            .await
            .map_err(Self::delivery_err)?;
        Ok(match found {
            Channel::Guild(gc) => guild_channel_info(&gc),
            Channel::Private(pc) => ChannelInfo {
                id: ChannelId(pc.id.get()),
                kind: ChannelKind::Direct,
                parent: None,
                topic: None,
            },
            other => ChannelInfo {
                id: ChannelId(other.id().get()),
                kind: ChannelKind::Other,
                parent: None,
                topic: None,
            },
        })
    }

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>> {
        let channels = self
            .http
            .get_channels(Self::dc_guild(guild))
            .await
            .map_err(Self::map_err)?;
        Ok(channels.iter().map(guild_channel_info).collect())
    }

    async fn member_roles(&self, guild: GuildId, user: UserId) -> Result<Vec<RoleId>> {
        let member = Self::dc_guild(guild)
            .member((&self.cache, self.http.as_ref()), Self::dc_user(user))
            .await
            .map_err(Self::delivery_err)?;
        Ok(member.roles.iter().map(|r| RoleId(r.get())).collect())
    }

    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        Self::dc_channel(msg.channel_id)
            .create_reaction(
                self.http.as_ref(),
                serenity::all::MessageId::new(msg.message_id.0),
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(Self::map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_overwrite_allows_participation() {
        let staff = PermissionOverwrite {
            target: OverwriteTarget::Role(RoleId(12)),
            allow: ChannelPermissions::PARTICIPATE,
            deny: ChannelPermissions::NONE,
        };
        let out = to_overwrite(GuildId(1), &staff);
        assert_eq!(
            out.allow,
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY
        );
        assert!(out.deny.is_empty());
        assert_eq!(
            out.kind,
            PermissionOverwriteType::Role(serenity::all::RoleId::new(12))
        );
    }

    #[test]
    fn everyone_overwrite_targets_guild_role() {
        let everyone = PermissionOverwrite {
            target: OverwriteTarget::Everyone,
            allow: ChannelPermissions::NONE,
            deny: ChannelPermissions::VIEW,
        };
        let out = to_overwrite(GuildId(77), &everyone);
        assert_eq!(out.deny, Permissions::VIEW_CHANNEL);
        assert_eq!(
            out.kind,
            PermissionOverwriteType::Role(serenity::all::RoleId::new(77))
        );
    }

    #[test]
    fn channel_kinds() {
        assert_eq!(channel_kind(ChannelType::Text), ChannelKind::Text);
        assert_eq!(channel_kind(ChannelType::Category), ChannelKind::Category);
        assert_eq!(channel_kind(ChannelType::Private), ChannelKind::Direct);
        assert_eq!(channel_kind(ChannelType::Voice), ChannelKind::Other);
    }
}
