use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId, MessageRef, RoleId, UserId},
    messaging::types::{ChannelInfo, Embed, NewChannel},
    Result,
};

/// Chat-platform port.
///
/// Everything the relay needs from Discord goes through here so the routing and
/// lifecycle logic can run against an in-memory fake. Implementations do not
/// retry; a failed call is reported to whoever triggered it.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Open (or reuse) the DM surface for `user`. Fails if the user disallows DMs.
    async fn open_direct_channel(&self, user: UserId) -> Result<ChannelId>;

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageRef>;
    async fn send_embed(&self, channel: ChannelId, embed: Embed) -> Result<MessageRef>;

    async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<ChannelId>;
    async fn delete_channel(&self, channel: ChannelId) -> Result<()>;
    async fn set_channel_topic(&self, channel: ChannelId, topic: &str) -> Result<()>;

    /// Channel kind and parent category. Cache first, remote fetch on a miss.
    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo>;

    /// All channels of the guild, used to rebuild the registry after a restart.
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>>;

    /// Role set of a guild member. Cache first, remote fetch on a miss.
    async fn member_roles(&self, guild: GuildId, user: UserId) -> Result<Vec<RoleId>>;

    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()>;
}

/// Open a DM with `user` and send `embed` into it.
pub async fn send_direct_embed(
    platform: &dyn ChatPlatform,
    user: UserId,
    embed: Embed,
) -> Result<MessageRef> {
    let dm = platform.open_direct_channel(user).await?;
    platform.send_embed(dm, embed).await
}
