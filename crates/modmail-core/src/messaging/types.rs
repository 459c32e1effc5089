use chrono::{DateTime, Utc};

use crate::domain::{ChannelId, MessageRef, RoleId, UserId};

/// Inbound event model.
///
/// Discord-specific fields stay in the Discord adapter.
#[derive(Clone, Debug)]
pub enum IncomingEvent {
    DirectMessage(InboundMessage),
    ChannelMessage(InboundMessage),
    SlashCommand(CommandInvocation),
}

#[derive(Clone, Debug)]
pub struct Author {
    pub id: UserId,
    /// Unique account name.
    pub username: String,
    /// Global display name, if the user set one.
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Clone, Debug)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("image"))
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub message: MessageRef,
    pub author: Author,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl InboundMessage {
    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }
}

/// A slash command as seen by the core.
#[derive(Clone, Debug)]
pub struct CommandInvocation {
    pub name: String,
    pub channel_id: ChannelId,
    pub invoker: Author,
    /// Whether the invoking member holds the administrator permission.
    pub is_admin: bool,
    pub options: Vec<CommandOption>,
}

#[derive(Clone, Debug)]
pub struct CommandOption {
    pub name: String,
    pub value: CommandValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandValue {
    Channel(ChannelId),
    Role(RoleId),
    Text(String),
}

/// Reply to a slash command. Always shown only to the invoker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
}

impl CommandReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Direct,
    Text,
    Category,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub parent: Option<ChannelId>,
    pub topic: Option<String>,
}

/// Who a permission overwrite applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteTarget {
    /// The guild's implicit @everyone role.
    Everyone,
    Role(RoleId),
}

/// Channel permissions the relay cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelPermissions {
    pub view: bool,
    pub send: bool,
    pub read_history: bool,
}

impl ChannelPermissions {
    pub const NONE: Self = Self {
        view: false,
        send: false,
        read_history: false,
    };
    pub const VIEW: Self = Self {
        view: true,
        send: false,
        read_history: false,
    };
    pub const PARTICIPATE: Self = Self {
        view: true,
        send: true,
        read_history: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: ChannelPermissions,
    pub deny: ChannelPermissions,
}

/// Request to create a guild text channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub parent: ChannelId,
    pub topic: Option<String>,
    pub overwrites: Vec<PermissionOverwrite>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

/// Platform-neutral rich message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
    pub image_url: Option<String>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}
