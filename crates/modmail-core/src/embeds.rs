//! Embed builders for everything the relay posts.

use chrono::{DateTime, Utc};

use crate::{
    domain::{ChannelId, UserId},
    messaging::types::{Attachment, Author, Embed, InboundMessage},
    tickets::CloseMode,
};

pub const COLOR_OPENED: u32 = 0x00FF00;
pub const COLOR_USER: u32 = 0x3498DB;
pub const COLOR_STAFF: u32 = 0x5865F2;
pub const COLOR_CLOSED: u32 = 0xE67E22;
pub const COLOR_DELETED: u32 = 0xE74C3C;

/// "2 Jan 2006" style date.
pub fn format_day(at: DateTime<Utc>) -> String {
    at.format("%-d %b %Y").to_string()
}

pub fn ticket_opened(user: &Author, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Embed {
    Embed::new()
        .title("🚨 New ModMail Ticket Opened")
        .description(format!(
            "A new support ticket has been opened by **{}** ({}).",
            user.username,
            user.id.mention()
        ))
        .field("User ID", user.id.0.to_string(), true)
        .field("Joined Discord", format_day(created_at), true)
        .color(COLOR_OPENED)
        .timestamp(now)
}

/// User DM mirrored into the ticket channel.
pub fn user_message(msg: &InboundMessage, now: DateTime<Utc>) -> Embed {
    let embed = Embed::new()
        .author(msg.author.shown_name(), msg.author.avatar_url.clone())
        .color(COLOR_USER)
        .footer(format!("User ID: {}", msg.author.id.0))
        .timestamp(now);
    with_body(embed, &msg.content, &msg.attachments)
}

/// Staff message mirrored into the user's DM.
pub fn staff_reply(msg: &InboundMessage, now: DateTime<Utc>) -> Embed {
    let embed = Embed::new()
        .title("Staff Reply")
        .author(msg.author.shown_name(), msg.author.avatar_url.clone())
        .color(COLOR_STAFF)
        .timestamp(now);
    with_body(embed, &msg.content, &msg.attachments)
}

/// DM sent to the ticket owner when staff close or delete the ticket.
pub fn close_notice(actor: &Author, mode: CloseMode, reason: &str, now: DateTime<Utc>) -> Embed {
    let follow_up = match mode {
        CloseMode::Close => "Send me another message any time to open a new ticket.",
        CloseMode::Delete => "The ticket has been permanently removed.",
    };
    Embed::new()
        .title(format!("Your ticket has been {}", mode.verb()))
        .description(format!(
            "Your ticket was {} by **{}**.\n{follow_up}",
            mode.verb(),
            actor.shown_name()
        ))
        .field("Reason", reason, false)
        .color(mode_color(mode))
        .timestamp(now)
}

/// The single log-channel entry written when a ticket ends.
pub fn close_log(
    owner: Option<UserId>,
    channel: ChannelId,
    actor: &Author,
    mode: CloseMode,
    reason: &str,
    now: DateTime<Utc>,
) -> Embed {
    let user = match owner {
        Some(u) => format!("{} ({})", u.mention(), u.0),
        None => "unknown (no active mapping)".to_string(),
    };
    Embed::new()
        .title(format!("Ticket {}", mode.verb()))
        .field("User", user, true)
        .field("Channel", format!("{} ({})", channel.mention(), channel.0), true)
        .field(
            format!("{} by", capitalize(mode.verb())),
            format!("{} ({})", actor.username, actor.id.0),
            true,
        )
        .field("Reason", reason, false)
        .color(mode_color(mode))
        .timestamp(now)
}

/// Body text plus the first attachment. Further attachments are dropped.
fn with_body(mut embed: Embed, content: &str, attachments: &[Attachment]) -> Embed {
    if !content.trim().is_empty() {
        embed = embed.description(content);
    }
    let Some(first) = attachments.first() else {
        return embed;
    };
    if first.is_image() {
        embed.image(first.url.clone())
    } else {
        embed.field(
            "Attachment",
            format!("[{}]({})", first.filename, first.url),
            false,
        )
    }
}

fn mode_color(mode: CloseMode) -> u32 {
    match mode {
        CloseMode::Close => COLOR_CLOSED,
        CloseMode::Delete => COLOR_DELETED,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
