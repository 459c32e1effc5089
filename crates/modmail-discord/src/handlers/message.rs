use serenity::all::{Context, Message, User};

use modmail_core::{
    domain::{ChannelId, MessageId, MessageRef, UserId},
    messaging::types::{Attachment, Author, IncomingEvent, InboundMessage},
};

use crate::router::AppState;

pub(crate) fn author_from(user: &User) -> Author {
    Author {
        id: UserId(user.id.get()),
        username: user.name.clone(),
        display_name: user.global_name.clone(),
        avatar_url: Some(user.face()),
    }
}

pub(crate) fn inbound_from(msg: &Message) -> InboundMessage {
    InboundMessage {
        message: MessageRef {
            channel_id: ChannelId(msg.channel_id.get()),
            message_id: MessageId(msg.id.get()),
        },
        author: author_from(&msg.author),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
    }
}

/// DMs have no guild id.
pub(crate) fn to_event(msg: &Message) -> IncomingEvent {
    let inbound = inbound_from(msg);
    if msg.guild_id.is_none() {
        IncomingEvent::DirectMessage(inbound)
    } else {
        IncomingEvent::ChannelMessage(inbound)
    }
}

pub async fn handle_message(ctx: &Context, msg: &Message, state: &AppState) {
    // Other bots never open tickets or answer them.
    if msg.author.bot {
        return;
    }
    if let Some(guild) = msg.guild_id {
        if guild.get() != state.cfg.guild_id.0 {
            return;
        }
    }

    let relay = state.relay(ctx);
    match relay.handle(to_event(msg)).await {
        Ok(outcome) => tracing::debug!(message_id = msg.id.get(), ?outcome, "message handled"),
        Err(e) => tracing::warn!(
            channel_id = msg.channel_id.get(),
            user_id = msg.author.id.get(),
            error = %e,
            "failed to handle message"
        ),
    }
}
