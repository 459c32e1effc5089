use serenity::all::{CommandDataOptionValue, CommandInteraction, Context, EditInteractionResponse};

use modmail_core::{
    domain::{ChannelId, RoleId},
    messaging::types::{CommandInvocation, CommandOption, CommandValue},
};

use super::message::author_from;
use crate::router::AppState;

pub(crate) fn invocation_from(cmd: &CommandInteraction) -> CommandInvocation {
    let mut invoker = author_from(&cmd.user);
    if let Some(nick) = cmd.member.as_ref().and_then(|m| m.nick.clone()) {
        invoker.display_name = Some(nick);
    }

    let is_admin = cmd
        .member
        .as_ref()
        .and_then(|m| m.permissions)
        .map(|p| p.administrator())
        .unwrap_or(false);

    let options = cmd
        .data
        .options
        .iter()
        .filter_map(|o| {
            let value = match &o.value {
                CommandDataOptionValue::Channel(id) => CommandValue::Channel(ChannelId(id.get())),
                CommandDataOptionValue::Role(id) => CommandValue::Role(RoleId(id.get())),
                CommandDataOptionValue::String(s) => CommandValue::Text(s.clone()),
                _ => return None,
            };
            Some(CommandOption {
                name: o.name.clone(),
                value,
            })
        })
        .collect();

    CommandInvocation {
        name: cmd.data.name.clone(),
        channel_id: ChannelId(cmd.channel_id.get()),
        invoker,
        is_admin,
        options,
    }
}

pub async fn handle_command(ctx: &Context, cmd: &CommandInteraction, state: &AppState) {
    // Ticket teardown can outlive the 3s response window; acknowledge first.
    if let Err(e) = cmd.defer_ephemeral(&ctx.http).await {
        tracing::warn!(command = %cmd.data.name, error = %e, "failed to acknowledge command");
        return;
    }

    let reply = state
        .relay(ctx)
        .handle_command(&invocation_from(cmd))
        .await;

    if let Err(e) = cmd
        .edit_response(&ctx.http, EditInteractionResponse::new().content(reply.content))
        .await
    {
        // Expected after `delete`: the channel the reply belonged to is gone.
        tracing::debug!(command = %cmd.data.name, error = %e, "failed to send command reply");
    }
}
