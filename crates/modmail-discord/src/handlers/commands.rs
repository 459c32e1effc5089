//! Slash command registration for the configured guild.

use serenity::all::{
    ChannelType, CommandOptionType, CreateCommand, CreateCommandOption, Http, Permissions,
};

use modmail_core::{commands as names, domain::GuildId};

pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(names::SETUP)
            .description("Show the current ModMail configuration.")
            .default_member_permissions(Permissions::ADMINISTRATOR),
        CreateCommand::new(names::SET_CONFIG)
            .description("Set the ticket category, log channel and staff role.")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    names::OPT_CATEGORY,
                    "Category where ticket channels are created",
                )
                .channel_types(vec![ChannelType::Category])
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    names::OPT_LOG_CHANNEL,
                    "Channel that receives ticket close logs",
                )
                .channel_types(vec![ChannelType::Text])
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Role,
                    names::OPT_STAFF_ROLE,
                    "Role that can see and answer tickets",
                )
                .required(true),
            ),
        CreateCommand::new(names::CLAIM).description("Claim this ticket."),
        CreateCommand::new(names::CLOSE)
            .description("Close this ticket. The channel is kept.")
            .add_option(reason_option()),
        CreateCommand::new(names::DELETE)
            .description("Close this ticket and delete the channel.")
            .add_option(reason_option()),
    ]
}

fn reason_option() -> CreateCommandOption {
    CreateCommandOption::new(
        CommandOptionType::String,
        names::OPT_REASON,
        "Reason shown to the user and in the log",
    )
    .max_length(names::MAX_REASON_CHARS as u16)
    .required(false)
}

pub async fn register(http: &Http, guild: GuildId) {
    let guild_id = serenity::all::GuildId::new(guild.0);
    match guild_id.set_commands(http, definitions()).await {
        Ok(cmds) => tracing::info!(guild_id = guild.0, count = cmds.len(), "slash commands registered"),
        Err(e) => tracing::error!(guild_id = guild.0, error = %e, "failed to register slash commands"),
    }
}

/// Remove every command this bot registered in the guild.
pub async fn deregister(http: &Http, guild: GuildId) {
    let guild_id = serenity::all::GuildId::new(guild.0);
    match guild_id.set_commands(http, Vec::new()).await {
        Ok(_) => tracing::info!(guild_id = guild.0, "slash commands removed"),
        Err(e) => tracing::warn!(guild_id = guild.0, error = %e, "failed to remove slash commands"),
    }
}

