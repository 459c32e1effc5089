//! Slash command parsing and dispatch.

use crate::{
    config::{SettingsStore, TicketSettings},
    domain::{ChannelId, GuildId, RoleId},
    errors::Error,
    messaging::{
        port::ChatPlatform,
        types::{CommandInvocation, CommandReply, CommandValue},
    },
    registry::TicketRegistry,
    tickets::{CloseMode, CloseReport, TicketManager, DEFAULT_CLOSE_REASON},
    Result,
};

pub const SETUP: &str = "modmail-setup";
pub const SET_CONFIG: &str = "modmail-set-config";
pub const CLAIM: &str = "claim";
pub const CLOSE: &str = "close";
pub const DELETE: &str = "delete";

pub const OPT_CATEGORY: &str = "category";
pub const OPT_LOG_CHANNEL: &str = "log-channel";
pub const OPT_STAFF_ROLE: &str = "staff-role";
pub const OPT_REASON: &str = "reason";
/// Longest reason kept; it must fit an embed field value.
pub const MAX_REASON_CHARS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Setup,
    SetConfig {
        category: Option<ChannelId>,
        log_channel: Option<ChannelId>,
        staff_role: Option<RoleId>,
    },
    Claim,
    Close {
        reason: Option<String>,
    },
    Delete {
        reason: Option<String>,
    },
}

impl Command {
    pub fn parse(inv: &CommandInvocation) -> Option<Self> {
        let channel = |name: &str| {
            inv.options.iter().find_map(|o| match &o.value {
                CommandValue::Channel(c) if o.name == name => Some(*c),
                _ => None,
            })
        };
        let role = |name: &str| {
            inv.options.iter().find_map(|o| match &o.value {
                CommandValue::Role(r) if o.name == name => Some(*r),
                _ => None,
            })
        };
        let reason = || {
            inv.options.iter().find_map(|o| match &o.value {
                CommandValue::Text(t) if o.name == OPT_REASON && !t.trim().is_empty() => {
                    Some(t.trim().chars().take(MAX_REASON_CHARS).collect())
                }
                _ => None,
            })
        };

        match inv.name.as_str() {
            SETUP => Some(Command::Setup),
            SET_CONFIG => Some(Command::SetConfig {
                category: channel(OPT_CATEGORY),
                log_channel: channel(OPT_LOG_CHANNEL),
                staff_role: role(OPT_STAFF_ROLE),
            }),
            CLAIM => Some(Command::Claim),
            CLOSE => Some(Command::Close { reason: reason() }),
            DELETE => Some(Command::Delete { reason: reason() }),
            _ => None,
        }
    }

    fn requires_admin(&self) -> bool {
        matches!(self, Command::Setup | Command::SetConfig { .. })
    }
}

fn show_id(id: Option<u64>) -> String {
    match id {
        Some(v) => format!("`{v}`"),
        None => "`not set`".to_string(),
    }
}

fn describe_settings(bullet: char, s: &TicketSettings) -> String {
    format!(
        "{bullet} Category ID: {}\n{bullet} Log Channel ID: {}\n{bullet} Staff Role ID: {}",
        show_id(s.category_id.map(|c| c.0)),
        show_id(s.log_channel_id.map(|c| c.0)),
        show_id(s.staff_role_id.map(|r| r.0)),
    )
}

pub struct Dispatcher<'a> {
    pub platform: &'a dyn ChatPlatform,
    pub registry: &'a TicketRegistry,
    pub settings: &'a SettingsStore,
    pub guild_id: GuildId,
}

impl Dispatcher<'_> {
    /// Run a command and produce the (ephemeral) reply for its invoker.
    pub async fn dispatch(&self, inv: &CommandInvocation) -> CommandReply {
        let Some(cmd) = Command::parse(inv) else {
            tracing::debug!(name = %inv.name, "unknown command");
            return CommandReply::new("Unknown command.");
        };

        match self.run(&cmd, inv).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(command = %inv.name, user_id = inv.invoker.id.0, error = %e, "command failed");
                CommandReply::new(e.user_message())
            }
        }
    }

    async fn run(&self, cmd: &Command, inv: &CommandInvocation) -> Result<CommandReply> {
        if cmd.requires_admin() && !inv.is_admin {
            return Err(Error::PermissionDenied(format!(
                "{} requires administrator",
                inv.name
            )));
        }

        match cmd {
            Command::Setup => {
                let s = self.settings.snapshot().await;
                Ok(CommandReply::new(format!(
                    "✅ **Current Config Status:**\n{}\n\nUse `/{SET_CONFIG}` to change these settings.",
                    describe_settings('-', &s)
                )))
            }
            Command::SetConfig {
                category,
                log_channel,
                staff_role,
            } => {
                let saved = self
                    .settings
                    .update(TicketSettings {
                        category_id: *category,
                        log_channel_id: *log_channel,
                        staff_role_id: *staff_role,
                    })
                    .await?;
                tracing::info!(user_id = inv.invoker.id.0, "modmail configuration updated");
                let ready = if saved.is_complete() {
                    "The bot is ready to receive DMs!"
                } else {
                    "Category and staff role are both required before tickets can be opened."
                };
                Ok(CommandReply::new(format!(
                    "✅ **ModMail Configuration Updated!**\n{}\n\nThe changes are now persistent. {ready}",
                    describe_settings('*', &saved)
                )))
            }
            Command::Claim => {
                self.ensure_ticket_channel(inv.channel_id).await?;
                self.platform
                    .send_text(
                        inv.channel_id,
                        &format!(
                            "🙋 **{}** has claimed this ticket.",
                            inv.invoker.shown_name()
                        ),
                    )
                    .await?;
                Ok(CommandReply::new("✅ Ticket claimed."))
            }
            Command::Close { reason } => {
                let settings = self.ensure_ticket_channel(inv.channel_id).await?;
                let report = self
                    .close(inv, CloseMode::Close, reason.as_deref(), &settings)
                    .await?;
                if let Err(e) = self
                    .platform
                    .send_text(
                        inv.channel_id,
                        &format!(
                            "🔒 This ticket was closed by **{}**. Messages here are no longer relayed.",
                            inv.invoker.shown_name()
                        ),
                    )
                    .await
                {
                    tracing::warn!(channel_id = inv.channel_id.0, error = %e, "failed to post close notice");
                }
                Ok(CommandReply::new(format!(
                    "✅ Ticket closed.{}",
                    report_note(&report)
                )))
            }
            Command::Delete { reason } => {
                let settings = self.ensure_ticket_channel(inv.channel_id).await?;
                let report = self
                    .close(inv, CloseMode::Delete, reason.as_deref(), &settings)
                    .await?;
                Ok(CommandReply::new(format!(
                    "🗑️ Ticket deleted.{}",
                    report_note(&report)
                )))
            }
        }
    }

    async fn close(
        &self,
        inv: &CommandInvocation,
        mode: CloseMode,
        reason: Option<&str>,
        settings: &TicketSettings,
    ) -> Result<CloseReport> {
        TicketManager::new(self.platform, self.registry, self.guild_id)
            .close_ticket(
                inv.channel_id,
                &inv.invoker,
                mode,
                reason.unwrap_or(DEFAULT_CLOSE_REASON),
                settings,
            )
            .await
    }

    /// Settings snapshot, if `channel` sits under the configured ticket category.
    async fn ensure_ticket_channel(&self, channel: ChannelId) -> Result<TicketSettings> {
        let settings = self.settings.snapshot().await;
        let Some(category) = settings.category_id else {
            return Err(Error::Scope("ticket category is not configured".into()));
        };
        let info = self.platform.channel_info(channel).await?;
        if info.parent != Some(category) {
            return Err(Error::Scope(format!("channel {} is outside the ticket category", channel.0)));
        }
        Ok((*settings).clone())
    }
}

fn report_note(report: &CloseReport) -> &'static str {
    match (report.owner, report.owner_notified) {
        (None, _) => " No user was linked to this channel.",
        (Some(_), false) => " The user could not be notified.",
        (Some(_), true) => "",
    }
}
