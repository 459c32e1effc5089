use crate::domain::{ChannelId, UserId};

/// Core error type for the relay.
///
/// Adapter crates map their platform errors into `Delivery` or `External` so
/// the core can decide what the human on the other end gets to see.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("modmail configuration not complete")]
    ConfigIncomplete,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not a ticket channel: {0}")]
    Scope(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("user {user:?} already has ticket {channel:?}")]
    TicketExists { user: UserId, channel: ChannelId },

    #[error("channel {channel:?} is already owned by {user:?}")]
    ChannelTaken { user: UserId, channel: ChannelId },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Short text suitable for showing to the Discord user that triggered the failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::ConfigIncomplete => {
                "Sorry, I couldn't create a support ticket. Staff configuration may be incomplete."
            }
            Error::PermissionDenied(_) => "❌ You must be an administrator to run this command.",
            Error::Scope(_) => "❌ This command can only be used inside a ticket channel.",
            Error::Delivery(_) => {
                "⚠️ The message could not be delivered. The recipient may have DMs disabled."
            }
            _ => "⚠️ Something went wrong while processing that request.",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
