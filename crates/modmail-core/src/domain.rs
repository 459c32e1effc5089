use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discord user id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Discord channel id (snowflake). Categories and DM channels use the same id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Discord role id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u64);

/// Discord guild id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub u64);

/// Discord message id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Milliseconds between the Unix epoch and the first second of 2015.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Decode the creation time embedded in a snowflake.
pub fn snowflake_created_at(id: u64) -> Option<DateTime<Utc>> {
    if id == 0 {
        return None;
    }
    let ms = (id >> 22).checked_add(DISCORD_EPOCH_MS)?;
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(ms).ok()?)
}

impl UserId {
    pub fn created_at(self) -> Option<DateTime<Utc>> {
        snowflake_created_at(self.0)
    }

    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_snowflake() {
        // Example id from the Discord developer documentation.
        let ts = snowflake_created_at(175_928_847_299_117_063).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn zero_snowflake_is_undecodable() {
        assert!(UserId(0).created_at().is_none());
    }

    #[test]
    fn mentions() {
        assert_eq!(UserId(42).mention(), "<@42>");
        assert_eq!(ChannelId(7).mention(), "<#7>");
    }
}
