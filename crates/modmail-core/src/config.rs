use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    domain::{ChannelId, GuildId, RoleId},
    errors::Error,
    Result,
};

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_SETTINGS_FILE: &str = "config.json";
pub const DEFAULT_STATUS: &str = "DM me for support!";

/// Process configuration, fixed at start.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_bot_token: String,
    pub guild_id: GuildId,
    pub http_port: u16,
    pub settings_path: PathBuf,
    pub status_text: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_env_file(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_bot_token = get("DISCORD_BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("DISCORD_BOT_TOKEN environment variable not set".to_string())
        })?;

        let raw_guild = get("DISCORD_GUILD_ID").and_then(non_empty).ok_or_else(|| {
            Error::Config("DISCORD_GUILD_ID environment variable not set".to_string())
        })?;
        let guild_id = parse_snowflake(&raw_guild).map(GuildId).ok_or_else(|| {
            Error::Config(format!("DISCORD_GUILD_ID is not a valid id: {raw_guild}"))
        })?;

        let http_port = match get("PORT").and_then(non_empty) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {raw}")))?,
            None => DEFAULT_HTTP_PORT,
        };

        let settings_path = PathBuf::from(
            get("MODMAIL_CONFIG_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string()),
        );
        let status_text = get("MODMAIL_STATUS")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        Ok(Self {
            discord_bot_token,
            guild_id,
            http_port,
            settings_path,
            status_text,
        })
    }
}

/// Admin-settable ticket settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSettings {
    #[serde(default)]
    pub category_id: Option<ChannelId>,
    #[serde(default)]
    pub log_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub staff_role_id: Option<RoleId>,
}

impl TicketSettings {
    /// Both the category and the staff role are required before tickets can be opened.
    pub fn is_complete(&self) -> bool {
        self.category_id.is_some() && self.staff_role_id.is_some()
    }

    /// Zero ids come from hand-edited files; treat them as unset.
    fn normalized(self) -> Self {
        Self {
            category_id: self.category_id.filter(|c| c.0 != 0),
            log_channel_id: self.log_channel_id.filter(|c| c.0 != 0),
            staff_role_id: self.staff_role_id.filter(|r| r.0 != 0),
        }
    }
}

/// On-disk shape of the settings file.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    guild_id: Option<GuildId>,
    #[serde(flatten)]
    settings: TicketSettings,
}

/// Holds the current `TicketSettings` snapshot and persists every update.
///
/// Readers get an `Arc` snapshot; an update writes the file first and only then
/// swaps the snapshot, so memory never runs ahead of disk.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    guild_id: Option<GuildId>,
    current: RwLock<Arc<TicketSettings>>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing or unreadable file yields empty settings.
    pub fn load(path: impl Into<PathBuf>, guild_id: GuildId) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<SettingsFile>(&raw) {
                Ok(file) => {
                    tracing::info!(path = %path.display(), "settings loaded");
                    file.settings.normalized()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "settings file is malformed; starting unconfigured");
                    TicketSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "settings file not found; it will be written after setup");
                TicketSettings::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings file; starting unconfigured");
                TicketSettings::default()
            }
        };

        Self {
            path: Some(path),
            guild_id: Some(guild_id),
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Store that never touches disk.
    pub fn in_memory(settings: TicketSettings) -> Self {
        Self {
            path: None,
            guild_id: None,
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub async fn snapshot(&self) -> Arc<TicketSettings> {
        self.current.read().await.clone()
    }

    /// Replace the settings wholesale.
    pub async fn update(&self, settings: TicketSettings) -> Result<Arc<TicketSettings>> {
        let settings = Arc::new(settings.normalized());
        let mut guard = self.current.write().await;
        if let Some(path) = &self.path {
            let file = SettingsFile {
                guild_id: self.guild_id,
                settings: (*settings).clone(),
            };
            write_atomic(path, &serde_json::to_vec_pretty(&file)?).await?;
            tracing::info!(path = %path.display(), "settings saved");
        }
        *guard = settings.clone();
        Ok(settings)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub fn parse_snowflake(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|v| *v != 0)
}

/// Load `path` into the process environment. Variables already set are kept.
fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to load env file"),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    #[test]
    fn env_file_does_not_override_existing_vars() {
        let path = tmp("modmail-env");
        fs::write(
            &path,
            "MODMAIL_TEST_ENV_KEPT=file\nMODMAIL_TEST_ENV_ADDED=\"file value\"\n",
        )
        .unwrap();
        env::set_var("MODMAIL_TEST_ENV_KEPT", "process");

        load_env_file(&path);

        assert_eq!(env::var("MODMAIL_TEST_ENV_KEPT").unwrap(), "process");
        assert_eq!(env::var("MODMAIL_TEST_ENV_ADDED").unwrap(), "file value");
        let _ = fs::remove_file(&path);
        load_env_file(&path);
    }

    #[test]
    fn env_defaults() {
        let cfg = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("DISCORD_GUILD_ID", "1234"),
        ]))
        .unwrap();
        assert_eq!(cfg.guild_id, GuildId(1234));
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(cfg.settings_path, PathBuf::from(DEFAULT_SETTINGS_FILE));
        assert_eq!(cfg.status_text, DEFAULT_STATUS);
    }

    #[test]
    fn missing_token_or_guild_is_fatal() {
        let err = Config::from_lookup(lookup(&[("DISCORD_GUILD_ID", "1")])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("DISCORD_BOT_TOKEN", "t")])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_GUILD_ID"));

        let err = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "t"),
            ("DISCORD_GUILD_ID", "abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("not a valid id"));
    }

    #[test]
    fn port_override() {
        let cfg = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "t"),
            ("DISCORD_GUILD_ID", "1"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.http_port, 9000);
    }

    #[test]
    fn completeness_needs_category_and_staff_role() {
        let mut s = TicketSettings::default();
        assert!(!s.is_complete());
        s.category_id = Some(ChannelId(1));
        assert!(!s.is_complete());
        s.staff_role_id = Some(RoleId(2));
        assert!(s.is_complete());
    }

    #[tokio::test]
    async fn missing_file_starts_unconfigured() {
        let path = tmp("modmail-missing");
        let store = SettingsStore::load(&path, GuildId(1));
        assert_eq!(*store.snapshot().await, TicketSettings::default());
    }

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let path = tmp("modmail-settings");
        let store = SettingsStore::load(&path, GuildId(9));
        let next = TicketSettings {
            category_id: Some(ChannelId(10)),
            log_channel_id: Some(ChannelId(11)),
            staff_role_id: Some(RoleId(12)),
        };
        store.update(next.clone()).await.unwrap();
        assert_eq!(*store.snapshot().await, next);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"guild_id\": 9"));
        assert!(!raw.contains("token"));

        let reloaded = SettingsStore::load(&path, GuildId(9));
        assert_eq!(*reloaded.snapshot().await, next);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_file_is_ignored() {
        let path = tmp("modmail-bad");
        std::fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::load(&path, GuildId(1));
        assert!(!store.snapshot().await.is_complete());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn zero_ids_are_unset() {
        let store = SettingsStore::in_memory(TicketSettings::default());
        let saved = store
            .update(TicketSettings {
                category_id: Some(ChannelId(0)),
                log_channel_id: None,
                staff_role_id: Some(RoleId(3)),
            })
            .await
            .unwrap();
        assert_eq!(saved.category_id, None);
        assert_eq!(saved.staff_role_id, Some(RoleId(3)));
    }
}
