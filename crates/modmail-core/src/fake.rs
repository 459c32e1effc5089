//! Recording in-memory `ChatPlatform` for unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, RoleId, UserId},
    errors::Error,
    messaging::{
        port::ChatPlatform,
        types::{ChannelInfo, ChannelKind, Embed, NewChannel},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Text(String),
    Embed(Embed),
}

impl Sent {
    pub fn embed(&self) -> Option<&Embed> {
        match self {
            Sent::Embed(e) => Some(e),
            Sent::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Text(t) => Some(t),
            Sent::Embed(_) => None,
        }
    }
}

const DM_BASE: u64 = 9_000_000;

#[derive(Default)]
pub struct FakePlatform {
    next_id: AtomicU64,
    pub channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    pub roles: Mutex<HashMap<UserId, Vec<RoleId>>>,
    pub dm_blocked: Mutex<HashSet<UserId>>,
    pub created: Mutex<Vec<(GuildId, NewChannel, ChannelId)>>,
    pub deleted: Mutex<Vec<ChannelId>>,
    pub sent: Mutex<Vec<(ChannelId, Sent)>>,
    pub reactions: Mutex<Vec<(MessageRef, String)>>,
    pub fail_create: AtomicBool,
    pub create_delay: Mutex<Option<Duration>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1_000),
            ..Default::default()
        }
    }

    pub fn dm_of(user: UserId) -> ChannelId {
        ChannelId(DM_BASE + user.0)
    }

    pub fn add_channel(&self, id: ChannelId, parent: Option<ChannelId>, topic: Option<&str>) {
        self.channels.lock().unwrap().insert(
            id,
            ChannelInfo {
                id,
                kind: ChannelKind::Text,
                parent,
                topic: topic.map(str::to_string),
            },
        );
    }

    pub fn grant_roles(&self, user: UserId, roles: &[RoleId]) {
        self.roles.lock().unwrap().insert(user, roles.to_vec());
    }

    pub fn block_dms(&self, user: UserId) {
        self.dm_blocked.lock().unwrap().insert(user);
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn topic_of(&self, channel: ChannelId) -> Option<String> {
        self.channels
            .lock()
            .unwrap()
            .get(&channel)
            .and_then(|c| c.topic.clone())
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    fn alloc(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn record(&self, channel: ChannelId, sent: Sent) -> MessageRef {
        self.sent.lock().unwrap().push((channel, sent));
        MessageRef {
            channel_id: channel,
            message_id: MessageId(self.alloc()),
        }
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn open_direct_channel(&self, user: UserId) -> Result<ChannelId> {
        if self.dm_blocked.lock().unwrap().contains(&user) {
            return Err(Error::Delivery(format!("user {} does not accept DMs", user.0)));
        }
        Ok(Self::dm_of(user))
    }

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageRef> {
        Ok(self.record(channel, Sent::Text(text.to_string())))
    }

    async fn send_embed(&self, channel: ChannelId, embed: Embed) -> Result<MessageRef> {
        Ok(self.record(channel, Sent::Embed(embed)))
    }

    async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<ChannelId> {
        let delay = *self.create_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::External("missing permissions".into()));
        }
        let id = ChannelId(self.alloc());
        self.add_channel(id, Some(channel.parent), channel.topic.as_deref());
        self.created.lock().unwrap().push((guild, channel, id));
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        self.channels.lock().unwrap().remove(&channel);
        self.deleted.lock().unwrap().push(channel);
        Ok(())
    }

    async fn set_channel_topic(&self, channel: ChannelId, topic: &str) -> Result<()> {
        match self.channels.lock().unwrap().get_mut(&channel) {
            Some(info) => {
                info.topic = Some(topic.to_string());
                Ok(())
            }
            None => Err(Error::Delivery(format!("unknown channel {}", channel.0))),
        }
    }

    async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo> {
        if channel.0 >= DM_BASE {
            return Ok(ChannelInfo {
                id: channel,
                kind: ChannelKind::Direct,
                parent: None,
                topic: None,
            });
        }
        self.channels
            .lock()
            .unwrap()
            .get(&channel)
            .cloned()
            .ok_or_else(|| Error::Delivery(format!("unknown channel {}", channel.0)))
    }

    async fn guild_channels(&self, _guild: GuildId) -> Result<Vec<ChannelInfo>> {
        let mut all: Vec<ChannelInfo> = self.channels.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|c| c.id.0);
        Ok(all)
    }

    async fn member_roles(&self, _guild: GuildId, user: UserId) -> Result<Vec<RoleId>> {
        self.roles
            .lock()
            .unwrap()
            .get(&user)
            .cloned()
            .ok_or_else(|| Error::Delivery(format!("unknown member {}", user.0)))
    }

    async fn add_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        self.reactions.lock().unwrap().push((msg, emoji.to_string()));
        Ok(())
    }
}
