//! In-memory user ↔ ticket-channel mapping.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{ChannelId, UserId},
    errors::Error,
    Result,
};

#[derive(Debug, Default)]
struct Tables {
    by_user: HashMap<UserId, ChannelId>,
    by_channel: HashMap<ChannelId, UserId>,
}

/// One-to-one mapping between users and their open ticket channels.
///
/// Both directions live under the same lock, so an insert or remove is never
/// observed half-applied.
#[derive(Debug, Default)]
pub struct TicketRegistry {
    inner: Mutex<Tables>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup_channel(&self, user: UserId) -> Option<ChannelId> {
        self.inner.lock().await.by_user.get(&user).copied()
    }

    pub async fn lookup_user(&self, channel: ChannelId) -> Option<UserId> {
        self.inner.lock().await.by_channel.get(&channel).copied()
    }

    /// Register a new ticket. Fails if either side is already mapped.
    pub async fn insert(&self, user: UserId, channel: ChannelId) -> Result<()> {
        let mut t = self.inner.lock().await;
        if let Some(&existing) = t.by_user.get(&user) {
            return Err(Error::TicketExists {
                user,
                channel: existing,
            });
        }
        if let Some(&owner) = t.by_channel.get(&channel) {
            return Err(Error::ChannelTaken {
                user: owner,
                channel,
            });
        }
        t.by_user.insert(user, channel);
        t.by_channel.insert(channel, user);
        Ok(())
    }

    /// Drop the entry for `channel`, returning its former owner. No-op if absent.
    pub async fn remove(&self, channel: ChannelId) -> Option<UserId> {
        let mut t = self.inner.lock().await;
        let user = t.by_channel.remove(&channel)?;
        t.by_user.remove(&user);
        Some(user)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.by_user.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Per-user async locks.
///
/// Held across the whole lookup → create channel → insert sequence so two
/// near-simultaneous DMs from one user cannot open two tickets.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map holds an idle lock; waiters and guards keep their own clone.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
