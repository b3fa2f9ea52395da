use crate::cache::{Error, Expiration, SessionStore, epoch_now_secs};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

const MAX_CAPACITY: u64 = 262144;

#[derive(Clone, Debug)]
pub struct StoredSession {
    pub value: String,
    pub expiration: Expiration,
    stored_at: u64,
}

/// Expire entries the way memcached would, counted from when they were stored.
pub struct StoredSessionExpiry;

impl Expiry<String, StoredSession> for StoredSessionExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredSession,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.expiration.ttl(value.stored_at)
    }
}

/// In-process session store, for running without a memcached server.
#[derive(Clone)]
pub struct LocalStore {
    sessions: Cache<String, StoredSession>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(MAX_CAPACITY)
                .expire_after(StoredSessionExpiry)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredSession> {
        self.sessions.get(key).await
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for LocalStore {
    async fn set(&self, key: &str, value: &str, expiration: Expiration) -> Result<(), Error> {
        let session = StoredSession {
            value: value.to_string(),
            expiration,
            stored_at: epoch_now_secs(),
        };
        self.sessions.insert(key.to_string(), session).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.sessions.remove(key).await.is_some())
    }
}
