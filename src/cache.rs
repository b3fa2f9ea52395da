use crate::config;
use crate::config::{CacheBackend, Config};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub mod local;
pub mod memcached;

/// Memcached treats expirations up to 30 days as relative seconds, anything larger as a unix timestamp.
const MAX_RELATIVE_EXPIRATION_SECS: u32 = 60 * 60 * 24 * 30;

/// Entry expiration in memcached's own encoding. Zero never expires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Expiration(pub u32);

impl Expiration {
    pub const NEVER: Expiration = Expiration(0);

    pub fn from_unix_timestamp(expire: Option<u64>) -> Self {
        match expire {
            None => Self::NEVER,
            Some(timestamp) => Self(u32::try_from(timestamp).unwrap_or(u32::MAX)),
        }
    }

    /// Remaining lifetime at `now` (unix seconds). `None` means the entry never expires.
    pub fn ttl(&self, now: u64) -> Option<Duration> {
        match self.0 {
            0 => None,
            relative if relative <= MAX_RELATIVE_EXPIRATION_SECS => {
                Some(Duration::from_secs(u64::from(relative)))
            }
            absolute => Some(Duration::from_secs(u64::from(absolute).saturating_sub(now))),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("connect to memcached: {0}")]
    Connect(memcache::MemcacheError),

    #[error("store session: {0}")]
    Set(memcache::MemcacheError),

    #[error("delete session: {0}")]
    Delete(memcache::MemcacheError),

    #[error("cache operation did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Where session records live. Entries are written once and deleted on logout, never read back.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, expiration: Expiration) -> Result<(), Error>;

    /// Returns whether an entry was removed. A missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, Error>;
}

pub fn from_config(cfg: &Config) -> Result<Arc<dyn SessionStore>, config::Error> {
    Ok(match cfg.cache_backend {
        CacheBackend::Memcached => Arc::new(memcached::Memcached::from_config(cfg)?),
        CacheBackend::Local => Arc::new(local::LocalStore::new()),
    })
}

pub fn epoch_now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or_default()
}
