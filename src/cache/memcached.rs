use crate::cache::{Error, Expiration, SessionStore};
use crate::config;
use crate::config::Config;
use crate::telemetry::record_cache_operation_latency;
use async_trait::async_trait;
use log::debug;
use std::time::Instant;
use tracing::instrument;

/// Memcached servers shared with mod_auth_memcookie.
///
/// A client is connected for every operation. The `memcache` client is blocking, so
/// operations run on tokio's blocking pool.
#[derive(Clone, Debug)]
pub struct Memcached {
    servers: Vec<String>,
}

impl Memcached {
    pub fn from_config(cfg: &Config) -> Result<Self, config::Error> {
        let servers = cfg.memcache_servers()?;
        debug!("Using memcached servers {servers:?}");
        Ok(Self { servers })
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn connect(servers: Vec<String>) -> Result<memcache::Client, Error> {
        memcache::Client::connect(servers).map_err(Error::Connect)
    }
}

#[async_trait]
impl SessionStore for Memcached {
    #[instrument(skip_all, name = "Store session in memcached", err, fields(
        memcookie.cache_expiration = expiration.0,
    ))]
    async fn set(&self, key: &str, value: &str, expiration: Expiration) -> Result<(), Error> {
        let servers = self.servers.clone();
        let key = key.to_string();
        let value = value.to_string();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            Self::connect(servers)?.set(&key, value.as_str(), expiration.0).map_err(Error::Set)
        })
        .await?;

        record_cache_operation_latency("set", started.elapsed());
        result
    }

    #[instrument(skip_all, name = "Delete session from memcached", err)]
    async fn delete(&self, key: &str) -> Result<bool, Error> {
        let servers = self.servers.clone();
        let key = key.to_string();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            Self::connect(servers)?.delete(&key).map_err(Error::Delete)
        })
        .await?;

        record_cache_operation_latency("delete", started.elapsed());
        result
    }
}
