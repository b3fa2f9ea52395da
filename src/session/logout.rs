use crate::cache::SessionStore;
use crate::config::Config;
use crate::session::lifecycle::LogoutHandler;
use crate::telemetry::inc_logouts;
use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{debug, warn};
use std::sync::Arc;
use tracing::instrument;

/// Deletes the memcached entry behind the session cookie and clears the cookie.
pub struct CacheCleanup {
    cfg: Arc<Config>,
    store: Arc<dyn SessionStore>,
}

impl CacheCleanup {
    pub const ID: &'static str = "memcookie:cache-cleanup";

    pub fn new(cfg: Arc<Config>, store: Arc<dyn SessionStore>) -> Self {
        Self { cfg, store }
    }
}

#[async_trait]
impl LogoutHandler for CacheCleanup {
    fn id(&self) -> &str {
        Self::ID
    }

    #[instrument(skip_all, name = "Remove memcookie session")]
    async fn logout(&self, cookies: CookieJar) -> CookieJar {
        let name = match self.cfg.cookie_name() {
            Ok(name) => name,
            Err(err) => {
                warn!("Skipping session cleanup: {err}");
                return cookies;
            }
        };

        let Some(session_id) = cookies.get(name).map(|cookie| cookie.value().to_string()) else {
            return cookies;
        };

        match self.store.delete(&session_id).await {
            Ok(true) => debug!("Deleted session from cache"),
            Ok(false) => debug!("Session was already gone from cache"),
            Err(err) => warn!("Failed to delete session from cache: {err}"),
        }
        inc_logouts();

        let mut removal = Cookie::build((name.to_string(), "")).path(self.cfg.cookie.path.clone());
        if let Some(domain) = &self.cfg.cookie.domain {
            removal = removal.domain(domain.clone());
        }
        cookies.remove(removal)
    }
}
