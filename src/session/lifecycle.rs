use async_trait::async_trait;
use axum_extra::extract::cookie::CookieJar;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cleanup run when a user logs out of an identity source.
#[async_trait]
pub trait LogoutHandler: Send + Sync {
    /// Handlers with the same id are registered at most once per identity source.
    fn id(&self) -> &str;

    /// Receives the cookies of the logout request and returns them with any changes applied.
    async fn logout(&self, cookies: CookieJar) -> CookieJar;
}

/// Logout handlers by identity source, in registration order.
#[derive(Default)]
pub struct SessionLifecycle {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn LogoutHandler>>>>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_logout_handler(&self, source: &str, handler: Arc<dyn LogoutHandler>) {
        {
            let handlers = self.handlers.read().await;
            if is_registered(handlers.get(source), handler.id()) {
                return;
            }
        }

        let mut handlers = self.handlers.write().await;
        let registered = handlers.entry(source.to_string()).or_default();
        if !is_registered(Some(registered), handler.id()) {
            debug!("Registered logout handler '{}' for '{source}'", handler.id());
            registered.push(handler);
        }
    }

    pub async fn logout(&self, source: &str, cookies: CookieJar) -> CookieJar {
        let handlers = self.handlers.read().await.get(source).cloned().unwrap_or_default();

        let mut cookies = cookies;
        for handler in handlers {
            cookies = handler.logout(cookies).await;
        }
        cookies
    }

    pub async fn handler_count(&self, source: &str) -> usize {
        self.handlers.read().await.get(source).map_or(0, Vec::len)
    }
}

fn is_registered(handlers: Option<&Vec<Arc<dyn LogoutHandler>>>, id: &str) -> bool {
    handlers.is_some_and(|handlers| handlers.iter().any(|h| h.id() == id))
}
