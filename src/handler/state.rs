use crate::cache::SessionStore;
use crate::config::Config;
use crate::identity::jwt::{self, JwtSource};
use crate::identity::{IdentitySource, IdentitySources};
use crate::session::SessionLifecycle;
use crate::{cache, config};
use log::warn;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("set up session store: {0}")]
    SessionStore(#[from] config::Error),

    #[error("set up identity source: {0}")]
    IdentitySource(#[from] jwt::Error),
}

#[derive(Clone)]
pub struct State {
    pub cfg: Arc<Config>,
    pub sources: IdentitySources,
    pub store: Arc<dyn SessionStore>,
    pub lifecycle: Arc<SessionLifecycle>,
}

impl State {
    pub async fn from_config(cfg: Config) -> Result<Self, InitError> {
        let store = cache::from_config(&cfg)?;
        let mut sources = IdentitySources::default();

        if let Some(provider_cfg) = &cfg.identity_provider {
            let source = JwtSource::from_config(cfg.auth_source(), provider_cfg).await?;
            sources.register(Arc::new(source));
        } else {
            warn!(
                "No identity provider enabled; identity source '{}' is not registered",
                cfg.auth_source()
            );
        }

        Ok(Self::new(cfg, sources, store))
    }

    pub fn new(cfg: Config, sources: IdentitySources, store: Arc<dyn SessionStore>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            sources,
            store,
            lifecycle: Arc::new(SessionLifecycle::new()),
        }
    }

    pub fn identity_source(&self) -> Option<Arc<dyn IdentitySource>> {
        self.sources.get(self.cfg.auth_source())
    }
}
