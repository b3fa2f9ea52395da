use crate::helpers::identity::HeaderSource;
use memcookie::cache::local::LocalStore;
use memcookie::config::Config;
use memcookie::handler::State;
use memcookie::http::server::Server;
use memcookie::identity::IdentitySources;
use std::sync::Arc;

pub struct TestServer {
    server: Server,
    pub store: LocalStore,
}

impl TestServer {
    pub async fn new(cfg: Config) -> Self {
        let source = HeaderSource::new(cfg.auth_source());
        Self::new_with_source(cfg, source).await
    }

    pub async fn new_with_source(cfg: Config, source: HeaderSource) -> Self {
        let store = LocalStore::new();
        let mut sources = IdentitySources::default();
        sources.register(Arc::new(source));

        let state = State::new(cfg, sources, Arc::new(store.clone()));
        let server = Server::new_with_state(state).await.unwrap();

        Self { server, store }
    }

    pub fn address(&self) -> String {
        self.server.listener.local_addr().map(|addr| addr.to_string()).unwrap()
    }

    pub fn probe_address(&self) -> Option<String> {
        self.server.probe_listener.as_ref()?.local_addr().map(|addr| addr.to_string()).ok()
    }

    /// Serve in the background. The returned store handle shares entries with the running server.
    pub fn spawn(self) -> (String, LocalStore, tokio::task::JoinHandle<()>) {
        let address = self.address();
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            self.server.run().await;
        });
        (address, store, handle)
    }
}
