use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const MEMCACHED_PORT: u16 = 11211;

pub struct RuntimeParams {
    _container: ContainerAsync<GenericImage>,
    pub host: String,
    pub port: u16,
}

impl RuntimeParams {
    /// Runs memcached in Docker, no external setup needed
    pub async fn init() -> RuntimeParams {
        let container = GenericImage::new("memcached", "1.6-alpine")
            .with_exposed_port(MEMCACHED_PORT.tcp())
            .with_wait_for(WaitFor::seconds(1))
            .start()
            .await
            .unwrap();
        let host = container.get_host().await.unwrap().to_string();
        let port = container.get_host_port_ipv4(MEMCACHED_PORT).await.unwrap();

        let params = Self {
            _container: container,
            host,
            port,
        };
        params.wait_until_ready().await;
        params
    }

    fn url(&self) -> String {
        format!("memcache://{}:{}", self.host, self.port)
    }

    async fn wait_until_ready(&self) {
        for _ in 0..50 {
            let ready = memcache::Client::connect(vec![self.url()])
                .and_then(|client| client.version())
                .is_ok();
            if ready {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("memcached at {} did not become ready", self.url());
    }

    /// Reads an entry the way mod_auth_memcookie does, bypassing the bridge.
    pub fn get(&self, key: &str) -> Option<String> {
        let client = memcache::Client::connect(vec![self.url()]).unwrap();
        client.get(key).unwrap()
    }
}
