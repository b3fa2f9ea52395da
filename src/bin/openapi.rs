use memcookie::cache::local::LocalStore;
use memcookie::config::{CacheBackend, Config, Cookie};
use memcookie::handler::State;
use memcookie::http;
use memcookie::identity::IdentitySources;
use std::io::Write;
use std::sync::Arc;

/// Write the OpenAPI specification to standard output.
fn main() {
    let cfg = Config {
        bind_address: String::new(),
        probe_bind_address: None,
        authsource: String::new(),
        cookie: Cookie {
            name: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
        },
        username: None,
        groups: None,
        memcache_host: String::new(),
        memcache_port: 0,
        cache_backend: CacheBackend::Local,
        trusted_domains: vec![],
        identity_provider: None,
    };
    let state = State::new(cfg, IdentitySources::default(), Arc::new(LocalStore::new()));
    let (_, openapi) = http::router::api(state);

    let data = openapi.to_pretty_json().expect("OpenAPI document should serialize");
    std::io::stdout().write_all(data.as_bytes()).expect("write OpenAPI document to stdout");
}
