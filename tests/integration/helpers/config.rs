use memcookie::config::{CacheBackend, Config, Cookie};

pub const AUTH_SOURCE: &str = "default-sp";

pub fn mock() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        probe_bind_address: Some("127.0.0.1:0".to_string()),
        authsource: AUTH_SOURCE.to_string(),
        cookie: Cookie {
            name: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
        },
        username: Some("uid".to_string()),
        groups: None,
        memcache_host: "127.0.0.1".to_string(),
        memcache_port: 11211,
        cache_backend: CacheBackend::Local,
        trusted_domains: vec!["wiki.example.org".to_string()],
        identity_provider: None,
    }
}

pub fn mock_with_groups(groups: &str) -> Config {
    Config {
        groups: Some(groups.to_string()),
        ..mock()
    }
}
