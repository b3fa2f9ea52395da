use crate::config::Error::{InvalidCookieName, MissingEnv, NoCacheServers, ParseBool, ParseInt};
use log::info;
use serde::Serialize;
use std::num::ParseIntError;
use std::str::ParseBoolError;
use thiserror::Error;

pub const DEFAULT_COOKIE_NAME: &str = "AuthMemCookie";
pub const DEFAULT_MEMCACHE_HOST: &str = "127.0.0.1";
pub const DEFAULT_MEMCACHE_PORT: u16 = 11211;

/// Process-wide settings. Built once at startup and shared read-only with every request.
#[derive(Serialize, Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub probe_bind_address: Option<String>,
    pub authsource: String,
    pub cookie: Cookie,
    pub username: Option<String>,
    pub groups: Option<String>,
    pub memcache_host: String,
    pub memcache_port: u16,
    pub cache_backend: CacheBackend,
    pub trusted_domains: Vec<String>,
    pub identity_provider: Option<IdentityProvider>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Cookie {
    /// Left unvalidated here; see [`Config::cookie_name`].
    pub name: Option<String>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memcached,
    Local,
}

#[derive(Serialize, Clone, Debug)]
pub struct IdentityProvider {
    pub issuer: String,
    pub jwks_uri: String,
    pub audience: Option<String>,
    pub token_cookie: Option<String>,
    pub login_url: Option<String>,
    pub logout_url: Option<String>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required environment variable '{0}'")]
    MissingEnv(String),

    #[error("parse boolean option '{0}': {1}")]
    ParseBool(String, ParseBoolError),

    #[error("parse integer option '{0}': {1}")]
    ParseInt(String, ParseIntError),

    #[error("option '{0}' has unknown value '{1}'")]
    UnknownValue(String, String),

    #[error(
        "configuration option 'cookiename' contains an invalid value; this option should be a non-empty string"
    )]
    InvalidCookieName,

    #[error("configuration option 'memcache.host' does not name any memcached server")]
    NoCacheServers,
}

impl Config {
    pub fn new_from_env() -> Result<Self, Error> {
        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or("127.0.0.1:3000".to_string()),
            probe_bind_address: std::env::var("PROBE_BIND_ADDRESS").ok(),
            authsource: must_read_env("MEMCOOKIE_AUTHSOURCE")?,
            cookie: Cookie {
                name: std::env::var("MEMCOOKIE_COOKIE_NAME").ok(),
                path: std::env::var("MEMCOOKIE_COOKIE_PATH").unwrap_or("/".to_string()),
                domain: std::env::var("MEMCOOKIE_COOKIE_DOMAIN").ok(),
                secure: read_bool_env("MEMCOOKIE_COOKIE_SECURE")?,
            },
            username: std::env::var("MEMCOOKIE_USERNAME").ok(),
            groups: std::env::var("MEMCOOKIE_GROUPS").ok(),
            memcache_host: std::env::var("MEMCOOKIE_MEMCACHE_HOST")
                .unwrap_or(DEFAULT_MEMCACHE_HOST.to_string()),
            memcache_port: match std::env::var("MEMCOOKIE_MEMCACHE_PORT") {
                Ok(port) => port
                    .parse()
                    .map_err(|err| ParseInt("MEMCOOKIE_MEMCACHE_PORT".to_string(), err))?,
                Err(_) => DEFAULT_MEMCACHE_PORT,
            },
            cache_backend: CacheBackend::from_env()?,
            trusted_domains: std::env::var("MEMCOOKIE_TRUSTED_DOMAINS")
                .map(|domains| split_list(&domains))
                .unwrap_or_default(),
            identity_provider: IdentityProvider::new_from_env()?,
        })
    }

    /// The identity source users must authenticate with.
    pub fn auth_source(&self) -> &str {
        &self.authsource
    }

    pub fn cookie_name(&self) -> Result<&str, Error> {
        match self.cookie.name.as_deref() {
            None => Ok(DEFAULT_COOKIE_NAME),
            Some("") => Err(InvalidCookieName),
            Some(name) => Ok(name),
        }
    }

    /// Name of the attribute holding the username.
    pub fn username_attribute(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Name of the attribute holding the groups the user is a member of.
    pub fn groups_attribute(&self) -> Option<&str> {
        self.groups.as_deref()
    }

    /// One memcached endpoint per comma-separated entry in `memcache.host`, all on the same port.
    pub fn memcache_servers(&self) -> Result<Vec<String>, Error> {
        let servers: Vec<String> = split_list(&self.memcache_host)
            .into_iter()
            .map(|host| format!("memcache://{host}:{}", self.memcache_port))
            .collect();

        if servers.is_empty() {
            return Err(NoCacheServers);
        }
        Ok(servers)
    }

    pub fn log_summary(&self) {
        info!("Identity source: {}", self.authsource);
        match self.cookie_name() {
            Ok(name) => info!("Session cookie: {name}"),
            Err(err) => log::warn!("{err}"),
        }
        info!("Cache backend: {:?}", self.cache_backend);
    }
}

impl CacheBackend {
    fn from_env() -> Result<Self, Error> {
        const KEY: &str = "MEMCOOKIE_CACHE_BACKEND";
        match std::env::var(KEY).as_deref() {
            Err(_) | Ok("memcached") => Ok(Self::Memcached),
            Ok("local") => Ok(Self::Local),
            Ok(other) => Err(Error::UnknownValue(KEY.to_string(), other.to_string())),
        }
    }
}

impl IdentityProvider {
    fn new_from_env() -> Result<Option<Self>, Error> {
        if !read_bool_env("IDP_ENABLED")? {
            return Ok(None);
        }
        Ok(Some(Self {
            issuer: must_read_env("IDP_ISSUER")?,
            jwks_uri: must_read_env("IDP_JWKS_URI")?,
            audience: std::env::var("IDP_AUDIENCE").ok(),
            token_cookie: std::env::var("IDP_TOKEN_COOKIE").ok(),
            login_url: std::env::var("IDP_LOGIN_URL").ok(),
            logout_url: std::env::var("IDP_LOGOUT_URL").ok(),
        }))
    }
}

fn must_read_env(env: &str) -> Result<String, Error> {
    std::env::var(env).map_err(|_| MissingEnv(env.to_string()))
}

fn read_bool_env(env: &str) -> Result<bool, Error> {
    let Ok(value) = std::env::var(env) else { return Ok(false) };

    value.parse().map_err(|err| ParseBool(env.to_string(), err))
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(String::from).collect()
}

#[cfg(test)]
impl Config {
    pub fn mock(authsource: &str) -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            probe_bind_address: Some("127.0.0.1:0".to_string()),
            authsource: authsource.to_string(),
            cookie: Cookie {
                name: Some(DEFAULT_COOKIE_NAME.to_string()),
                path: "/".to_string(),
                domain: None,
                secure: false,
            },
            username: Some("uid".to_string()),
            groups: None,
            memcache_host: DEFAULT_MEMCACHE_HOST.to_string(),
            memcache_port: DEFAULT_MEMCACHE_PORT,
            cache_backend: CacheBackend::Local,
            trusted_domains: vec![],
            identity_provider: None,
        }
    }
}
