use crate::helpers::config;
use crate::helpers::docker::RuntimeParams;
use memcookie::cache::memcached::Memcached;
use memcookie::cache::{Expiration, SessionStore, epoch_now_secs};
use memcookie::config::{CacheBackend, Config};
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_log::test;

const RECORD: &str =
    "UserName=dduck\r\nGroups=admins:users\r\nRemoteIP=203.0.113.5\r\nATTR_uid=dduck\r\n";

fn store(docker: &RuntimeParams) -> Memcached {
    let cfg = Config {
        cache_backend: CacheBackend::Memcached,
        memcache_host: docker.host.clone(),
        memcache_port: docker.port,
        ..config::mock()
    };
    Memcached::from_config(&cfg).unwrap()
}

#[test(tokio::test)]
async fn record_is_stored_verbatim_and_deleted() {
    let docker = RuntimeParams::init().await;
    let store = store(&docker);

    store.set("_session", RECORD, Expiration::NEVER).await.unwrap();
    assert_eq!(docker.get("_session").as_deref(), Some(RECORD));

    assert!(store.delete("_session").await.unwrap());
    assert_eq!(docker.get("_session"), None);
    assert!(!store.delete("_session").await.unwrap());
}

#[test(tokio::test)]
async fn relative_expiration_runs_out() {
    let docker = RuntimeParams::init().await;
    let store = store(&docker);

    store.set("_short", RECORD, Expiration(2)).await.unwrap();
    assert!(docker.get("_short").is_some());

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(docker.get("_short"), None);
}

#[test(tokio::test)]
async fn absolute_expiration_is_a_unix_timestamp() {
    let docker = RuntimeParams::init().await;
    let store = store(&docker);
    let now = epoch_now_secs();

    let future = Expiration::from_unix_timestamp(Some(now + 3600));
    store.set("_future", RECORD, future).await.unwrap();
    assert!(docker.get("_future").is_some());

    let past = Expiration::from_unix_timestamp(Some(now - 60));
    store.set("_past", RECORD, past).await.unwrap();
    assert_eq!(docker.get("_past"), None);
}
