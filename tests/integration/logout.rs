use crate::helpers::config;
use crate::helpers::http::{get_logout, get_memcookie, set_cookie};
use crate::helpers::identity::{HeaderSource, attributes};
use crate::helpers::server::TestServer;
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use reqwest::header::{LOCATION, SET_COOKIE};
use test_log::test;

#[test(tokio::test)]
async fn logout_deletes_session_and_cookie() {
    let (address, store, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", "dduck".into())]);

    let login = get_memcookie(&address, "/", Some(&user)).await;
    let cookie = set_cookie(&login, "AuthMemCookie").unwrap();
    let session_id = cookie.strip_prefix("AuthMemCookie=").unwrap().to_string();
    assert!(store.get(&session_id).await.is_some());

    let response = get_logout(&address, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let removal = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(removal.starts_with("AuthMemCookie=;"), "{removal}");
    assert!(store.get(&session_id).await.is_none());
    assert_eq!(response.text().await.unwrap(), "logged out");

    // Logging out again is harmless.
    let response = get_logout(&address, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    join_handler.abort();
}

#[test(tokio::test)]
async fn logout_without_cookie_keeps_sessions() {
    let (address, store, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", "dduck".into())]);

    let login = get_memcookie(&address, "/", Some(&user)).await;
    let cookie = set_cookie(&login, "AuthMemCookie").unwrap();

    let response = get_logout(&address, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(store.get(cookie.strip_prefix("AuthMemCookie=").unwrap()).await.is_some());

    join_handler.abort();
}

#[test(tokio::test)]
async fn logout_redirects_to_identity_provider() {
    let cfg = config::mock();
    let source =
        HeaderSource::new(config::AUTH_SOURCE).with_logout_url("https://idp.example.org/logout");
    let (address, _, join_handler) = TestServer::new_with_source(cfg, source).await.spawn();

    let response = get_logout(&address, None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "https://idp.example.org/logout");

    join_handler.abort();
}
