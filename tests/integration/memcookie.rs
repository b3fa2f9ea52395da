use crate::helpers::config;
use crate::helpers::http::{client, get_memcookie, set_cookie};
use crate::helpers::identity::{USER_HEADER, attributes};
use crate::helpers::server::TestServer;
use axum::http::StatusCode;
use memcookie::cache::Expiration;
use memcookie::handler::{ErrorCode, ErrorResponse};
use memcookie::identity::AttributeValue;
use pretty_assertions::assert_eq;
use reqwest::header::LOCATION;
use test_log::test;

#[test(tokio::test)]
async fn session_is_stored_under_the_cookie_value() {
    let (address, store, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", vec!["dduck"].into())]);

    let response = get_memcookie(&address, "/api/v1/memcookie", Some(&user)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(LOCATION).is_none());

    let cookie = set_cookie(&response, "AuthMemCookie").expect("session cookie");
    let session_id = cookie.strip_prefix("AuthMemCookie=").unwrap();
    assert!(session_id.starts_with('_'));
    assert_eq!(session_id.len(), 43);

    let stored = store.get(session_id).await.expect("session in cache");
    assert_eq!(
        stored.value,
        "UserName=dduck\r\nGroups=\r\nRemoteIP=127.0.0.1\r\nATTR_uid=dduck\r\n"
    );
    assert_eq!(stored.expiration, Expiration::NEVER);

    join_handler.abort();
}

#[test(tokio::test)]
async fn groups_are_joined() {
    let (address, store, join_handler) =
        TestServer::new(config::mock_with_groups("memberOf")).await.spawn();
    let user = attributes(&[
        ("uid", vec!["dduck"].into()),
        ("memberOf", vec!["admins", "users"].into()),
    ]);

    let response = get_memcookie(&address, "/", Some(&user)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response, "AuthMemCookie").unwrap();
    let stored = store.get(cookie.strip_prefix("AuthMemCookie=").unwrap()).await.unwrap();
    assert_eq!(
        stored.value,
        "UserName=dduck\r\nGroups=admins:users\r\nRemoteIP=127.0.0.1\r\nATTR_memberOf=admins:users\r\nATTR_uid=dduck\r\n"
    );

    join_handler.abort();
}

#[test(tokio::test)]
async fn missing_username_attribute() {
    let (address, _, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("mail", AttributeValue::from("dduck@example.org"))]);

    let response = get_memcookie(&address, "/api/v1/memcookie", Some(&user)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie(&response, "AuthMemCookie").is_none());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, ErrorCode::MissingAttribute);
    assert!(body.description.contains("'uid'"));

    join_handler.abort();
}

#[test(tokio::test)]
async fn unauthenticated_user_is_handed_to_identity_source() {
    let (address, _, join_handler) = TestServer::new(config::mock()).await.spawn();

    let response = get_memcookie(&address, "/api/v1/memcookie?ReturnTo=%2Fapp", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "AuthMemCookie").is_none());
    assert_eq!(
        response.text().await.unwrap(),
        format!("login required, come back to http://{address}/api/v1/memcookie?ReturnTo=%2Fapp")
    );

    join_handler.abort();
}

#[test(tokio::test)]
async fn return_to() {
    let (address, _, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", "dduck".into())]);

    let response = get_memcookie(&address, "/?ReturnTo=%2Fapp%3Fq%3D1", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/app?q=1");

    let response = get_memcookie(
        &address,
        "/?ReturnTo=https%3A%2F%2Fwiki.example.org%2Fpage",
        Some(&user),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "https://wiki.example.org/page");

    let response =
        get_memcookie(&address, "/?ReturnTo=https%3A%2F%2Fevil.example.com%2F", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookie(&response, "AuthMemCookie").is_none());
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, ErrorCode::InvalidRequest);

    let response = get_memcookie(&address, "/?ReturnTo=%2F%09%2Fevil.example.com", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(LOCATION).is_none());
    assert!(set_cookie(&response, "AuthMemCookie").is_none());

    join_handler.abort();
}

#[test(tokio::test)]
async fn proxied_request_returns_to_forwarded_uri() {
    let (address, _, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", "dduck".into())]);

    let response = client()
        .get(format!("http://{address}/api/v1/memcookie"))
        .header(USER_HEADER, &user)
        .header("x-forwarded-uri", "/protected/page?id=1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/protected/page?id=1");
    assert!(set_cookie(&response, "AuthMemCookie").is_some());

    join_handler.abort();
}

#[test(tokio::test)]
async fn every_login_gets_a_fresh_session() {
    let (address, store, join_handler) = TestServer::new(config::mock()).await.spawn();
    let user = attributes(&[("uid", "dduck".into())]);

    let first = get_memcookie(&address, "/", Some(&user)).await;
    let second = get_memcookie(&address, "/", Some(&user)).await;

    let first = set_cookie(&first, "AuthMemCookie").unwrap();
    let second = set_cookie(&second, "AuthMemCookie").unwrap();
    assert_ne!(first, second);
    for cookie in [first, second] {
        assert!(store.get(cookie.strip_prefix("AuthMemCookie=").unwrap()).await.is_some());
    }

    join_handler.abort();
}
