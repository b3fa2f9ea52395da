use crate::helpers::identity::USER_HEADER;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, redirect};

/// Redirects are part of what is under test, so they are never followed.
pub fn client() -> Client {
    Client::builder().redirect(redirect::Policy::none()).build().unwrap()
}

pub async fn get_memcookie(address: &str, path_and_query: &str, attributes: Option<&str>) -> Response {
    let mut request = client().get(format!("http://{address}{path_and_query}"));
    if let Some(attributes) = attributes {
        request = request.header(USER_HEADER, attributes);
    }
    request.send().await.unwrap()
}

pub async fn get_logout(address: &str, cookie: Option<&str>) -> Response {
    let mut request = client().get(format!("http://{address}/api/v1/logout"));
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    request.send().await.unwrap()
}

/// The `name=value` pair of the first `Set-Cookie` header for the given cookie.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response.headers().get_all(SET_COOKIE).iter().find_map(|value| {
        let value = value.to_str().ok()?;
        let pair = value.split(';').next()?.trim();
        pair.starts_with(&format!("{name}=")).then(|| pair.to_string())
    })
}
