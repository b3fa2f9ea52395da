use crate::config::Config;
use crate::handler::ApiError;
use axum::http::header::HOST;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, Uri};
use reqwest::Url;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_URI: &str = "x-forwarded-uri";

/// Base for resolving relative targets. Anything that resolves off this host is not relative.
const RELATIVE_BASE: &str = "http://memcookie.invalid/";

/// Where the user goes once the session is in place.
#[derive(Debug, PartialEq, Eq)]
pub enum Target {
    Redirect(String),
    /// Nothing to return to, or the target is this very endpoint.
    Stay,
}

/// Resolves the target from an explicit `ReturnTo`, falling back to the URI a reverse proxy
/// reports in `X-Forwarded-Uri`.
///
/// A target must be relative or point at the request's own host or a trusted domain. It must also
/// be usable as a `Location` header as is.
pub fn target(
    cfg: &Config,
    headers: &HeaderMap,
    uri: &Uri,
    return_to: Option<&str>,
) -> Result<Target, ApiError> {
    let requested = return_to
        .filter(|return_to| !return_to.is_empty())
        .map(String::from)
        .or_else(|| first_header_value(headers, X_FORWARDED_URI));

    match requested {
        None => Ok(Target::Stay),
        Some(requested) => validate(cfg, headers, uri, &requested),
    }
}

fn validate(cfg: &Config, headers: &HeaderMap, uri: &Uri, requested: &str) -> Result<Target, ApiError> {
    let untrusted = || ApiError::UntrustedReturnTo(requested.to_string());

    // Browsers drop tabs and newlines inside URLs, so "/\t/host" would become "//host".
    if requested.chars().any(|c| c.is_control() || c.is_whitespace()) || requested.contains('\\') {
        return Err(untrusted());
    }
    HeaderValue::try_from(requested).map_err(|_| untrusted())?;

    let own_host = request_host(headers, uri).map(|own| strip_port(&own).to_ascii_lowercase());
    let resolved = if requested.starts_with('/') {
        let base = Url::parse(RELATIVE_BASE).map_err(|_| untrusted())?;
        base.join(requested)
            .ok()
            .filter(|url| url.host_str() == base.host_str())
            .ok_or_else(untrusted)?
    } else {
        Url::parse(requested)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .filter(|url| url.host_str().is_some_and(|host| is_trusted_host(cfg, own_host.as_deref(), host)))
            .ok_or_else(untrusted)?
    };

    let on_own_host = requested.starts_with('/') || resolved.host_str() == own_host.as_deref();
    if on_own_host && resolved.path() == uri.path() {
        return Ok(Target::Stay);
    }
    Ok(Target::Redirect(requested.to_string()))
}

/// The URL of the current request as seen by the user, honoring reverse proxy headers.
pub fn self_url(headers: &HeaderMap, uri: &Uri) -> String {
    let path = uri.path_and_query().map_or("/", PathAndQuery::as_str);
    match request_host(headers, uri) {
        Some(host) => format!("{}://{host}{path}", request_scheme(headers, uri)),
        None => path.to_string(),
    }
}

fn is_trusted_host(cfg: &Config, own_host: Option<&str>, host: &str) -> bool {
    own_host == Some(host) || cfg.trusted_domains.iter().any(|trusted| trusted.eq_ignore_ascii_case(host))
}

fn request_scheme(headers: &HeaderMap, uri: &Uri) -> String {
    first_header_value(headers, X_FORWARDED_PROTO)
        .or_else(|| uri.scheme_str().map(String::from))
        .unwrap_or("http".to_string())
}

fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    first_header_value(headers, X_FORWARDED_HOST)
        .or_else(|| first_header_value(headers, HOST.as_str()))
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
}

/// Proxies may append to forwarding headers; the first entry is the one the client used.
fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(ipv6, _)| &host[..=ipv6.len()]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}
