use crate::cache::Expiration;
use crate::handler::redirect::{self, Target};
use crate::handler::{ApiError, ErrorResponse, State};
use crate::identity::AuthContext;
use crate::session::{CacheCleanup, SessionId, SessionRecord};
use crate::telemetry::{inc_handler_errors, inc_sessions_created};
use axum::extract::{ConnectInfo, Query, State as AxumState};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct MemcookieQuery {
    /// Where to send the user once the session is established. Must be a relative path, or an
    /// absolute URL on this host or a trusted domain. Defaults to the `X-Forwarded-Uri` of the
    /// proxied request; without either the session is confirmed in place.
    #[serde(rename = "ReturnTo")]
    pub return_to: Option<String>,
}

/// Everything needed to hand the session to the browser and memcached.
struct PendingSession {
    id: SessionId,
    cookie_name: String,
    record: SessionRecord,
    expiration: Expiration,
    target: Target,
}

#[utoipa::path(
    get,
    path = "/api/v1/memcookie",
    tag = "Endpoints",
    params(MemcookieQuery),
    responses(
        (status = OK, description = "Session stored in memcached and cookie issued; no target to return to", body = String, content_type = "text/plain"),
        (status = SEE_OTHER, description = "Session stored in memcached and cookie issued; redirects to the original target"),
        (status = UNAUTHORIZED, description = "Not authenticated and no login page is configured"),
        (status = BAD_REQUEST, description = "Bad request", body = ErrorResponse, content_type = "application/json"),
        (status = FORBIDDEN, description = "Required user attribute missing or invalid", body = ErrorResponse, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Server error", body = ErrorResponse, content_type = "application/json"),
    )
)]
#[instrument(skip_all, name = "Handle /api/v1/memcookie", fields(
    memcookie.auth_source = %state.cfg.auth_source(),
    memcookie.cache_expiration,
))]
pub async fn memcookie(
    AxumState(state): AxumState<State>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<MemcookieQuery>,
    headers: HeaderMap,
    uri: Uri,
    jar: CookieJar,
) -> Response {
    const PATH: &str = "/api/v1/memcookie";

    let pending = match prepare_session(&state, peer.ip(), &headers, &uri, &jar, query.return_to.as_deref()).await {
        Ok(pending) => pending,
        Err(err) => return error_response(PATH, jar, err),
    };
    tracing::Span::current().record("memcookie.cache_expiration", pending.expiration.0);

    let cfg = &state.cfg;
    let mut cookie = Cookie::build((pending.cookie_name, pending.id.to_string()))
        .path(cfg.cookie.path.clone())
        .http_only(true)
        .secure(cfg.cookie.secure);
    if let Some(domain) = &cfg.cookie.domain {
        cookie = cookie.domain(domain.clone());
    }
    // Stays on the response even if storing the session fails.
    let jar = jar.add(cookie);

    if let Err(err) = state.store.set(pending.id.as_str(), &pending.record.serialize(), pending.expiration).await {
        return error_response(PATH, jar, err.into());
    }
    inc_sessions_created(cfg.auth_source());

    let cleanup = CacheCleanup::new(cfg.clone(), state.store.clone());
    state.lifecycle.register_logout_handler(cfg.auth_source(), Arc::new(cleanup)).await;

    match pending.target {
        Target::Redirect(url) => (jar, Redirect::to(&url)).into_response(),
        Target::Stay => (jar, (StatusCode::OK, "session established")).into_response(),
    }
}

async fn prepare_session(
    state: &State,
    remote_ip: IpAddr,
    headers: &HeaderMap,
    uri: &Uri,
    cookies: &CookieJar,
    return_to: Option<&str>,
) -> Result<PendingSession, ApiError> {
    let cfg = &state.cfg;
    let target = redirect::target(cfg, headers, uri, return_to)?;

    let source = state
        .identity_source()
        .ok_or_else(|| ApiError::UnknownAuthSource(cfg.auth_source().to_string()))?;
    let self_url = redirect::self_url(headers, uri);
    let ctx = AuthContext {
        headers,
        uri,
        cookies,
        return_to: &self_url,
    };
    let authentication = source.require_auth(&ctx).await?;

    let id = SessionId::generate();
    let cookie_name = cfg.cookie_name()?.to_string();
    let record = SessionRecord::from_authentication(cfg, &authentication, remote_ip)?;

    Ok(PendingSession {
        id,
        cookie_name,
        record,
        expiration: Expiration::from_unix_timestamp(authentication.expire),
        target,
    })
}

fn error_response(path: &str, jar: CookieJar, err: ApiError) -> Response {
    if !matches!(err, ApiError::Interrupted(_)) {
        warn!("Failed to create session: {err}");
        inc_handler_errors(path, err.as_ref());
    }
    (jar, err).into_response()
}
