use crate::handler::State;
use axum::extract::State as AxumState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

/// `GET` stays available so identity providers can end the session through a front-channel logout.
#[utoipa::path(
    get,
    path = "/api/v1/logout",
    tag = "Endpoints",
    responses(
        (status = OK, description = "Session removed", body = String, content_type = "text/plain"),
        (status = SEE_OTHER, description = "Session removed; redirects to the identity provider's logout page"),
    )
)]
#[instrument(skip_all, name = "Handle GET /api/v1/logout", fields(
    memcookie.auth_source = %state.cfg.auth_source(),
))]
pub async fn logout(AxumState(state): AxumState<State>, jar: CookieJar) -> Response {
    end_session(&state, jar).await
}

#[utoipa::path(
    post,
    path = "/api/v1/logout",
    tag = "Endpoints",
    responses(
        (status = OK, description = "Session removed", body = String, content_type = "text/plain"),
        (status = SEE_OTHER, description = "Session removed; redirects to the identity provider's logout page"),
    )
)]
#[instrument(skip_all, name = "Handle POST /api/v1/logout", fields(
    memcookie.auth_source = %state.cfg.auth_source(),
))]
pub async fn logout_post(AxumState(state): AxumState<State>, jar: CookieJar) -> Response {
    end_session(&state, jar).await
}

async fn end_session(state: &State, jar: CookieJar) -> Response {
    let source_id = state.cfg.auth_source();
    let jar = state.lifecycle.logout(source_id, jar).await;

    let logout_url =
        state.identity_source().and_then(|source| source.logout_url().map(String::from));
    match logout_url {
        Some(url) => (jar, Redirect::to(&url)).into_response(),
        None => (jar, (StatusCode::OK, "logged out")).into_response(),
    }
}
