use crate::identity::Interrupted;
use crate::session::record;
use crate::{cache, config};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::AsRefStr;
use thiserror::Error;
use utoipa::ToSchema;

mod logout;
mod memcookie;
mod redirect;
mod state;

pub use state::{InitError, State};
// The __path_* functions are used by utoipa to generate OpenAPI documentation.
pub(crate) use logout::{__path_logout, __path_logout_post, logout, logout_post};
pub(crate) use memcookie::{__path_memcookie, memcookie};

#[derive(Debug, AsRefStr, Error)]
pub enum ApiError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] config::Error),

    #[error("identity source '{0}' is not registered")]
    UnknownAuthSource(String),

    #[error("{0}")]
    Attribute(#[from] record::Error),

    #[error("cache: {0}")]
    Cache(#[from] cache::Error),

    #[error("ReturnTo '{0}' does not point to a trusted host")]
    UntrustedReturnTo(String),

    #[error("authentication was handed over to the identity source")]
    Interrupted(Interrupted),
}

impl From<Interrupted> for ApiError {
    fn from(interrupted: Interrupted) -> Self {
        Self::Interrupted(interrupted)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_response) = match self {
            ApiError::Interrupted(interrupted) => return interrupted.into_response(),
            ApiError::Configuration(_)
            | ApiError::UnknownAuthSource(_)
            | ApiError::Attribute(record::Error::UsernameNotConfigured) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: ErrorCode::ServerError,
                    description: "server configuration error".to_string(),
                },
            ),
            ApiError::Attribute(err @ record::Error::MissingAttribute { .. }) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: ErrorCode::MissingAttribute,
                    description: err.to_string(),
                },
            ),
            ApiError::Attribute(err @ record::Error::InvalidAttribute(_)) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: ErrorCode::InvalidAttribute,
                    description: err.to_string(),
                },
            ),
            ApiError::Cache(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: ErrorCode::ServerError,
                    description: "failed to store session".to_string(),
                },
            ),
            ApiError::UntrustedReturnTo(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: ErrorCode::InvalidRequest,
                    description: self.to_string(),
                },
            ),
        };
        (status_code, Json(error_response)).into_response()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    #[serde(rename = "error_description")]
    pub description: String,
}

impl Display for ErrorResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let err = serde_json::to_string(&self.error)
            .unwrap_or("BUG: unserializable error message".to_string());
        write!(f, "error={}: error_description={}", err, self.description)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ServerError,
    MissingAttribute,
    InvalidAttribute,
    InvalidRequest,
}
