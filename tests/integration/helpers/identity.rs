use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use memcookie::identity::{
    AttributeValue, Attributes, AuthContext, Authentication, IdentitySource, Interrupted,
};

pub const USER_HEADER: &str = "x-test-attributes";

/// Trusts the attributes passed as JSON in a request header.
pub struct HeaderSource {
    id: String,
    logout_url: Option<String>,
}

impl HeaderSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            logout_url: None,
        }
    }

    pub fn with_logout_url(mut self, url: &str) -> Self {
        self.logout_url = Some(url.to_string());
        self
    }
}

#[async_trait]
impl IdentitySource for HeaderSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn require_auth(&self, ctx: &AuthContext<'_>) -> Result<Authentication, Interrupted> {
        let attributes = ctx
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| serde_json::from_str::<Attributes>(value).ok());

        match attributes {
            Some(attributes) => Ok(Authentication {
                attributes,
                expire: None,
            }),
            None => Err(Interrupted(
                (StatusCode::UNAUTHORIZED, format!("login required, come back to {}", ctx.return_to))
                    .into_response(),
            )),
        }
    }

    fn logout_url(&self) -> Option<&str> {
        self.logout_url.as_deref()
    }
}

pub fn attributes(pairs: &[(&str, AttributeValue)]) -> String {
    let attributes: Attributes = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    serde_json::to_string(&attributes).unwrap()
}
