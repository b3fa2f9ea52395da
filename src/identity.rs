use async_trait::async_trait;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod jwt;

/// Attribute values carry no schema: identity sources hand out either a single value or a list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Separator used when a multi-valued attribute is flattened into one line.
pub const VALUE_SEPARATOR: &str = ":";

impl AttributeValue {
    pub fn empty() -> Self {
        Self::Multiple(vec![])
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::Multiple(values) => f.write_str(&values.join(VALUE_SEPARATOR)),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(String::from).collect())
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// The outcome of a successful authentication.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Authentication {
    pub attributes: Attributes,
    /// Unix timestamp after which the authentication is no longer valid.
    pub expire: Option<u64>,
}

/// What an identity source gets to look at when asked to authenticate the caller.
pub struct AuthContext<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
    pub cookies: &'a CookieJar,
    /// Where the caller should end up once authenticated.
    pub return_to: &'a str,
}

/// The identity source took over the response, e.g. to send the user to a login page.
#[derive(Debug)]
pub struct Interrupted(pub Response);

impl IntoResponse for Interrupted {
    fn into_response(self) -> Response {
        self.0
    }
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
    fn id(&self) -> &str;

    /// Authenticate the caller, or hand back the response that continues authentication elsewhere.
    async fn require_auth(&self, ctx: &AuthContext<'_>) -> Result<Authentication, Interrupted>;

    /// Where to send the user after the local logout has completed.
    fn logout_url(&self) -> Option<&str> {
        None
    }
}

/// Identity sources by id.
#[derive(Clone, Default)]
pub struct IdentitySources {
    sources: HashMap<String, Arc<dyn IdentitySource>>,
}

impl IdentitySources {
    pub fn register(&mut self, source: Arc<dyn IdentitySource>) {
        self.sources.insert(source.id().to_string(), source);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn IdentitySource>> {
        self.sources.get(id).cloned()
    }
}
