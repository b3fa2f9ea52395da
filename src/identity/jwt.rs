use crate::cache::epoch_now_secs;
use crate::identity::{
    AttributeValue, Attributes, AuthContext, Authentication, IdentitySource, Interrupted,
};
use crate::{config, http};
use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use jsonwebkey as jwk;
use jsonwebtoken as jwt;
use jsonwebtoken::Validation;
use log::debug;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

#[derive(Error, Debug)]
pub enum Error {
    #[error("init client: {0}")]
    Init(reqwest::Error),
    #[error("fetch: {0}")]
    Fetch(reqwest_middleware::Error),
    #[error("decode json: {0}")]
    JsonDecode(reqwest::Error),
    #[error("json web key set has key with blank key id")]
    MissingKeyID,
    #[error("missing key id from token header")]
    MissingKeyIDInTokenHeader,
    #[error("token can not be validated with this identity provider")]
    KeyNotInJWKS,
    #[error("invalid token header: {0}")]
    InvalidTokenHeader(jwt::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(jwt::errors::Error),
    #[error("invalid login url '{0}': {1}")]
    InvalidLoginUrl(String, String),
}

/// Signing keys of the identity provider, with the rules a token must satisfy.
#[derive(Clone, Debug)]
pub struct Jwks {
    endpoint: String,
    issuer: String,
    required_audience: Option<String>,
    keys: HashMap<String, jwk::JsonWebKey>,
    validation: Validation,
}

impl Jwks {
    pub async fn new(
        issuer: &str,
        endpoint: &str,
        required_audience: Option<String>,
    ) -> Result<Jwks, Error> {
        #[derive(Deserialize)]
        struct Response {
            keys: Vec<jwk::JsonWebKey>,
        }

        let client = http::client::jwks().map_err(Error::Init)?;
        let request = client.get(endpoint).header("accept", "application/json");
        let response: Response =
            request.send().await.map_err(Error::Fetch)?.json().await.map_err(Error::JsonDecode)?;

        Self::from_keys(issuer, endpoint, required_audience, response.keys)
    }

    pub fn from_keys(
        issuer: &str,
        endpoint: &str,
        required_audience: Option<String>,
        keys: Vec<jwk::JsonWebKey>,
    ) -> Result<Jwks, Error> {
        let mut keys_by_id: HashMap<String, jwk::JsonWebKey> = HashMap::new();
        for key in keys {
            keys_by_id.insert(key.key_id.clone().ok_or(Error::MissingKeyID)?, key);
        }

        Ok(Self {
            keys: keys_by_id,
            endpoint: endpoint.to_string(),
            issuer: issuer.to_string(),
            required_audience: required_audience.clone(),
            validation: Self::validator(issuer.to_string(), required_audience),
        })
    }

    fn validator(issuer: String, audience: Option<String>) -> Validation {
        let mut validation = Validation::new(jwt::Algorithm::RS256);

        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["iss", "exp", "iat"]);
        validation.set_issuer(&[issuer]);
        validation.leeway = 60;

        if let Some(audience) = audience {
            validation.set_required_spec_claims(&["iss", "exp", "iat", "aud"]);
            validation.set_audience(&[audience]);
        }

        validation
    }

    /// Fetch the key set again from the same endpoint.
    #[instrument(skip_all, name = "Refresh JWKS")]
    pub async fn refreshed(&self) -> Result<Jwks, Error> {
        Self::new(&self.issuer, &self.endpoint, self.required_audience.clone()).await
    }

    /// Check a JWT against the key set and return its claims.
    /// A key id missing from the set is [`Error::KeyNotInJWKS`].
    pub fn validate(&self, token: &str) -> Result<HashMap<String, Value>, Error> {
        let key_id = jwt::decode_header(token)
            .map_err(Error::InvalidTokenHeader)?
            .kid
            .ok_or(Error::MissingKeyIDInTokenHeader)?;

        let signing_key = self.keys.get(&key_id).ok_or(Error::KeyNotInJWKS)?;

        let claims = jwt::decode::<HashMap<String, Value>>(
            token,
            &signing_key.key.to_decoding_key(),
            &self.validation,
        )
        .map_err(Error::InvalidToken)?
        .claims;

        // jsonwebtoken does not check `iat`
        let iat = claims.get("iat").and_then(Value::as_u64).ok_or_else(|| {
            Error::InvalidToken(
                jwt::errors::ErrorKind::MissingRequiredClaim("iat".to_string()).into(),
            )
        })?;

        if iat > epoch_now_secs() + self.validation.leeway {
            return Err(Error::InvalidToken(jwt::errors::ErrorKind::ImmatureSignature.into()));
        }

        Ok(claims)
    }
}

/// Trusts identity assertions issued by an upstream identity provider as signed JWTs.
///
/// The assertion is read from the `Authorization: Bearer` header, or from a cookie when one is
/// configured. Every claim becomes an attribute and `exp` becomes the session expiration.
pub struct JwtSource {
    id: String,
    token_cookie: Option<String>,
    login_url: Option<Url>,
    logout_url: Option<String>,
    jwks: RwLock<Jwks>,
    /// When the key set was last fetched because of an unknown key id.
    last_refresh: Mutex<Option<Instant>>,
}

/// Unknown key ids trigger at most one JWKS fetch per interval.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

impl JwtSource {
    pub async fn from_config(id: &str, cfg: &config::IdentityProvider) -> Result<Self, Error> {
        debug!("Fetch JWKS for identity source '{id}' from '{}'...", cfg.jwks_uri);
        let jwks = Jwks::new(&cfg.issuer, &cfg.jwks_uri, cfg.audience.clone()).await?;
        Self::new(id, cfg, jwks)
    }

    pub fn new(id: &str, cfg: &config::IdentityProvider, jwks: Jwks) -> Result<Self, Error> {
        let login_url = cfg
            .login_url
            .as_deref()
            .map(|url| {
                Url::parse(url).map_err(|err| Error::InvalidLoginUrl(url.to_string(), err.to_string()))
            })
            .transpose()?;

        Ok(Self {
            id: id.to_string(),
            token_cookie: cfg.token_cookie.clone(),
            login_url,
            logout_url: cfg.logout_url.clone(),
            jwks: RwLock::new(jwks),
            last_refresh: Mutex::new(None),
        })
    }

    /// Validate under the read lock. Only an unknown key id leads to a refresh and one more attempt.
    #[instrument(skip_all, name = "Validate identity assertion")]
    async fn validate(&self, token: &str) -> Result<HashMap<String, Value>, Error> {
        let result = self.jwks.read().await.validate(token);
        match result {
            Err(Error::KeyNotInJWKS) => {
                self.refresh().await?;
                self.jwks.read().await.validate(token)
            }
            other => other,
        }
    }

    /// Concurrent refreshes queue on `last_refresh`; validations with known keys do not wait.
    async fn refresh(&self) -> Result<(), Error> {
        let mut last_refresh = self.last_refresh.lock().await;
        if last_refresh.is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL) {
            debug!("JWKS was refreshed recently; not fetching again");
            return Ok(());
        }
        *last_refresh = Some(Instant::now());

        let current = self.jwks.read().await.clone();
        let refreshed = current.refreshed().await?;
        *self.jwks.write().await = refreshed;
        Ok(())
    }

    fn assertion<'a>(&self, ctx: &'a AuthContext<'_>) -> Option<&'a str> {
        let bearer = ctx
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        bearer.or_else(|| {
            let name = self.token_cookie.as_deref()?;
            ctx.cookies.get(name).map(|cookie| cookie.value()).filter(|token| !token.is_empty())
        })
    }

    fn login_required(&self, return_to: &str) -> Interrupted {
        let Some(login_url) = &self.login_url else {
            return Interrupted(
                (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, "Bearer")], "authentication required")
                    .into_response(),
            );
        };

        let mut url = login_url.clone();
        url.query_pairs_mut().append_pair("ReturnTo", return_to);
        Interrupted(Redirect::to(url.as_str()).into_response())
    }
}

#[async_trait]
impl IdentitySource for JwtSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn require_auth(&self, ctx: &AuthContext<'_>) -> Result<Authentication, Interrupted> {
        let Some(token) = self.assertion(ctx) else {
            debug!("No identity assertion in request; login required");
            return Err(self.login_required(ctx.return_to));
        };

        match self.validate(token).await {
            Ok(claims) => Ok(authentication_from_claims(claims)),
            Err(err) => {
                debug!("Rejected identity assertion: {err}");
                Err(self.login_required(ctx.return_to))
            }
        }
    }

    fn logout_url(&self) -> Option<&str> {
        self.logout_url.as_deref()
    }
}

fn authentication_from_claims(claims: HashMap<String, Value>) -> Authentication {
    let expire = claims.get("exp").and_then(Value::as_u64);
    let attributes: Attributes =
        claims.into_iter().map(|(name, value)| (name, attribute_value(value))).collect();

    Authentication { attributes, expire }
}

fn attribute_value(claim: Value) -> AttributeValue {
    match claim {
        Value::Array(values) => AttributeValue::Multiple(values.into_iter().map(text).collect()),
        other => AttributeValue::Single(text(other)),
    }
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
