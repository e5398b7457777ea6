use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    gate::AuthContext,
};

/// Header accepted as a session stand-in when running with `APP_ENV=local`.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// The subset of a Supabase access token payload the service relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id, also the primary key of `public.profiles`.
    pub sub: Uuid,
    /// Expiration Time (exp): the token is rejected after this timestamp.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// SessionCredentials
///
/// Whatever the request presented as proof of a session, before validation.
#[derive(Debug, Clone, Default)]
pub struct SessionCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub dev_user_id: Option<Uuid>,
}

/// RefreshedCredentials
///
/// New tokens minted by the identity provider while validating a session.
/// They must reach the client on whatever response the gate produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedCredentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the new access token, in seconds.
    pub expires_in: i64,
}

/// ValidatedSession
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user_id: Uuid,
    pub refreshed: Option<RefreshedCredentials>,
}

impl ValidatedSession {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            refreshed: None,
        }
    }
}

/// SessionCookies
///
/// Names and flags of the cookies carrying the session. Reads credentials off
/// an incoming request and writes refreshed ones back as `Set-Cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub secure: bool,
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self {
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            secure: false,
        }
    }
}

impl SessionCookies {
    /// Cookies win over the `Authorization: Bearer` header for the access token.
    pub fn read(&self, headers: &HeaderMap) -> SessionCredentials {
        let jar = CookieJar::from_headers(headers);
        let cookie_value = |name: &str| {
            jar.get(name)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| !value.is_empty())
        };

        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        let dev_user_id = headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());

        SessionCredentials {
            access_token: cookie_value(&self.access_cookie).or(bearer),
            refresh_token: cookie_value(&self.refresh_cookie),
            dev_user_id,
        }
    }

    pub fn write(&self, refreshed: &RefreshedCredentials) -> CookieJar {
        CookieJar::new()
            .add(self.build(
                &self.access_cookie,
                &refreshed.access_token,
                Some(time::Duration::seconds(refreshed.expires_in)),
            ))
            .add(self.build(&self.refresh_cookie, &refreshed.refresh_token, None))
    }

    fn build(&self, name: &str, value: &str, max_age: Option<time::Duration>) -> Cookie<'static> {
        let mut cookie = Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();
        if let Some(max_age) = max_age {
            cookie.set_max_age(max_age);
        }
        cookie
    }
}

/// IdentityError
///
/// The identity provider could not give an answer. Distinct from a session
/// that was checked and found invalid, which is `Ok(None)`.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned status {0}")]
    Upstream(u16),

    #[error("identity provider sent a malformed response: {0}")]
    MalformedResponse(#[source] reqwest::Error),
}

/// IdentityProvider Trait
///
/// Session validation against the external identity provider.
/// `Ok(None)` means the credentials are absent or rejected.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate_session(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Option<ValidatedSession>, IdentityError>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

/// TokenResponse
///
/// Minimal struct to deserialize Supabase's `/auth/v1/token` response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: Uuid,
}

/// SupabaseIdentityProvider
///
/// Verifies access tokens locally against the project's JWT secret and only
/// calls out to Supabase Auth when a token has to be refreshed.
pub struct SupabaseIdentityProvider {
    http: reqwest::Client,
    token_url: String,
    anon_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
    allow_dev_header: bool,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });

        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Audience is not checked; every Supabase user token carries `aud = "authenticated"`.
        validation.validate_aud = false;

        Self {
            http,
            token_url: format!(
                "{}/auth/v1/token?grant_type=refresh_token",
                config.supabase_url.trim_end_matches('/')
            ),
            anon_key: config.supabase_anon_key.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            allow_dev_header: config.env == Env::Local,
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<ValidatedSession>, IdentityError> {
        let response = self
            .http
            .post(&self.token_url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(%status, "refresh token rejected");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::Upstream(status.as_u16()));
        }

        let tokens = response
            .json::<TokenResponse>()
            .await
            .map_err(IdentityError::MalformedResponse)?;

        tracing::debug!(user_id = %tokens.user.id, "session refreshed");

        Ok(Some(ValidatedSession {
            user_id: tokens.user.id,
            refreshed: Some(RefreshedCredentials {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                expires_in: tokens.expires_in,
            }),
        }))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    /// validate_session
    ///
    /// 1. Local bypass: in `Env::Local` a UUID in `x-user-id` is a valid session.
    /// 2. A valid access token yields the user id with no refresh.
    /// 3. An expired (or missing) access token falls through to a refresh
    ///    attempt when a refresh token is present.
    /// 4. Any other token failure (bad signature, malformed) is an invalid session.
    async fn validate_session(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Option<ValidatedSession>, IdentityError> {
        if self.allow_dev_header {
            if let Some(user_id) = credentials.dev_user_id {
                return Ok(Some(ValidatedSession::new(user_id)));
            }
        }

        if let Some(token) = credentials.access_token.as_deref() {
            match decode::<Claims>(token, &self.decoding_key, &self.validation) {
                Ok(data) => return Ok(Some(ValidatedSession::new(data.claims.sub))),
                Err(e) => match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("access token expired");
                    }
                    _ => {
                        tracing::debug!(error = %e, "access token rejected");
                        return Ok(None);
                    }
                },
            }
        }

        match credentials.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(refresh_token).await,
            None => Ok(None),
        }
    }
}

/// CurrentUser Extractor Result
///
/// The identity the access gate resolved for this request. Only present on
/// routes behind the gate, and only once a session was validated.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<AuthContext>()
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(CurrentUser {
            id: context.user_id,
        })
    }
}
