//! Bearer token acquisition and refresh.

use crate::error::ApiError;
use crate::types::TokenResponse;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const LOGIN_PATH: &str = "/gw/auth/login";

/// Source of the current instant, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Credentials exchanged for a bearer token.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: SecretString,
    pub company: String,
    pub grant_type: String,
    pub slug: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        company: impl Into<String>,
        grant_type: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
            company: company.into(),
            grant_type: grant_type.into(),
            slug: slug.into(),
        }
    }
}

/// Token lifetime policy.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    /// Lifetime assumed when the token endpoint declares none.
    pub default_lifetime: Duration,
    /// Tokens are renewed this long before they expire.
    pub safety_margin: Duration,
    /// Timeout of the credential exchange itself.
    pub refresh_timeout: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            default_lifetime: Duration::from_secs(3600),
            safety_margin: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(30),
        }
    }
}

/// Observable token state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Authenticated,
    Expired,
}

struct Token {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

/// Acquires and renews the bearer token.
///
/// The token sits behind an async mutex held across the credential exchange,
/// so concurrent callers never see a value without its expiry and an expired
/// token is renewed once rather than once per caller.
pub struct Authenticator {
    client: Client,
    base_url: String,
    credentials: Credentials,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<Token>>,
}

impl Authenticator {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        credentials: Credentials,
        settings: TokenSettings,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
            settings,
            clock: Arc::new(SystemClock),
            token: Mutex::new(None),
        }
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn state(&self) -> TokenState {
        match self.token.lock().await.as_ref() {
            None => TokenState::Unauthenticated,
            Some(token) if self.is_valid(token) => TokenState::Authenticated,
            Some(_) => TokenState::Expired,
        }
    }

    /// A valid bearer token, exchanging credentials first if needed.
    ///
    /// A failed exchange leaves the authenticator unauthenticated; the next
    /// call tries again.
    pub async fn access_token(&self) -> Result<SecretString, ApiError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if self.is_valid(token) {
                return Ok(token.value.clone());
            }
            debug!(expires_at = %token.expires_at, "Access token expired, re-authenticating");
            *guard = None;
        }

        let token = self.authenticate().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Drop the current token.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    fn is_valid(&self, token: &Token) -> bool {
        let margin = chrono::Duration::from_std(self.settings.safety_margin)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.clock.now() < token.expires_at - margin
    }

    #[instrument(skip(self), fields(username = %self.credentials.username))]
    async fn authenticate(&self) -> Result<Token, ApiError> {
        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password.expose_secret(),
            "company": self.credentials.company,
            "grant_type": self.credentials.grant_type,
            "slug": self.credentials.slug,
        });

        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .timeout(self.settings.refresh_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Token request failed: {}", e);
                ApiError::authentication(format!("Authentication failed: {}", e)).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| {
                warn!("Failed to read token endpoint error body: {}", e);
                String::new()
            });
            warn!(%status, "Token endpoint rejected credentials");
            return Err(ApiError::authentication(format!(
                "Authentication failed: HTTP {} - {}",
                status.as_u16(),
                message
            ))
            .with_code(status.as_u16()));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ApiError::authentication(format!("Invalid token response: {}", e)).with_source(e)
        })?;

        let value = token
            .access_token
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::authentication("Access token missing from response"))?;

        let lifetime = token
            .expires_in
            .filter(|seconds| *seconds > 0)
            .map(chrono::Duration::seconds)
            .or_else(|| chrono::Duration::from_std(self.settings.default_lifetime).ok())
            .unwrap_or_else(|| chrono::Duration::hours(1));
        let expires_at = self.clock.now() + lifetime;

        info!(%expires_at, "Authenticated against ViaDialog");

        Ok(Token {
            value: SecretString::new(value),
            expires_at,
        })
    }
}
