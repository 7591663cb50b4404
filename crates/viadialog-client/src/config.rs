//! Client configuration loaded from `VIAD_API_*` environment variables.

use crate::auth::{Credentials, TokenSettings};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

/// ViaDialog client configuration.
#[derive(Clone, Deserialize)]
pub struct ViaDialogConfig {
    pub username: String,

    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    pub company: String,

    pub grant_type: String,

    pub slug: String,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Company attached to lines added to a service
    #[serde(default = "default_company_id")]
    pub company_id: i64,

    /// Total request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Token lifetime when the token endpoint declares none
    #[serde(default = "default_token_lifetime", with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Renew tokens this long before expiry
    #[serde(default = "default_token_safety_margin", with = "humantime_serde")]
    pub token_safety_margin: Duration,

    /// Timeout of the credential exchange, independent of the triggering call
    #[serde(default = "default_refresh_timeout", with = "humantime_serde")]
    pub refresh_timeout: Duration,
}

fn default_base_url() -> String {
    "https://viaflow-dashboard.viadialog.com".into()
}

fn default_company_id() -> i64 {
    10000085
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_token_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_token_safety_margin() -> Duration {
    Duration::from_secs(30)
}

fn default_refresh_timeout() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::new)
}

impl ViaDialogConfig {
    /// Minimal configuration with defaults for everything but credentials.
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
            base_url: default_base_url(),
            company_id: default_company_id(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            token_lifetime: default_token_lifetime(),
            token_safety_margin: default_token_safety_margin(),
            refresh_timeout: default_refresh_timeout(),
        }
    }

    /// Override the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("VIAD_API").try_parsing(false))
            .build()
            .context("Failed to build ViaDialog configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize ViaDialog configuration")
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone(),
            self.password.expose_secret().clone(),
            self.company.clone(),
            self.grant_type.clone(),
            self.slug.clone(),
        )
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            default_lifetime: self.token_lifetime,
            safety_margin: self.token_safety_margin,
            refresh_timeout: self.refresh_timeout,
        }
    }
}

impl fmt::Debug for ViaDialogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViaDialogConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("company", &self.company)
            .field("grant_type", &self.grant_type)
            .field("slug", &self.slug)
            .field("base_url", &self.base_url)
            .field("company_id", &self.company_id)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("token_lifetime", &self.token_lifetime)
            .field("token_safety_margin", &self.token_safety_margin)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}
