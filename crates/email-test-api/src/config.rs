//! Configuration for the email test service.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Mail store connection
    pub database: DatabaseConfig,

    /// Dispatch configuration
    #[serde(default)]
    pub email: EmailConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL connection URL, credentials included
    #[serde(deserialize_with = "deserialize_secret")]
    pub url: SecretString,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    /// JSON catalogue of email types
    #[serde(default = "default_types_path")]
    pub types_path: PathBuf,

    /// Incoming-mail endpoint; may embed basic auth credentials
    #[serde(default = "default_incoming_url_secret", deserialize_with = "deserialize_secret")]
    pub incoming_url: SecretString,

    /// Recipient used when a stored email has none
    #[serde(default = "default_to")]
    pub default_to: String,

    /// Sender used when a stored email has none
    #[serde(default = "default_from")]
    pub default_from: String,

    /// Pause between two sends
    #[serde(default = "default_send_interval", with = "humantime_serde")]
    pub send_interval: Duration,

    /// Timeout of one send
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            types_path: default_types_path(),
            incoming_url: SecretString::new(default_incoming_url()),
            default_to: default_to(),
            default_from: default_from(),
            send_interval: default_send_interval(),
            timeout: default_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("types_path", &self.types_path)
            .field("incoming_url", &"[REDACTED]")
            .field("default_to", &self.default_to)
            .field("default_from", &self.default_from)
            .field("send_interval", &self.send_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::new)
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8082
}

fn default_max_connections() -> u32 {
    5
}

fn default_types_path() -> PathBuf {
    PathBuf::from("config/email_types.json")
}

fn default_incoming_url() -> String {
    "http://localhost:8000/email/incoming".into()
}

fn default_incoming_url_secret() -> SecretString {
    SecretString::new(default_incoming_url())
}

fn default_to() -> String {
    "test@mail.scorimmo.com".into()
}

fn default_from() -> String {
    "error@scorimmo.com".into()
}

fn default_send_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
