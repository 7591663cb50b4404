//! Generative-text providers.
//!
//! A [`ProviderKind`] names the backend; [`create_provider`] maps it to the
//! matching constructor.

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::error::PromptError;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    /// Model used when a prompt names this provider but no model.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(PromptError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-prompt overrides of the default provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Provider settings after applying a prompt's overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().into(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig {
    /// This configuration with `overrides` applied on top.
    ///
    /// Switching provider without naming a model picks that provider's
    /// default model.
    pub fn merge(&self, overrides: &ProviderOverrides) -> Result<Self, PromptError> {
        let provider = match &overrides.provider {
            Some(name) => name.parse()?,
            None => self.provider,
        };
        let model = match &overrides.model {
            Some(model) => model.clone(),
            None if provider != self.provider => provider.default_model().to_string(),
            None => self.model.clone(),
        };

        Ok(Self {
            provider,
            model,
            temperature: overrides.temperature.unwrap_or(self.temperature),
            max_tokens: overrides.max_tokens.unwrap_or(self.max_tokens),
            timeout: overrides
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(self.timeout),
        })
    }
}

/// Provider API keys.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub openai: Option<SecretString>,
    pub gemini: Option<SecretString>,
}

impl ProviderKeys {
    /// Read `OPENAI_API_KEY` and `GEMINI_API_KEY`, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            openai: env_secret("OPENAI_API_KEY"),
            gemini: env_secret("GEMINI_API_KEY"),
        }
    }
}

fn env_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::new)
}

/// Base URLs of the provider APIs.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub gemini: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: DEFAULT_OPENAI_URL.into(),
            gemini: DEFAULT_GEMINI_URL.into(),
        }
    }
}

/// A backend turning a prompt into text.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, PromptError>;
}

/// Build the provider `config` names.
pub fn create_provider(
    config: &ProviderConfig,
    keys: &ProviderKeys,
    endpoints: &ProviderEndpoints,
) -> Result<Box<dyn AiProvider>, PromptError> {
    match config.provider {
        ProviderKind::OpenAi => {
            let key = keys
                .openai
                .clone()
                .ok_or_else(|| PromptError::NotConfigured("OPENAI_API_KEY is not set".into()))?;
            Ok(Box::new(OpenAiProvider::new(key, &endpoints.openai, config)?))
        }
        ProviderKind::Gemini => {
            let key = keys
                .gemini
                .clone()
                .ok_or_else(|| PromptError::NotConfigured("GEMINI_API_KEY is not set".into()))?;
            Ok(Box::new(GeminiProvider::new(key, &endpoints.gemini, config)?))
        }
    }
}
