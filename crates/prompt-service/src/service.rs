//! Prompt execution.

use crate::catalog::{PromptCatalog, PromptDefinition};
use crate::error::PromptError;
use crate::provider::{
    create_provider, AiProvider, ProviderConfig, ProviderEndpoints, ProviderKeys, ProviderKind,
};
use crate::validation::PromptData;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument};

/// Public view of a catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptInfo {
    pub name: String,
    pub description: Option<String>,
    pub config: ProviderConfig,
    pub response_format: String,
}

/// Whether a provider has a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub configured: bool,
}

/// Runs catalogue prompts against the configured providers.
///
/// Providers are built lazily and reused per prompt name.
pub struct PromptService {
    catalog: PromptCatalog,
    defaults: ProviderConfig,
    keys: ProviderKeys,
    endpoints: ProviderEndpoints,
    providers: Mutex<HashMap<String, Arc<dyn AiProvider>>>,
}

impl PromptService {
    pub fn new(catalog: PromptCatalog, keys: ProviderKeys) -> Self {
        Self {
            catalog,
            defaults: ProviderConfig::default(),
            keys,
            endpoints: ProviderEndpoints::default(),
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_defaults(mut self, defaults: ProviderConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Validate `data`, run the prompt and parse what comes back.
    ///
    /// JSON found in the completion is returned as is; anything else is
    /// wrapped as `{"response": text}`.
    #[instrument(skip(self, data))]
    pub async fn execute_prompt(&self, name: &str, data: &PromptData) -> Result<Value, PromptError> {
        let definition = self.definition(name)?;
        definition.validation.validate(data)?;

        if definition.prompt.trim().is_empty() {
            return Err(PromptError::EmptyPrompt);
        }

        let provider = self.provider_for(name, definition)?;
        info!(provider = %provider.kind(), model = provider.model(), "Executing prompt");

        let text = provider.generate(&format_prompt(&definition.prompt, data)).await?;
        Ok(parse_response(&text))
    }

    pub fn available_prompts(&self) -> Vec<String> {
        self.catalog.names().map(str::to_string).collect()
    }

    pub fn prompt_info(&self, name: &str) -> Result<PromptInfo, PromptError> {
        let definition = self.definition(name)?;
        Ok(PromptInfo {
            name: name.to_string(),
            description: definition.description.clone(),
            config: self.defaults.merge(&definition.config)?,
            response_format: definition
                .response_format
                .clone()
                .unwrap_or_else(|| "text".into()),
        })
    }

    pub fn provider_info(&self) -> Vec<ProviderStatus> {
        ProviderKind::ALL
            .into_iter()
            .map(|provider| ProviderStatus {
                provider,
                configured: match provider {
                    ProviderKind::OpenAi => self.keys.openai.is_some(),
                    ProviderKind::Gemini => self.keys.gemini.is_some(),
                },
            })
            .collect()
    }

    fn definition(&self, name: &str) -> Result<&PromptDefinition, PromptError> {
        self.catalog
            .get(name)
            .ok_or_else(|| PromptError::UnknownPrompt(name.to_string()))
    }

    fn provider_for(
        &self,
        name: &str,
        definition: &PromptDefinition,
    ) -> Result<Arc<dyn AiProvider>, PromptError> {
        let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(provider) = providers.get(name) {
            return Ok(provider.clone());
        }

        let config = self.defaults.merge(&definition.config)?;
        let provider: Arc<dyn AiProvider> = create_provider(&config, &self.keys, &self.endpoints)?.into();
        debug!(prompt = name, provider = %config.provider, "Provider created");
        providers.insert(name.to_string(), provider.clone());
        Ok(provider)
    }
}

/// The input data as `Key: value` lines, a blank line, then the instruction.
pub fn format_prompt(prompt: &str, data: &PromptData) -> String {
    let mut formatted = String::from("Data to process:\n");
    for (key, value) in data {
        let _ = writeln!(formatted, "{}: {}", capitalize(key), value);
    }
    formatted.push('\n');
    formatted.push_str(prompt);
    formatted
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extract a JSON object from a completion, unwrapping code fences.
pub fn parse_response(text: &str) -> Value {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return value;
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return value;
            }
        }
    }

    json!({ "response": text.trim() })
}
