//! Prompt definitions keyed by name.

use crate::error::PromptError;
use crate::provider::ProviderOverrides;
use crate::validation::ValidationRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One named prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    #[serde(default)]
    pub description: Option<String>,
    /// Instruction appended after the formatted input data.
    pub prompt: String,
    #[serde(default)]
    pub config: ProviderOverrides,
    #[serde(default)]
    pub validation: ValidationRules,
    /// `json` when the prompt asks for a JSON object back.
    #[serde(default)]
    pub response_format: Option<String>,
}

/// All prompts, as read from the catalogue file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptCatalog {
    prompts: BTreeMap<String, PromptDefinition>,
}

impl PromptCatalog {
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        serde_json::from_str(json)
            .map_err(|e| PromptError::Catalog(format!("Invalid prompt catalogue: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PromptError::Catalog(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PromptDefinition)> {
        self.prompts.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: PromptDefinition) {
        self.prompts.insert(name.into(), definition);
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
