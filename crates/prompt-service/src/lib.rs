//! Catalogue-driven prompt execution.
//!
//! Prompts are declared in a JSON catalogue with their input validation and
//! provider overrides. [`PromptService`] validates the caller's data, sends
//! the formatted prompt to OpenAI or Gemini and parses the completion.

pub mod catalog;
pub mod error;
pub mod provider;
pub mod service;
pub mod validation;

pub use catalog::{PromptCatalog, PromptDefinition};
pub use error::PromptError;
pub use provider::{
    create_provider, AiProvider, ProviderConfig, ProviderEndpoints, ProviderKeys, ProviderKind,
    ProviderOverrides,
};
pub use service::{parse_response, PromptInfo, PromptService, ProviderStatus};
pub use validation::{PromptData, Rule, ValidationError, ValidationRules};
