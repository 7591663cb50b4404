//! Email type catalogue.
//!
//! Each type names the stored emails it matches through LIKE searches on
//! columns of the received-mail table.

use crate::error::DispatchError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

const LIKE: &str = "LIKE";

/// One search over a column.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SearchMethod {
    pub field: String,
    pub pattern: String,
    pub operator: String,
}

impl SearchMethod {
    pub fn is_like(&self) -> bool {
        self.operator == LIKE
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EmailType {
    pub label: String,
    #[serde(default)]
    pub search_methods: Vec<SearchMethod>,
}

impl EmailType {
    /// Searches taking part in the query. Other operators are ignored.
    pub fn like_searches(&self) -> impl Iterator<Item = &SearchMethod> {
        self.search_methods.iter().filter(|m| m.is_like())
    }
}

/// Email types by key.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EmailTypeCatalog {
    types: BTreeMap<String, EmailType>,
}

impl EmailTypeCatalog {
    /// Parse a catalogue, rejecting field names that are not SQL identifiers.
    pub fn from_json(json: &str) -> Result<Self, DispatchError> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| DispatchError::Catalog(format!("invalid catalogue: {}", e)))?;

        for (key, email_type) in &catalog.types {
            for method in &email_type.search_methods {
                if !is_identifier(&method.field) {
                    return Err(DispatchError::Catalog(format!(
                        "email type `{}` searches invalid field `{}`",
                        key, method.field
                    )));
                }
                if !method.is_like() {
                    warn!(email_type = %key, operator = %method.operator, "Ignoring unsupported search operator");
                }
            }
        }

        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), types = catalog.types.len(), "Loaded email types");
        Ok(catalog)
    }

    pub fn get(&self, key: &str) -> Option<&EmailType> {
        self.types.get(key)
    }

    /// Type key to label.
    pub fn labels(&self) -> BTreeMap<&str, &str> {
        self.types
            .iter()
            .map(|(key, t)| (key.as_str(), t.label.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
