//! Per-prompt input validation.
//!
//! Rules are checked in a fixed order: required fields, then the
//! at-least-one group, then minimum lengths. The first violation is
//! returned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Input values of a prompt, by field name.
pub type PromptData = BTreeMap<String, String>;

/// The rule a field broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Required,
    /// None of these fields has a value.
    AtLeastOne(Vec<String>),
    /// Shorter than this many characters.
    MinLength(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub rule: Rule,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Rule::Required => write!(f, "The field '{}' is required", self.field),
            Rule::AtLeastOne(fields) => write!(
                f,
                "At least one of these fields must be filled: {}",
                fields.join(", ")
            ),
            Rule::MinLength(n) => write!(
                f,
                "The field '{}' must contain at least {} characters",
                self.field, n
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation section of a prompt definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub at_least_one: Vec<String>,
    #[serde(default)]
    pub min_length: BTreeMap<String, usize>,
}

impl ValidationRules {
    pub fn validate(&self, data: &PromptData) -> Result<(), ValidationError> {
        for field in &self.required_fields {
            if !has_value(data, field) {
                return Err(ValidationError {
                    field: field.clone(),
                    rule: Rule::Required,
                });
            }
        }

        if !self.at_least_one.is_empty() && !self.at_least_one.iter().any(|f| has_value(data, f)) {
            return Err(ValidationError {
                field: self.at_least_one.join(", "),
                rule: Rule::AtLeastOne(self.at_least_one.clone()),
            });
        }

        for (field, &min) in &self.min_length {
            // Absent fields are the business of the other rules.
            if let Some(value) = data.get(field) {
                if value.chars().count() < min {
                    return Err(ValidationError {
                        field: field.clone(),
                        rule: Rule::MinLength(min),
                    });
                }
            }
        }

        Ok(())
    }
}

fn has_value(data: &PromptData, field: &str) -> bool {
    data.get(field).is_some_and(|v| !v.trim().is_empty())
}
