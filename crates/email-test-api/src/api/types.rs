//! API request and response types.

use crate::dispatch::MAX_QUANTITY;
use crate::error::DispatchError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_QUANTITY: u32 = 1;
const DEFAULT_DAYS: u32 = 20;

/// Validated body of `POST /api/send-emails`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEmailsRequest {
    pub email_type: String,
    pub quantity: u32,
    pub days: u32,
}

impl SendEmailsRequest {
    /// Parse and validate a raw body.
    ///
    /// Checks run in order and the first failure wins: JSON syntax, then
    /// `email_type`, then `quantity`, then `days`.
    pub fn parse(body: &[u8]) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_slice(body)?;
        let Value::Object(fields) = value else {
            return Err(DispatchError::InvalidJson("expected a JSON object".into()));
        };

        let email_type = match fields.get("email_type") {
            None | Some(Value::Null) => {
                return Err(DispatchError::validation(
                    "email_type",
                    "required",
                    "The email_type parameter is required",
                ))
            }
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(_) => {
                return Err(DispatchError::validation(
                    "email_type",
                    "string",
                    "The email_type parameter must be a non-empty string",
                ))
            }
        };

        let quantity = match integer(fields.get("quantity"), "quantity")? {
            None => DEFAULT_QUANTITY,
            Some(q) if (1..=i64::from(MAX_QUANTITY)).contains(&q) => q as u32,
            Some(_) => {
                return Err(DispatchError::validation(
                    "quantity",
                    "range",
                    format!("Quantity must be between 1 and {}", MAX_QUANTITY),
                ))
            }
        };

        let days = match integer(fields.get("days"), "days")? {
            None => DEFAULT_DAYS,
            Some(d) => d.clamp(1, i64::from(u32::MAX)) as u32,
        };

        Ok(Self {
            email_type,
            quantity,
            days,
        })
    }
}

/// An integer given as a JSON number or a numeric string.
fn integer(value: Option<&Value>, field: &'static str) -> Result<Option<i64>, DispatchError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    parsed.map(Some).ok_or_else(|| {
        DispatchError::validation(field, "integer", format!("The {} parameter must be an integer", field))
    })
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Available email types, key to label.
#[derive(Debug, Serialize)]
pub struct EmailTypesResponse {
    pub types: BTreeMap<String, String>,
}
