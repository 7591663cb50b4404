//! Line (SDA) search endpoint.
//!
//! Provider-side rejections of line searches are hard to reproduce, so a
//! failure here records the full outbound request and, when one arrived, the
//! response. The record is logged and attached as the error's source.

use super::{truncate, Gateway};
use crate::error::{ApiError, RequestDiagnostics, ResponseDiagnostics};
use crate::mapper::RawRecord;
use crate::types::Criteria;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

const LINES_PATH: &str = "/gw/provisioning/api/sdas";
const CONTEXT: &str = "Failed to fetch lines";

#[derive(Clone)]
pub struct LineRepository {
    gateway: Gateway,
}

impl LineRepository {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Search lines.
    #[instrument(skip(self, token))]
    pub async fn find_by(
        &self,
        token: &SecretString,
        criteria: &Criteria,
    ) -> Result<Vec<RawRecord>, ApiError> {
        let request = self
            .gateway
            .client()
            .get(self.gateway.url(LINES_PATH, Some(criteria)))
            .bearer_auth(token.expose_secret())
            .build()
            .map_err(|e| ApiError::new(format!("{}: {}", CONTEXT, e)).with_source(e))?;

        let diagnostics = RequestDiagnostics::new(
            request.method().to_string(),
            request.url().to_string(),
            redacted_headers(request.headers()),
        );
        debug!(method = %diagnostics.method, uri = %diagnostics.uri, "Sending line search");

        let response = match self.gateway.client().execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("{}: {}", CONTEXT, e);
                return Err(fail(message, diagnostics.with_source(e), None));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let message = format!("{}: {}", CONTEXT, e);
                return Err(fail(message, diagnostics.with_source(e), None));
            }
        };

        if !status.is_success() {
            let message = format!("{}: HTTP {} - {}", CONTEXT, status.as_u16(), truncate(&body));
            let response = ResponseDiagnostics {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            };
            return Err(fail(
                message,
                diagnostics.with_response(response),
                Some(status.as_u16()),
            ));
        }

        match serde_json::from_str(&body) {
            Ok(records) => Ok(records),
            Err(e) => {
                let message = format!("{}: invalid response body: {}", CONTEXT, e);
                let response = ResponseDiagnostics {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                    body,
                };
                Err(fail(message, diagnostics.with_response(response).with_source(e), None))
            }
        }
    }
}

fn fail(message: String, diagnostics: RequestDiagnostics, code: Option<u16>) -> ApiError {
    error!(
        method = %diagnostics.method,
        uri = %diagnostics.uri,
        headers = ?diagnostics.headers,
        status = ?diagnostics.response.as_ref().map(|r| r.status),
        reason = ?diagnostics.response.as_ref().map(|r| r.reason.as_str()),
        body = ?diagnostics.response.as_ref().map(|r| truncate(&r.body)),
        "{}",
        message
    );

    let err = ApiError::new(message).with_source(diagnostics);
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION {
                "Bearer [REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), value)
        })
        .collect()
}
