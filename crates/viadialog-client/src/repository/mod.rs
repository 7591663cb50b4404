//! Thin wrappers around the provisioning endpoints.
//!
//! Repositories return raw records and never map them. Every failure is an
//! [`ApiError`] carrying the operation as context and the transport or decode
//! error as its source.

mod line;
mod service;
mod webhook;

pub use line::LineRepository;
pub use service::ServiceRepository;
pub use webhook::WebhookRepository;

use crate::error::ApiError;
use crate::types::Criteria;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 500;

/// HTTP client plus API base URL, shared by all repositories.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
}

impl Gateway {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for `path`, with `criteria` as query string.
    pub(crate) fn url(&self, path: &str, criteria: Option<&Criteria>) -> String {
        match criteria.filter(|c| !c.is_empty()) {
            Some(criteria) => format!("{}{}?{}", self.base_url, path, criteria.to_query_string()),
            None => format!("{}{}", self.base_url, path),
        }
    }

    /// Send `request` and decode a successful JSON body.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            warn!("{}: {}", context, e);
            ApiError::new(format!("{}: {}", context, e)).with_source(e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::new(format!("{}: {}", context, e)).with_source(e))?;

        if !status.is_success() {
            warn!(%status, "{}: request rejected", context);
            return Err(ApiError::new(format!(
                "{}: HTTP {} - {}",
                context,
                status.as_u16(),
                truncate(&body)
            ))
            .with_code(status.as_u16()));
        }

        debug!("Response body: {}", truncate(&body));
        decode(&body, context)
    }
}

fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        ApiError::new(format!("{}: invalid response body: {}", context, e)).with_source(e)
    })
}

pub(crate) fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
