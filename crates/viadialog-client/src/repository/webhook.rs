//! Webhook endpoints.

use super::Gateway;
use crate::error::ApiError;
use crate::mapper::RawRecord;
use crate::types::Criteria;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

const WEBHOOKS_PATH: &str = "/gw/webhook/api/via-webhooks";

#[derive(Clone)]
pub struct WebhookRepository {
    gateway: Gateway,
}

impl WebhookRepository {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self, token))]
    pub async fn find_all(
        &self,
        token: &SecretString,
        criteria: &Criteria,
    ) -> Result<Vec<RawRecord>, ApiError> {
        let request = self
            .gateway
            .client()
            .get(self.gateway.url(WEBHOOKS_PATH, Some(criteria)))
            .bearer_auth(token.expose_secret());

        self.gateway.execute(request, "Failed to fetch webhooks").await
    }

    /// Replace a webhook; the payload carries its `id`.
    #[instrument(skip(self, token, data))]
    pub async fn update(&self, token: &SecretString, data: &RawRecord) -> Result<RawRecord, ApiError> {
        let request = self
            .gateway
            .client()
            .put(self.gateway.url(WEBHOOKS_PATH, None))
            .bearer_auth(token.expose_secret())
            .json(data);

        self.gateway.execute(request, "Failed to update webhook").await
    }
}
