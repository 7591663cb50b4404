//! ViaDialog provisioning client.

use crate::auth::{Authenticator, Clock, SystemClock};
use crate::config::ViaDialogConfig;
use crate::entity::{Line, Service};
use crate::error::{ApiError, Result};
use crate::mapper::{LineMapper, RawRecord, ServiceMapper};
use crate::repository::{Gateway, LineRepository, ServiceRepository, WebhookRepository};
use crate::types::{
    AttachmentOutcome, Criteria, LineAddition, LineRemoval, ServicePayload, WebhookAttachment,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Handoff profile given to lines attached through
/// [`ViaDialogClient::add_lines_to_service`].
const DEFAULT_HANDOFF: &str = "handoff1";

const UNAUTHORIZED: u16 = 401;

/// Entry point to the provisioning API.
///
/// Every operation first makes sure a valid bearer token is held, then makes
/// one call through a repository and maps the result. Failures are returned
/// unchanged; nothing is retried here.
#[derive(Clone)]
pub struct ViaDialogClient {
    auth: Arc<Authenticator>,
    services: ServiceRepository,
    lines: LineRepository,
    webhooks: WebhookRepository,
    service_mapper: ServiceMapper,
    line_mapper: LineMapper,
    company_id: i64,
}

impl ViaDialogClient {
    /// Create a new client. No request is made until the first operation.
    pub fn new(config: &ViaDialogConfig) -> std::result::Result<Self, ApiError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client whose token expiry is judged by `clock`.
    pub fn with_clock(
        config: &ViaDialogConfig,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::new(format!("Failed to create HTTP client: {}", e)).with_source(e))?;

        let gateway = Gateway::new(client.clone(), config.base_url.clone());
        let auth = Authenticator::new(
            client,
            gateway.base_url(),
            config.credentials(),
            config.token_settings(),
        )
        .with_clock(clock);

        Ok(Self {
            auth: Arc::new(auth),
            services: ServiceRepository::new(gateway.clone()),
            lines: LineRepository::new(gateway.clone()),
            webhooks: WebhookRepository::new(gateway),
            service_mapper: ServiceMapper,
            line_mapper: LineMapper,
            company_id: config.company_id,
        })
    }

    /// The token manager shared by every clone of this client.
    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Exchange credentials now instead of on first use.
    pub async fn authenticate(&self) -> Result<()> {
        self.auth.access_token().await?;
        Ok(())
    }

    /// All lines, unpaged. Fails on the first malformed record.
    pub async fn get_line_list(&self) -> Result<Vec<Line>> {
        self.get_line_list_by(&Criteria::unpaged()).await
    }

    /// Lines matching `criteria`. Fails on the first malformed record.
    #[instrument(skip(self))]
    pub async fn get_line_list_by(&self, criteria: &Criteria) -> Result<Vec<Line>> {
        let token = self.auth.access_token().await?;
        let raws = self.checked(self.lines.find_by(&token, criteria).await).await?;
        Ok(self.line_mapper.map_all(&raws)?)
    }

    #[instrument(skip(self))]
    pub async fn get_service(&self, id: i64) -> Result<Service> {
        let token = self.auth.access_token().await?;
        let raw = self.checked(self.services.find(&token, id).await).await?;
        Ok(self.service_mapper.map_to_entity(&raw)?)
    }

    /// Services matching `criteria`. Fails on the first malformed record.
    #[instrument(skip(self))]
    pub async fn get_service_list(&self, criteria: &Criteria) -> Result<Vec<Service>> {
        let token = self.auth.access_token().await?;
        let raws = self.checked(self.services.find_by(&token, criteria).await).await?;
        Ok(self.service_mapper.map_all(&raws)?)
    }

    /// The service exactly as the provider returns it, including fields the
    /// entity does not model.
    #[instrument(skip(self))]
    pub async fn get_service_details(&self, id: i64) -> Result<RawRecord> {
        let token = self.auth.access_token().await?;
        Ok(self.checked(self.services.find(&token, id).await).await?)
    }

    /// Update a service from an entity or a raw record.
    #[instrument(skip(self, data))]
    pub async fn update_service(&self, id: i64, data: impl Into<ServicePayload>) -> Result<Service> {
        let raw = self.update_service_raw(id, &data.into().into_raw()).await?;
        Ok(self.service_mapper.map_to_entity(&raw)?)
    }

    /// Update a service and return the raw response.
    #[instrument(skip(self, data))]
    pub async fn update_service_raw(&self, id: i64, data: &RawRecord) -> Result<RawRecord> {
        let token = self.auth.access_token().await?;
        let raw = self.checked(self.services.update(&token, id, data).await).await?;
        info!(service_id = id, "Service updated");
        Ok(raw)
    }

    #[instrument(skip(self, data))]
    pub async fn create_service(&self, data: &RawRecord) -> Result<RawRecord> {
        let token = self.auth.access_token().await?;
        let raw = self.checked(self.services.create(&token, data).await).await?;
        info!(service_id = ?raw.get("id"), "Service created");
        Ok(raw)
    }

    /// Attach new numbers to a service, keeping everything else as is.
    ///
    /// Numbers the service already carries (as `commercial` or `technique`)
    /// are reported rather than sent. Nothing is written when no number is
    /// new.
    #[instrument(skip(self))]
    pub async fn add_lines_to_service(&self, id: i64, numbers: &[String]) -> Result<LineAddition> {
        let mut details = self.get_service_details(id).await?;

        let mut entries = match details.remove("sdaLists") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };
        let lines_before = entries.len();

        let mut known = HashSet::new();
        for entry in &entries {
            for key in ["commercial", "technique"] {
                if let Some(number) = entry.get(key).and_then(Value::as_str) {
                    known.insert(number.to_string());
                }
            }
        }

        let (mut added, mut already_present) = (Vec::new(), Vec::new());
        for number in numbers {
            if known.insert(number.clone()) {
                added.push(number.clone());
            } else {
                already_present.push(number.clone());
            }
        }

        if added.is_empty() {
            warn!(service_id = id, "Every requested number is already on the service");
            return Ok(LineAddition {
                added,
                already_present,
                lines_before,
                service: None,
            });
        }

        entries.extend(added.iter().map(|number| {
            json!({
                "noir": number,
                "technique": number,
                "commercial": number,
                "handoff": DEFAULT_HANDOFF,
                "scriptId": null,
                "scriptVersion": null,
                "companyId": self.company_id,
                "weight": null,
                "legacyId": null
            })
        }));
        details.insert("sdaLists".into(), Value::Array(entries));

        let service = self.update_service_raw(id, &details).await?;
        info!(
            service_id = id,
            added = added.len(),
            skipped = already_present.len(),
            "Lines attached to service"
        );

        Ok(LineAddition {
            added,
            already_present,
            lines_before,
            service: Some(service),
        })
    }

    /// Detach every line from a service, `batch_size` lines per update,
    /// then disable it.
    ///
    /// The last update carries `enable: false`; a service without lines gets
    /// that single update. `pause` separates consecutive updates. The first
    /// failing update aborts the removal.
    #[instrument(skip(self))]
    pub async fn remove_lines_from_service(
        &self,
        id: i64,
        batch_size: usize,
        pause: Duration,
    ) -> Result<LineRemoval> {
        let mut details = self.get_service_details(id).await?;

        let mut remaining = match details.remove("sdaLists") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };
        let batch_size = batch_size.max(1);
        let mut removal = LineRemoval {
            lines_before: remaining.len(),
            removed: 0,
            batches: 0,
        };

        loop {
            let count = batch_size.min(remaining.len());
            remaining = remaining.split_off(count);
            let last = remaining.is_empty();

            details.insert("sdaLists".into(), Value::Array(remaining.clone()));
            if last {
                details.insert("enable".into(), Value::Bool(false));
            }
            self.update_service_raw(id, &details).await?;

            removal.removed += count;
            removal.batches += 1;
            debug!(
                service_id = id,
                batch = removal.batches,
                removed = count,
                left = remaining.len(),
                "Line batch removed"
            );

            if last {
                break;
            }
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        info!(
            service_id = id,
            removed = removal.removed,
            batches = removal.batches,
            "Lines removed and service disabled"
        );
        Ok(removal)
    }

    /// One page of webhooks.
    pub async fn list_webhooks(&self, size: u32, page: u32) -> Result<Vec<RawRecord>> {
        let token = self.auth.access_token().await?;
        let result = self
            .webhooks
            .find_all(&token, &Criteria::paged(size, page))
            .await;
        Ok(self.checked(result).await?)
    }

    pub async fn update_webhook(&self, data: &RawRecord) -> Result<RawRecord> {
        let token = self.auth.access_token().await?;
        let raw = self.checked(self.webhooks.update(&token, data).await).await?;
        info!(webhook_id = ?data.get("id"), "Webhook updated");
        Ok(raw)
    }

    /// Subscribe a service to each of `webhook_ids`.
    ///
    /// Webhooks already listing the service are left untouched. Unknown ids
    /// are reported, not treated as errors.
    #[instrument(skip(self))]
    pub async fn add_service_to_webhooks(
        &self,
        service_id: i64,
        webhook_ids: &[i64],
    ) -> Result<Vec<WebhookAttachment>> {
        let webhooks = self.list_webhooks(1000, 0).await?;
        let mut results = Vec::with_capacity(webhook_ids.len());

        for &webhook_id in webhook_ids {
            let Some(webhook) = webhooks
                .iter()
                .find(|w| w.get("id").and_then(Value::as_i64) == Some(webhook_id))
            else {
                warn!(webhook_id, "Webhook not found");
                results.push(WebhookAttachment {
                    webhook_id,
                    webhook_label: None,
                    outcome: AttachmentOutcome::NotFound,
                });
                continue;
            };

            let label = webhook
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string);
            let channels = webhook
                .get("serviceChannelIds")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if channels.iter().any(|id| id.as_i64() == Some(service_id)) {
                info!(service_id, webhook_id, "Service already attached to webhook");
                results.push(WebhookAttachment {
                    webhook_id,
                    webhook_label: label,
                    outcome: AttachmentOutcome::AlreadyPresent,
                });
                continue;
            }

            let mut updated = webhook.clone();
            let mut channels = channels;
            channels.push(json!(service_id));
            updated.insert("serviceChannelIds".into(), Value::Array(channels));
            self.update_webhook(&updated).await?;

            info!(service_id, webhook_id, "Service attached to webhook");
            results.push(WebhookAttachment {
                webhook_id,
                webhook_label: label,
                outcome: AttachmentOutcome::Added,
            });
        }

        Ok(results)
    }

    /// Drop the cached token when the API rejects it, so the next call
    /// exchanges credentials again. The failed call itself is not retried.
    async fn checked<T>(
        &self,
        result: std::result::Result<T, ApiError>,
    ) -> std::result::Result<T, ApiError> {
        if let Err(err) = &result {
            if err.code() == Some(UNAUTHORIZED) {
                warn!("Bearer token rejected, discarding it");
                self.auth.invalidate().await;
            }
        }
        result
    }
}
