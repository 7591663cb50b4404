//! Request and response types for the ViaDialog API.

use crate::entity::Service;
use crate::mapper::{RawRecord, ServiceMapper};
use serde::Deserialize;
use std::collections::BTreeMap;
use urlencoding::encode;

/// Flat query criteria.
///
/// Keys are serialized in sorted order; repeated values for one key keep
/// insertion order (`filter=a&filter=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    params: BTreeMap<String, Vec<String>>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// `size` and `page` paging criteria.
    pub fn paged(size: u32, page: u32) -> Self {
        Self::new().with("size", size).with("page", page)
    }

    /// Ask the provider for the whole collection.
    pub fn unpaged() -> Self {
        Self::new().with("unpaged", true)
    }

    /// Set `key`, replacing any previous values.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), vec![value.to_string()]);
        self
    }

    /// Add one more value for `key`.
    pub fn append(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params
            .entry(key.into())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Add a provider filter expression, e.g. `eq,enable,true`.
    pub fn filter(self, expression: impl ToString) -> Self {
        self.append("filter", expression)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Key/value pairs in serialization order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// URL-encoded query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Body of a service update: either an entity or a raw record.
#[derive(Debug, Clone)]
pub enum ServicePayload {
    Entity(Service),
    Raw(RawRecord),
}

impl ServicePayload {
    /// Raw form sent to the API.
    pub fn into_raw(self) -> RawRecord {
        match self {
            ServicePayload::Entity(service) => ServiceMapper.map_to_array(&service),
            ServicePayload::Raw(raw) => raw,
        }
    }
}

impl From<Service> for ServicePayload {
    fn from(service: Service) -> Self {
        ServicePayload::Entity(service)
    }
}

impl From<&Service> for ServicePayload {
    fn from(service: &Service) -> Self {
        ServicePayload::Entity(service.clone())
    }
}

impl From<RawRecord> for ServicePayload {
    fn from(raw: RawRecord) -> Self {
        ServicePayload::Raw(raw)
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    /// Declared lifetime in seconds.
    pub expires_in: Option<i64>,
}

/// What happened to one webhook when attaching a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// The service was added and the webhook updated.
    Added,
    /// The webhook already listed the service; nothing was sent.
    AlreadyPresent,
    /// No webhook with that id exists.
    NotFound,
}

/// Per-webhook result of [`crate::ViaDialogClient::add_service_to_webhooks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAttachment {
    pub webhook_id: i64,
    pub webhook_label: Option<String>,
    pub outcome: AttachmentOutcome,
}

impl WebhookAttachment {
    pub fn is_success(&self) -> bool {
        self.outcome != AttachmentOutcome::NotFound
    }
}

/// Result of [`crate::ViaDialogClient::add_lines_to_service`].
#[derive(Debug, Clone, PartialEq)]
pub struct LineAddition {
    /// Numbers appended to the service, in request order.
    pub added: Vec<String>,
    /// Requested numbers the service already carried; not sent again.
    pub already_present: Vec<String>,
    /// Line entries on the service before the update.
    pub lines_before: usize,
    /// Updated service as returned by the API. `None` when nothing was sent.
    pub service: Option<RawRecord>,
}

impl LineAddition {
    pub fn is_success(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Result of [`crate::ViaDialogClient::remove_lines_from_service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRemoval {
    pub lines_before: usize,
    pub removed: usize,
    /// Updates sent; a service without lines still costs one to disable it.
    pub batches: usize,
}
