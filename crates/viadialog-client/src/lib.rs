//! Client for the ViaDialog provisioning API.
//!
//! [`ViaDialogClient`] authenticates lazily, talks to the API through thin
//! repositories and maps raw records into [`Line`] and [`Service`] entities.

mod auth;
mod client;
mod config;
mod entity;
mod error;
mod mapper;
mod repository;
mod types;
mod updater;

pub use auth::{Authenticator, Clock, Credentials, SystemClock, TokenSettings, TokenState};
pub use client::ViaDialogClient;
pub use config::ViaDialogConfig;
pub use entity::{Line, Service, STATUS_ACTIVE, STATUS_INACTIVE};
pub use error::{
    ApiError, ApiErrorKind, BoxError, Error, MappingError, RequestDiagnostics, ResponseDiagnostics,
    Result,
};
pub use mapper::{LineMapper, RawRecord, ServiceMapper};
pub use repository::{Gateway, LineRepository, ServiceRepository, WebhookRepository};
pub use types::{
    AttachmentOutcome, Criteria, LineAddition, LineRemoval, ServicePayload, WebhookAttachment,
};
pub use updater::{
    parse_service_ids, ScriptPatch, ServiceModifications, ServiceUpdater, UpdateOutcome,
    UpdateReport,
};
