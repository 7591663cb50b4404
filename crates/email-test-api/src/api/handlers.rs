//! HTTP request handlers.

use super::types::{EmailTypesResponse, HealthResponse, SendEmailsRequest};
use super::AppState;
use crate::dispatch::DispatchReport;
use crate::error::DispatchError;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use tracing::{error, info, warn};

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Fetch stored emails of a type and replay them.
pub async fn send_emails(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DispatchReport>, DispatchError> {
    let request = SendEmailsRequest::parse(&body).inspect_err(|e| {
        warn!("Rejected send-emails request: {}", e);
    })?;

    info!(
        email_type = %request.email_type,
        quantity = request.quantity,
        days = request.days,
        "Send-emails request received"
    );

    let report = state
        .sender
        .fetch_and_send(&request.email_type, request.quantity, request.days)
        .await
        .inspect_err(|e| error!(email_type = %request.email_type, "Dispatch failed: {}", e))?;

    Ok(Json(report))
}

/// Email types the service knows about.
pub async fn email_types(State(state): State<AppState>) -> Json<EmailTypesResponse> {
    let types = state
        .catalog
        .labels()
        .into_iter()
        .map(|(key, label)| (key.to_string(), label.to_string()))
        .collect();

    Json(EmailTypesResponse { types })
}

/// Bare OPTIONS requests; CORS headers come from the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> DispatchError {
    DispatchError::MethodNotAllowed
}
