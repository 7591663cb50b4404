//! Fetch-then-replay orchestration.

use crate::error::DispatchError;
use crate::sink::{EmailSink, SendOutcome};
use crate::source::EmailSource;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Most emails replayed by one request.
pub const MAX_QUANTITY: u32 = 20;

/// Outcome of one dispatch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    pub message: String,
    pub emails_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    pub results: Vec<SendOutcome>,
}

/// Replays stored emails of one type against the sink.
pub struct EmailTestSender {
    source: Arc<dyn EmailSource>,
    sink: Arc<dyn EmailSink>,
    interval: Duration,
}

impl EmailTestSender {
    pub fn new(source: Arc<dyn EmailSource>, sink: Arc<dyn EmailSink>) -> Self {
        Self {
            source,
            sink,
            interval: Duration::from_millis(500),
        }
    }

    /// Pause between two sends.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetch up to `quantity` emails from the last `days` days and send them
    /// one after the other.
    #[instrument(skip(self))]
    pub async fn fetch_and_send(
        &self,
        email_type: &str,
        quantity: u32,
        days: u32,
    ) -> Result<DispatchReport, DispatchError> {
        let limit = quantity.clamp(1, MAX_QUANTITY);
        let days = days.max(1);

        let emails = self.source.fetch(email_type, limit, days).await?;
        if emails.is_empty() {
            info!("No email found");
            return Ok(DispatchReport {
                success: false,
                message: "No email found for this type and period".into(),
                emails_found: 0,
                success_count: None,
                results: Vec::new(),
            });
        }

        let mut results = Vec::with_capacity(emails.len());
        for (index, email) in emails.iter().enumerate() {
            if index > 0 && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }
            results.push(self.sink.send(email).await);
        }

        let success_count = results.iter().filter(|r| r.success).count();
        info!(emails_found = emails.len(), success_count, "Dispatch finished");

        Ok(DispatchReport {
            success: true,
            message: format!(
                "{} email(s) sent successfully out of {}",
                success_count,
                emails.len()
            ),
            emails_found: emails.len(),
            success_count: Some(success_count),
            results,
        })
    }
}
