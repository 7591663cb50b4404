//! Bulk modification of services.
//!
//! Each service is fetched, patched in place and written back. A failing
//! service is recorded and the batch carries on.

use crate::client::ViaDialogClient;
use crate::error::Error;
use crate::mapper::RawRecord;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Top-level service fields a modification may set.
const STANDARD_FIELDS: [&str; 6] = ["maxUser", "name", "label", "status", "product", "maxLine"];
/// Standard fields sent as integers.
const INTEGER_FIELDS: [&str; 2] = ["maxUser", "maxLine"];
/// Only services of this product carry per-line scripts.
const SCRIPTED_PRODUCT: &str = "VIACONTACT";

const SUCCESS_MESSAGE: &str = "Service updated successfully";
const NOT_FOUND_MESSAGE: &str = "Service not found";
const TIMEOUT_MESSAGE: &str = "Timeout: the request took too long. Check the connection or try again.";

/// Parse a comma separated list of service ids, keeping positive integers.
pub fn parse_service_ids(input: &str) -> Vec<i64> {
    input
        .split(',')
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .collect()
}

/// Script fields copied onto every line of a scripted service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptPatch {
    pub script_id: Option<Value>,
    pub script_version: Option<Value>,
}

impl ScriptPatch {
    pub fn is_empty(&self) -> bool {
        self.script_id.is_none() && self.script_version.is_none()
    }

    fn apply(&self, service: &mut RawRecord) {
        let Some(Value::Array(lines)) = service.get_mut("sdaLists") else {
            return;
        };
        for line in lines.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(id) = &self.script_id {
                line.insert("scriptId".into(), id.clone());
            }
            if let Some(version) = &self.script_version {
                line.insert("scriptVersion".into(), version.clone());
            }
        }
    }
}

/// Changes applied to every service of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceModifications {
    fields: Map<String, Value>,
    script: Option<ScriptPatch>,
}

impl ServiceModifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build modifications from submitted form values.
    ///
    /// Empty values are ignored. `maxUser` and `maxLine` must be integers;
    /// anything else is dropped. Numeric script values are sent as numbers.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let mut modifications = Self::new();

        for field in STANDARD_FIELDS {
            let Some(value) = form.get(field).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
                continue;
            };
            if INTEGER_FIELDS.contains(&field) {
                if let Ok(number) = value.parse::<i64>() {
                    modifications = modifications.set(field, number);
                }
            } else {
                modifications = modifications.set(field, value);
            }
        }

        let script = ScriptPatch {
            script_id: form.get("scriptId").and_then(|v| form_scalar(v)),
            script_version: form.get("scriptVersion").and_then(|v| form_scalar(v)),
        };
        if !script.is_empty() {
            modifications.script = Some(script);
        }

        modifications
    }

    /// Set a top-level field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_script(mut self, script: ScriptPatch) -> Self {
        self.script = Some(script);
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn script(&self) -> Option<&ScriptPatch> {
        self.script.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.script.is_none()
    }

    fn apply(&self, service: &mut RawRecord) {
        for (field, value) in &self.fields {
            service.insert(field.clone(), value.clone());
        }

        if let Some(script) = &self.script {
            let scripted = service.get("product").and_then(Value::as_str) == Some(SCRIPTED_PRODUCT);
            if scripted {
                script.apply(service);
            }
        }
    }
}

fn form_scalar(value: &str) -> Option<Value> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(match value.parse::<i64>() {
        Ok(number) => Value::from(number),
        Err(_) => Value::from(value),
    })
}

/// Result of updating one service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub service_id: i64,
    pub result: Result<String, String>,
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch, in the order the ids were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub outcomes: Vec<UpdateOutcome>,
}

impl UpdateReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Plain text report with one line per service and a summary.
    pub fn render(&self) -> String {
        let mut report = String::from("=== Service update report ===\n\n");

        for outcome in &self.outcomes {
            let _ = match &outcome.result {
                Ok(message) => writeln!(report, "✓ Service {}: {}", outcome.service_id, message),
                Err(message) => writeln!(report, "✗ Service {}: {}", outcome.service_id, message),
            };
        }

        let _ = write!(
            report,
            "\n=== Summary ===\nTotal: {}\nSuccess: {}\nFailures: {}\n",
            self.outcomes.len(),
            self.success_count(),
            self.failure_count()
        );
        report
    }
}

/// Applies one set of modifications to many services.
pub struct ServiceUpdater {
    client: ViaDialogClient,
    pause: Duration,
}

impl ServiceUpdater {
    pub fn new(client: ViaDialogClient) -> Self {
        Self {
            client,
            pause: Duration::from_millis(100),
        }
    }

    /// Delay between two services.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    #[instrument(skip(self, modifications))]
    pub async fn apply(&self, service_ids: &[i64], modifications: &ServiceModifications) -> UpdateReport {
        let mut report = UpdateReport::default();

        for (index, &service_id) in service_ids.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let result = match self.update_one(service_id, modifications).await {
                Ok(true) => {
                    info!(service_id, "Service modifications applied");
                    Ok(SUCCESS_MESSAGE.to_string())
                }
                Ok(false) => Err(NOT_FOUND_MESSAGE.to_string()),
                Err(e) => {
                    error!(service_id, "Service update failed: {}", e);
                    Err(failure_message(&e))
                }
            };
            report.outcomes.push(UpdateOutcome { service_id, result });
        }

        report
    }

    /// Returns `Ok(false)` when the service has no details.
    async fn update_one(
        &self,
        service_id: i64,
        modifications: &ServiceModifications,
    ) -> Result<bool, Error> {
        let mut service = self.client.get_service_details(service_id).await?;
        if service.is_empty() {
            return Ok(false);
        }

        modifications.apply(&mut service);
        self.client.update_service_raw(service_id, &service).await?;
        Ok(true)
    }
}

fn failure_message(err: &Error) -> String {
    let timed_out = err.as_api().is_some_and(|api| api.is_timeout())
        || err.to_string().to_lowercase().contains("timeout");
    if timed_out {
        TIMEOUT_MESSAGE.to_string()
    } else {
        err.to_string()
    }
}
