//! Shared helpers for the client integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use viadialog_client::{Clock, ViaDialogClient, ViaDialogConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Clock advanced by hand.
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn test_config(server: &MockServer) -> ViaDialogConfig {
    ViaDialogConfig::new("user", "secret", "acme", "password", "acme-slug")
        .with_base_url(server.uri())
}

pub fn test_client(server: &MockServer, clock: Arc<TestClock>) -> ViaDialogClient {
    ViaDialogClient::with_clock(&test_config(server), clock).unwrap()
}

/// Token endpoint issuing `token` valid for `expires_in` seconds, expected
/// to be hit `times` times.
pub async fn mock_login(server: &MockServer, token: &str, expires_in: i64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/gw/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": expires_in
        })))
        .expect(times)
        .mount(server)
        .await;
}

pub fn service_42() -> serde_json::Value {
    json!({
        "id": 42,
        "label": "Main",
        "product": "voice",
        "enable": true,
        "sdaLists": [{
            "id": 1,
            "sdaNumber": "0100000001",
            "enable": true,
            "releasedDate": "2024-01-01T00:00:00+00:00"
        }]
    })
}
