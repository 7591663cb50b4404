//! Service endpoints.

use super::Gateway;
use crate::error::ApiError;
use crate::mapper::RawRecord;
use crate::types::Criteria;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

const SERVICES_PATH: &str = "/gw/provisioning/api/via-services";
const SERVICE_SEARCH_PATH: &str = "/gw/provisioning/api/via-services/stats/v2";

#[derive(Clone)]
pub struct ServiceRepository {
    gateway: Gateway,
}

impl ServiceRepository {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Fetch one service by identifier.
    #[instrument(skip(self, token))]
    pub async fn find(&self, token: &SecretString, id: i64) -> Result<RawRecord, ApiError> {
        let request = self
            .gateway
            .client()
            .get(self.gateway.url(&format!("{}/{}", SERVICES_PATH, id), None))
            .bearer_auth(token.expose_secret());

        self.gateway
            .execute(request, &format!("Failed to fetch service {}", id))
            .await
    }

    /// Search services.
    #[instrument(skip(self, token))]
    pub async fn find_by(
        &self,
        token: &SecretString,
        criteria: &Criteria,
    ) -> Result<Vec<RawRecord>, ApiError> {
        let request = self
            .gateway
            .client()
            .get(self.gateway.url(SERVICE_SEARCH_PATH, Some(criteria)))
            .bearer_auth(token.expose_secret());

        self.gateway.execute(request, "Failed to fetch services").await
    }

    /// Replace a service with `data`; returns the updated representation.
    #[instrument(skip(self, token, data))]
    pub async fn update(
        &self,
        token: &SecretString,
        id: i64,
        data: &RawRecord,
    ) -> Result<RawRecord, ApiError> {
        let request = self
            .gateway
            .client()
            .put(self.gateway.url(&format!("{}/{}", SERVICES_PATH, id), None))
            .bearer_auth(token.expose_secret())
            .json(data);

        self.gateway
            .execute(request, &format!("Failed to update service {}", id))
            .await
    }

    /// Create a service; returns the created representation.
    #[instrument(skip(self, token, data))]
    pub async fn create(&self, token: &SecretString, data: &RawRecord) -> Result<RawRecord, ApiError> {
        let request = self
            .gateway
            .client()
            .post(self.gateway.url(SERVICES_PATH, None))
            .bearer_auth(token.expose_secret())
            .json(data);

        self.gateway.execute(request, "Failed to create service").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use serde_json::json;
    use std::error::Error as _;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repository(server: &MockServer) -> ServiceRepository {
        ServiceRepository::new(Gateway::new(Client::new(), server.uri()))
    }

    fn token() -> SecretString {
        SecretString::new("test-token".into())
    }

    #[tokio::test]
    async fn test_find() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gw/provisioning/api/via-services/42"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42, "label": "Main"})))
            .mount(&server)
            .await;

        let raw = repository(&server).find(&token(), 42).await.unwrap();
        assert_eq!(raw["label"], json!("Main"));
    }

    #[tokio::test]
    async fn test_find_by_encodes_criteria() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gw/provisioning/api/via-services/stats/v2"))
            .and(query_param("size", "500"))
            .and(query_param("filter", "eq,enable,true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .mount(&server)
            .await;

        let criteria = Criteria::paged(500, 0).filter("eq,enable,true");
        let raws = repository(&server).find_by(&token(), &criteria).await.unwrap();
        assert_eq!(raws.len(), 2);
    }

    #[tokio::test]
    async fn test_update_sends_payload() {
        let server = MockServer::start().await;
        let payload = json!({"id": 42, "label": "Renamed"});
        Mock::given(method("PUT"))
            .and(path("/gw/provisioning/api/via-services/42"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
            .expect(1)
            .mount(&server)
            .await;

        let data = payload.as_object().unwrap().clone();
        let raw = repository(&server).update(&token(), 42, &data).await.unwrap();
        assert_eq!(raw["label"], json!("Renamed"));
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gw/provisioning/api/via-services/7"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such service"))
            .mount(&server)
            .await;

        let err = repository(&server).find(&token(), 7).await.unwrap_err();
        assert!(!err.is_authentication());
        assert_eq!(err.code(), Some(404));
        assert_eq!(
            err.to_string(),
            "ViaDialog API error: Failed to fetch service 7: HTTP 404 - no such service"
        );
    }

    #[tokio::test]
    async fn test_decode_failure_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gw/provisioning/api/via-services/7"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = repository(&server).find(&token(), 7).await.unwrap_err();
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }

    #[tokio::test]
    async fn test_connection_refused_is_wrapped() {
        let repository = ServiceRepository::new(Gateway::new(Client::new(), "http://127.0.0.1:1"));

        let err = repository.find(&token(), 1).await.unwrap_err();
        assert!(!err.is_authentication());
        let source = err.source().unwrap();
        let http = source.downcast_ref::<reqwest::Error>().unwrap();
        assert!(http.is_connect());
    }
}
