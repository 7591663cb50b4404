//! Delivery of emails to the incoming-mail endpoint.

use crate::error::DispatchError;
use crate::source::ReceivedEmail;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const SUBJECT_PREFIX: &str = "TECH : ";
const DEFAULT_SUBJECT: &str = "Test email";
const REPLY_PLAIN: &str = "Message reply if found.";

/// Result of delivering one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    /// Status of the response; 0 when none arrived.
    pub http_code: u16,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub email_id: i64,
}

/// Where replayed emails go. Delivery failures are reported in the outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSink: Send + Sync {
    async fn send(&self, email: &ReceivedEmail) -> SendOutcome;
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IncomingEmail {
    pub headers: IncomingHeaders,
    pub envelope: Envelope,
    pub plain: String,
    pub html: String,
    pub reply_plain: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IncomingHeaders {
    pub subject: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub recipients: Vec<String>,
}

/// Posts emails as JSON to the incoming-mail endpoint.
pub struct HttpEmailSink {
    client: Client,
    url: SecretString,
    default_to: String,
    default_from: String,
}

impl HttpEmailSink {
    pub fn new(
        url: SecretString,
        default_to: impl Into<String>,
        default_from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            default_to: default_to.into(),
            default_from: default_from.into(),
        })
    }

    /// Payload for `email`, stamped with `unix_time`.
    pub fn payload(&self, email: &ReceivedEmail, unix_time: i64) -> IncomingEmail {
        let to = non_empty(&email.to_email).unwrap_or(&self.default_to).to_string();
        let from = non_empty(&email.sender_email)
            .unwrap_or(&self.default_from)
            .to_string();
        let subject = format!(
            "{}{} {}",
            SUBJECT_PREFIX,
            non_empty(&email.sender_subject).unwrap_or(DEFAULT_SUBJECT),
            unix_time
        );

        IncomingEmail {
            headers: IncomingHeaders {
                subject,
                from: from.clone(),
                to: to.clone(),
            },
            envelope: Envelope {
                from,
                recipients: vec![to],
            },
            plain: email.plain.clone().unwrap_or_default(),
            html: email.html.clone().unwrap_or_default(),
            reply_plain: REPLY_PLAIN.to_string(),
        }
    }
}

#[async_trait]
impl EmailSink for HttpEmailSink {
    #[instrument(skip(self, email), fields(email_id = email.id))]
    async fn send(&self, email: &ReceivedEmail) -> SendOutcome {
        let payload = self.payload(email, chrono::Utc::now().timestamp());

        let response = match self
            .client
            .post(self.url.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Email delivery failed: {}", e);
                return SendOutcome {
                    success: false,
                    http_code: 0,
                    response: String::new(),
                    error: Some(e.without_url().to_string()),
                    email_id: email.id,
                };
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "Email delivered");

        SendOutcome {
            success: status.is_success(),
            http_code: status.as_u16(),
            response: body,
            error: None,
            email_id: email.id,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(url: String) -> HttpEmailSink {
        HttpEmailSink::new(
            SecretString::new(url),
            "test@mail.example",
            "error@example.com",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn email() -> ReceivedEmail {
        ReceivedEmail {
            id: 7,
            to_email: Some("agency@example.com".into()),
            sender_email: Some("portal@example.com".into()),
            sender_subject: Some("New lead".into()),
            plain: Some("Hello".into()),
            html: None,
        }
    }

    #[test]
    fn test_payload() {
        let payload = sink("http://localhost".into()).payload(&email(), 1700000000);

        assert_eq!(payload.headers.subject, "TECH : New lead 1700000000");
        assert_eq!(payload.headers.to, "agency@example.com");
        assert_eq!(payload.envelope.recipients, vec!["agency@example.com"]);
        assert_eq!(payload.plain, "Hello");
        assert_eq!(payload.html, "");
        assert_eq!(payload.reply_plain, "Message reply if found.");
    }

    #[test]
    fn test_payload_defaults() {
        let email = ReceivedEmail {
            id: 1,
            to_email: Some(String::new()),
            ..ReceivedEmail::default()
        };
        let payload = sink("http://localhost".into()).payload(&email, 42);

        assert_eq!(payload.headers.subject, "TECH : Test email 42");
        assert_eq!(payload.headers.to, "test@mail.example");
        assert_eq!(payload.headers.from, "error@example.com");
        assert_eq!(payload.envelope.from, "error@example.com");
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email/incoming"))
            .and(body_partial_json(json!({
                "headers": {"from": "portal@example.com", "to": "agency@example.com"},
                "envelope": {"recipients": ["agency@example.com"]},
                "plain": "Hello"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = sink(format!("{}/email/incoming", server.uri()))
            .send(&email())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.http_code, 202);
        assert_eq!(outcome.response, "queued");
        assert_eq!(outcome.email_id, 7);
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
            .mount(&server)
            .await;

        let outcome = sink(server.uri()).send(&email()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.http_code, 422);
    }

    #[tokio::test]
    async fn test_send_unreachable() {
        let outcome = sink("http://127.0.0.1:1/email/incoming".into())
            .send(&email())
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.http_code, 0);
        assert!(outcome.error.is_some());
    }
}
