//! ViaDialog client errors.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed lower-level cause carried by [`ApiError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

const API_MARKER: &str = "ViaDialog API error: ";
const AUTHENTICATION_MARKER: &str = "Authentication error: ";

/// Which failure domain an [`ApiError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Transport, decoding or server-side rejection.
    Api,
    /// Credential exchange failure. Only produced by the authenticator.
    Authentication,
}

/// Failure talking to the ViaDialog API.
///
/// Authentication failures are a specialization of the general kind: they
/// render with both markers and share every accessor.
#[derive(Debug)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    code: Option<u16>,
    source: Option<BoxError>,
}

impl ApiError {
    /// General API failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Api,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Authentication,
            ..Self::new(message)
        }
    }

    /// Attach a numeric code (the HTTP status when a response was received).
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the lower-level cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == ApiErrorKind::Authentication
    }

    /// The message without the provider and authentication markers.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    /// Request diagnostics attached to a failed line lookup.
    pub fn diagnostics(&self) -> Option<&RequestDiagnostics> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<RequestDiagnostics>())
    }

    /// True when any error in the cause chain is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            if let Some(http) = err.downcast_ref::<reqwest::Error>() {
                if http.is_timeout() {
                    return true;
                }
            }
            current = err.source();
        }
        false
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(API_MARKER)?;
        if self.kind == ApiErrorKind::Authentication {
            f.write_str(AUTHENTICATION_MARKER)?;
        }
        f.write_str(&self.message)
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Raw payload could not be turned into an entity.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has an unexpected type, expected {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` is not an ISO-8601 date: {value:?}")]
    InvalidDate {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("element {index}: {source}")]
    InvalidElement {
        index: usize,
        #[source]
        source: Box<MappingError>,
    },
}

impl MappingError {
    pub(crate) fn at(index: usize, source: MappingError) -> Self {
        MappingError::InvalidElement {
            index,
            source: Box::new(source),
        }
    }
}

/// Errors surfaced by [`crate::ViaDialogClient`].
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("ViaDialog mapping error: {0}")]
    Mapping(#[from] MappingError),
}

impl Error {
    /// The API failure, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            Error::Mapping(_) => None,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Outbound request (and inbound response, if any) captured when a line
/// lookup fails.
#[derive(Debug)]
pub struct RequestDiagnostics {
    pub method: String,
    pub uri: String,
    /// Request headers; credentials are redacted.
    pub headers: Vec<(String, String)>,
    pub response: Option<ResponseDiagnostics>,
    source: Option<BoxError>,
}

/// Response half of [`RequestDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDiagnostics {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RequestDiagnostics {
    pub(crate) fn new(method: String, uri: String, headers: Vec<(String, String)>) -> Self {
        Self {
            method,
            uri,
            headers,
            response: None,
            source: None,
        }
    }

    pub(crate) fn with_response(mut self, response: ResponseDiagnostics) -> Self {
        self.response = Some(response);
        self
    }

    pub(crate) fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for RequestDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)?;
        match &self.response {
            Some(response) => write!(
                f,
                " -> {} {}: {}",
                response.status, response.reason, response.body
            ),
            None => match &self.source {
                Some(source) => write!(f, " (no response: {})", source),
                None => f.write_str(" (no response)"),
            },
        }
    }
}

impl StdError for RequestDiagnostics {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_prefix() {
        let err = ApiError::new("Failed to fetch service 7");
        assert_eq!(err.to_string(), "ViaDialog API error: Failed to fetch service 7");
        assert_eq!(err.kind(), ApiErrorKind::Api);
        assert!(err.code().is_none());
    }

    #[test]
    fn test_authentication_error_carries_both_markers() {
        let err = ApiError::authentication("bad credentials").with_code(401);
        assert_eq!(
            err.to_string(),
            "ViaDialog API error: Authentication error: bad credentials"
        );
        assert!(err.is_authentication());
        assert_eq!(err.message(), "bad credentials");
        assert_eq!(err.code(), Some(401));
    }

    #[test]
    fn test_source_is_exposed() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ApiError::new("Failed to fetch lines").with_source(cause);
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_diagnostics_display() {
        let diagnostics = RequestDiagnostics::new(
            "GET".into(),
            "https://example.test/gw/provisioning/api/sdas".into(),
            vec![],
        )
        .with_response(ResponseDiagnostics {
            status: 400,
            reason: "Bad Request".into(),
            body: "invalid filter".into(),
        });

        assert_eq!(
            diagnostics.to_string(),
            "GET https://example.test/gw/provisioning/api/sdas -> 400 Bad Request: invalid filter"
        );
    }

    #[test]
    fn test_element_error_wraps_cause() {
        let err = MappingError::at(3, MappingError::MissingField("id"));
        assert_eq!(err.to_string(), "element 3: missing required field `id`");
    }
}
