//! Request logging.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Log each request once it has been answered.
///
/// Health checks are logged at debug level only; 4xx answers are warnings
/// and 5xx answers are errors.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    match status {
        500.. => error!(%method, %path, status, elapsed_ms, "Request errored"),
        400..=499 => warn!(%method, %path, status, elapsed_ms, "Request rejected"),
        _ if path == "/health" => debug!(%method, %path, status, elapsed_ms, "Health check"),
        _ => info!(%method, %path, status, elapsed_ms, "Request handled"),
    }

    response
}
