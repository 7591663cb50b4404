//! HTTP API for the email test service.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::logging_middleware;
pub use types::*;

use crate::catalog::EmailTypeCatalog;
use crate::dispatch::EmailTestSender;
use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Fetch-and-replay service
    pub sender: Arc<EmailTestSender>,
    /// Known email types
    pub catalog: Arc<EmailTypeCatalog>,
}

impl AppState {
    /// Create new application state.
    pub fn new(sender: EmailTestSender, catalog: Arc<EmailTypeCatalog>) -> Self {
        Self {
            sender: Arc::new(sender),
            catalog,
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/send-emails",
            post(handlers::send_emails)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route("/api/email-types", get(handlers::email_types))
        .layer(cors)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
