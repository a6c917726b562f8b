//! Web server module for the contact form endpoint.
//!
//! This module provides a thin web server that:
//! - Validates contact form submissions
//! - Dispatches verification and delivery to a background task
//! - Returns 204 immediately
//! - Answers CORS preflights and heartbeats

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    email_preflight, heartbeat, submit_email, AppState, ErrorResponse, EmptyResponse,
    ALLOWED_HEADERS, ALLOWED_METHODS, ALLOWED_ORIGIN,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/heartbeat", get(heartbeat))
        .route(
            "/email",
            post(submit_email)
                .options(email_preflight)
                // Submissions carry no size limit.
                .layer(DefaultBodyLimit::disable()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
