//! Endpoint handlers.
//!
//! The email handler only validates the body and hands the submission to a
//! detached relay task; the response never waits on reCAPTCHA or Mailgun.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::relay::{Relay, Submission};

/// The only origin allowed to call `/email`.
pub const ALLOWED_ORIGIN: &str = "https://oneadame.com";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}

// =============================================================================
// Heartbeat
// =============================================================================

/// Serializes as an empty JSON object.
#[derive(Serialize)]
pub struct EmptyResponse {}

/// Liveness endpoint. Touches neither secrets nor remote services.
pub async fn heartbeat() -> Json<EmptyResponse> {
    Json(EmptyResponse {})
}

// =============================================================================
// Email
// =============================================================================

/// Error body for rejected submissions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Attach the CORS headers every `/email` response carries.
fn cors_response(status: StatusCode, body: Option<impl Serialize>) -> Response {
    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOWED_ORIGIN),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
    ];

    match body {
        Some(body) => (status, headers, Json(body)).into_response(),
        None => (status, headers).into_response(),
    }
}

/// CORS preflight for `/email`.
pub async fn email_preflight() -> Response {
    cors_response(StatusCode::OK, Some(EmptyResponse {}))
}

/// Contact form submission endpoint.
///
/// This endpoint:
/// 1. Parses the JSON body and checks the required fields
/// 2. Spawns the relay task
/// 3. Returns 204 without waiting for it
pub async fn submit_email(State(state): State<AppState>, body: Bytes) -> Response {
    let submission = match Submission::from_json(&body) {
        Ok(submission) => submission,
        Err(e) => {
            warn!(reason = %e, body_length = body.len(), "email_rejected");
            return cors_response(
                StatusCode::BAD_REQUEST,
                Some(ErrorResponse {
                    message: e.to_string(),
                }),
            );
        }
    };

    info!(
        email = %submission.email(),
        message_length = submission.message().len(),
        "email_accepted"
    );

    // Detached: the outcome is logged by the relay task itself.
    drop(state.relay.dispatch(submission));

    cors_response(StatusCode::NO_CONTENT, None::<ErrorResponse>)
}
