//! reCAPTCHA token verification.
//!
//! The siteverify endpoint takes the secret key and the client token as form
//! fields and answers with a JSON document whose `success` flag decides
//! whether the submission is relayed.

use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::error::RelayError;

const SERVICE: &str = "recaptcha";

/// Outcome of a single verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// The `success` flag exactly as the service reported it
    pub success: bool,
    /// Raw response body, kept for diagnostics
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

/// Client for the reCAPTCHA siteverify API.
#[derive(Clone)]
pub struct RecaptchaClient {
    client: Client,
    url: Url,
    secret: String,
}

impl RecaptchaClient {
    pub fn new(client: Client, url: Url, secret: String) -> Self {
        Self { client, url, secret }
    }

    /// Verify a client token.
    ///
    /// Fails on transport errors, non-2xx statuses and bodies without a
    /// boolean `success` field. The full response body is logged at info.
    pub async fn verify(&self, token: &str) -> Result<VerificationResult, RelayError> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(RelayError::transport(SERVICE))?;

        let status = response.status();
        let body = response.text().await.map_err(RelayError::transport(SERVICE))?;

        if !status.is_success() {
            return Err(RelayError::Status {
                service: SERVICE,
                status,
                body,
            });
        }

        info!(response = %body, "recaptcha_response");

        parse_response(body)
    }
}

fn parse_response(body: String) -> Result<VerificationResult, RelayError> {
    let parsed: SiteVerifyResponse = serde_json::from_str(&body)
        .map_err(|source| RelayError::Decode { service: SERVICE, source })?;

    Ok(VerificationResult {
        success: parsed.success,
        raw: body,
    })
}
