//! Submission relay: verify the reCAPTCHA token, then forward through Mailgun.
//!
//! ## Processing Flow
//!
//! ```text
//! Submission → verify (retried) → success == true? → send (retried) → Outcome
//! ```
//!
//! Work is detached from the HTTP request that produced the submission. The
//! outcome is logged; nothing is reported back to the caller, and a delivery
//! that fails every attempt is only visible in the error log.

pub mod error;
pub mod mailgun;
pub mod recaptcha;
pub mod submission;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::retry::{retry, RetryPolicy};

pub use error::RelayError;
pub use mailgun::MailgunClient;
pub use recaptcha::{RecaptchaClient, VerificationResult};
pub use submission::{Submission, SubmissionError, REQUIRED_FIELDS};

/// Terminal state of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Token verified and the message was accepted by Mailgun
    Delivered,
    /// The verification service answered `success: false`
    Rejected,
    /// Verification failed on every attempt
    VerificationUnavailable,
    /// Token verified but delivery failed on every attempt
    DeliveryFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Delivered => "delivered",
            Outcome::Rejected => "rejected",
            Outcome::VerificationUnavailable => "verification_unavailable",
            Outcome::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Verification and delivery clients plus the retry policy applied to both.
#[derive(Clone)]
pub struct Relay {
    recaptcha: RecaptchaClient,
    mailgun: MailgunClient,
    retry: RetryPolicy,
}

impl Relay {
    pub fn new(recaptcha: RecaptchaClient, mailgun: MailgunClient, retry: RetryPolicy) -> Self {
        Self {
            recaptcha,
            mailgun,
            retry,
        }
    }

    /// Build both clients over one shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(format!("form-relay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RelayError::Client)?;

        let recaptcha = RecaptchaClient::new(
            client.clone(),
            config.verification_url.clone(),
            config.secrets.verification_key.clone(),
        );

        let mailgun = MailgunClient::new(
            client,
            config.notification_url.clone(),
            config.secrets.notification_key.clone(),
            config.sender.clone(),
            config.secrets.recipients.clone(),
        );

        Ok(Self::new(recaptcha, mailgun, config.retry_policy()))
    }

    /// Verify the submission's token and, only on an exact `true`, deliver it.
    pub async fn process(&self, submission: &Submission) -> Outcome {
        info!(email = %submission.email(), "relay_verify_start");

        let verification = retry(&self.retry, "recaptcha_verify", || {
            self.recaptcha.verify(submission.token())
        })
        .await;

        let outcome = match verification {
            Some(VerificationResult { success: true, .. }) => {
                info!(email = %submission.email(), "relay_send_start");

                match retry(&self.retry, "mailgun_send", || self.mailgun.send(submission)).await {
                    Some(()) => Outcome::Delivered,
                    None => Outcome::DeliveryFailed,
                }
            }
            Some(VerificationResult { success: false, .. }) => {
                info!(email = %submission.email(), "relay_verification_rejected");
                Outcome::Rejected
            }
            None => {
                warn!(email = %submission.email(), "relay_verification_unavailable");
                Outcome::VerificationUnavailable
            }
        };

        info!(
            email = %submission.email(),
            outcome = outcome.as_str(),
            "relay_complete"
        );

        outcome
    }

    /// Process a submission on its own task without waiting for it.
    pub fn dispatch(self: &Arc<Self>, submission: Submission) -> JoinHandle<Outcome> {
        let relay = Arc::clone(self);
        tokio::spawn(async move { relay.process(&submission).await })
    }
}
