//! Form Relay - contact form backend.
//!
//! Accepts contact form submissions over HTTP, verifies their reCAPTCHA token
//! and relays verified messages through Mailgun.
//!
//! ## Architecture
//!
//! ```text
//! POST /email → validate → 204
//!                  └─(spawned task)→ reCAPTCHA verify → Mailgun send
//! ```
//!
//! Both outbound calls go through [`retry::retry`] with the environment's
//! [`RetryPolicy`].

pub mod config;
pub mod relay;
pub mod retry;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, Environment, Secrets, UnknownEnvironment};
pub use relay::{Outcome, Relay, RelayError, Submission, SubmissionError};
pub use retry::RetryPolicy;
pub use web::{router, AppState};
