//! Bounded retry with exponential backoff for outbound calls.
//!
//! The wrapper never propagates the operation's error. Callers get
//! `Some(value)` on success and `None` once every attempt has failed; the
//! final failure is logged at error level.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

use crate::config::Environment;

/// How many times to try an operation and how long to wait in between.
///
/// The delay after failed attempt `n` (1-based) is `unit * backoff_base^n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: u32,
    unit: Duration,
}

impl RetryPolicy {
    /// Create a policy. Both values are clamped to at least 1.
    pub fn new(max_attempts: u32, backoff_base: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base: backoff_base.max(1),
            unit: Duration::from_secs(1),
        }
    }

    /// Production policy: two attempts, base 2 seconds.
    pub fn production() -> Self {
        Self::new(2, 2)
    }

    /// Single attempt, no delay.
    pub fn single_attempt() -> Self {
        Self::new(1, 1)
    }

    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_reduced() {
            Self::single_attempt()
        } else {
            Self::production()
        }
    }

    /// Set the time unit the backoff is measured in.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> u32 {
        self.backoff_base
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_base.saturating_pow(attempt);
        self.unit.saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::production()
    }
}

/// Run `operation` under `policy`.
///
/// Each failure before the last is logged at warn and followed by a sleep on
/// the calling task. The last failure is logged at error and `None` is
/// returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut f: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 1..=policy.max_attempts {
        match f().await {
            Ok(value) => return Some(value),
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation,
                    attempt = attempt,
                    delay_seconds = delay.as_secs_f64(),
                    error = %e,
                    "retry_sleeping"
                );
                sleep(delay).await;
            }
            Err(e) => {
                error!(
                    operation = operation,
                    attempts = attempt,
                    error = %e,
                    "retry_exhausted"
                );
            }
        }
    }

    None
}
