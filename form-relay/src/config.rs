//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. The secret bundle arrives as a JSON
//! document in the `api` variable and is never re-read or logged afterwards.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::retry::RetryPolicy;

/// Default reCAPTCHA verification endpoint.
pub const DEFAULT_VERIFICATION_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Default Mailgun messages endpoint.
pub const DEFAULT_NOTIFICATION_URL: &str = "https://api.mailgun.net/v3/mg.oneadame.com/messages";

/// Default `from` header for relayed submissions.
pub const DEFAULT_SENDER: &str = "website form submission <formsubmission@oneadame.com>";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid secret bundle: {0}")]
    InvalidSecrets(#[from] serde_json::Error),

    #[error("secret bundle lists no email recipients")]
    NoRecipients,

    #[error("invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Deployment environment, controlling how aggressively outbound calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Stage,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "PRODUCTION",
            Environment::Stage => "STAGE",
            Environment::Test => "TEST",
        }
    }

    /// Test and stage deployments only ever try once.
    pub fn is_reduced(&self) -> bool {
        matches!(self, Environment::Stage | Environment::Test)
    }
}

/// An `ENV` value that names no known environment.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized environment {0:?}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRODUCTION" => Ok(Environment::Production),
            "STAGE" => Ok(Environment::Stage),
            "TEST" => Ok(Environment::Test),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service credentials and the recipient list.
#[derive(Clone, Deserialize)]
pub struct Secrets {
    /// reCAPTCHA secret key
    #[serde(rename = "grecaptcha")]
    pub verification_key: String,

    /// Mailgun API key
    #[serde(rename = "mailgun")]
    pub notification_key: String,

    /// Addresses that receive every relayed submission
    #[serde(rename = "email_recipients", deserialize_with = "one_or_many")]
    pub recipients: Vec<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("verification_key", &"<redacted>")
            .field("notification_key", &"<redacted>")
            .field("recipients", &self.recipients.len())
            .finish()
    }
}

/// Accept either a single address or a list of addresses.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(address) => vec![address],
        OneOrMany::Many(addresses) => addresses,
    })
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment (`ENV`)
    pub environment: Environment,

    /// Service keys and recipients (`api`)
    pub secrets: Secrets,

    /// Port for the web server to listen on
    pub port: u16,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout_ms: u64,

    /// reCAPTCHA siteverify endpoint
    pub verification_url: Url,

    /// Mailgun messages endpoint
    pub notification_url: Url,

    /// `from` field of relayed messages
    pub sender: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("ENV") {
            Some(raw) => raw.parse().unwrap_or_else(|e: UnknownEnvironment| {
                warn!(env_var = "ENV", error = %e, "Unrecognized environment, using PRODUCTION");
                Environment::Production
            }),
            None => Environment::Production,
        };

        let raw_secrets = lookup("api").ok_or(ConfigError::Missing("api"))?;
        let secrets: Secrets = serde_json::from_str(&raw_secrets)?;
        if secrets.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(ConfigError::NoRecipients);
        }

        Ok(Config {
            environment,
            secrets,
            port: parse_number(&lookup, "PORT", 8080),
            request_timeout_ms: parse_number(&lookup, "REQUEST_TIMEOUT_MS", 10_000),
            verification_url: parse_url(&lookup, "VERIFICATION_URL", DEFAULT_VERIFICATION_URL)?,
            notification_url: parse_url(&lookup, "NOTIFICATION_URL", DEFAULT_NOTIFICATION_URL)?,
            sender: lookup("NOTIFICATION_SENDER").unwrap_or_else(|| DEFAULT_SENDER.to_string()),
        })
    }

    /// Retry policy for outbound calls in this environment.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::for_environment(self.environment)
    }
}

/// Parse a numeric variable, falling back to the default when absent or invalid.
fn parse_number<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }),
        None => default,
    }
}

fn parse_url<F>(lookup: &F, name: &'static str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name, source })
}
