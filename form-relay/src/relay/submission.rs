//! Contact form submissions and their request-body validation.

use serde_json::{Map, Value};
use thiserror::Error;

/// Fields every submission must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 3] = ["email", "token", "message"];

/// Why a request body could not become a [`Submission`].
///
/// The `Display` text is exactly what the caller sees in the 400 response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Bad request.")]
    Malformed,

    #[error("Request missing {0}.")]
    Missing(&'static str),
}

/// A validated contact form submission.
#[derive(Debug)]
pub struct Submission {
    email: String,
    token: String,
    message: String,
}

impl Submission {
    pub fn new(
        email: impl Into<String>,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            message: message.into(),
        }
    }

    /// Parse a raw request body.
    ///
    /// The body must be a JSON object. Required fields are checked in
    /// [`REQUIRED_FIELDS`] order and the first one missing is reported.
    pub fn from_json(body: &[u8]) -> Result<Self, SubmissionError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| SubmissionError::Malformed)?;
        let object = value.as_object().ok_or(SubmissionError::Malformed)?;

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(SubmissionError::Missing(*missing));
        }

        Ok(Self {
            email: string_field(object, "email")?,
            token: string_field(object, "token")?,
            message: string_field(object, "message")?,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn string_field(object: &Map<String, Value>, name: &str) -> Result<String, SubmissionError> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(SubmissionError::Malformed)
}
