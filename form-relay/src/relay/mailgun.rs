//! Mailgun delivery of contact form submissions.

use reqwest::Client;
use tracing::info;
use url::Url;

use super::error::RelayError;
use super::submission::Submission;

const SERVICE: &str = "mailgun";

/// Client for the Mailgun messages API.
#[derive(Clone)]
pub struct MailgunClient {
    client: Client,
    url: Url,
    api_key: String,
    sender: String,
    recipients: Vec<String>,
}

impl MailgunClient {
    pub fn new(
        client: Client,
        url: Url,
        api_key: String,
        sender: String,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            client,
            url,
            api_key,
            sender,
            recipients,
        }
    }

    /// Send a submission to every configured recipient.
    pub async fn send(&self, submission: &Submission) -> Result<(), RelayError> {
        let response = self
            .client
            .post(self.url.clone())
            .basic_auth("api", Some(&self.api_key))
            .form(&self.form_fields(submission))
            .send()
            .await
            .map_err(RelayError::transport(SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                service: SERVICE,
                status,
                body,
            });
        }

        info!(
            email = %submission.email(),
            recipients = self.recipients.len(),
            status = status.as_u16(),
            "mailgun_message_accepted"
        );

        Ok(())
    }

    /// Form fields for the messages API. `to` repeats once per recipient.
    fn form_fields(&self, submission: &Submission) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(self.recipients.len() + 3);
        fields.push(("from", self.sender.clone()));
        fields.extend(self.recipients.iter().map(|r| ("to", r.clone())));
        fields.push(("subject", subject_for(submission.email())));
        fields.push(("text", submission.message().to_string()));
        fields
    }
}

fn subject_for(email: &str) -> String {
    format!("EMAIL FORM SUBMISSION FROM {}", email)
}
