use crate::domain::ports::{MailMessage, Mailer};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Sends mail through an HTTP relay that accepts one JSON message per POST.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            reply_to: message.reply_to.as_deref(),
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        tracing::debug!("Sending mail to {} via {}", message.to, self.endpoint);
        let mut request = self.client.post(&self.endpoint).json(&payload);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("mail relay", format!("{} {}", status, body)));
        }
        Ok(())
    }
}
