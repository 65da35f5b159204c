use crate::core::label::escape_xml;
use crate::domain::ports::{MailMessage, Mailer};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{is_valid_email, validate_non_empty_string, Validate};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl Validate for ContactRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("firstName", &self.first_name)?;
        validate_non_empty_string("lastName", &self.last_name)?;
        validate_non_empty_string("email", &self.email)?;
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("email", "Invalid email address"));
        }
        validate_non_empty_string("subject", &self.subject)?;
        validate_non_empty_string("message", &self.message)?;
        Ok(())
    }
}

fn html_paragraphs(text: &str) -> String {
    escape_xml(text).replace('\n', "<br>")
}

fn inbox_message(request: &ContactRequest, inbox: &str) -> MailMessage {
    let name = format!("{} {}", request.first_name, request.last_name);
    MailMessage {
        to: inbox.to_string(),
        reply_to: Some(request.email.clone()),
        subject: format!("New Contact Form Submission: {}", request.subject),
        text: format!(
            "New message from {} ({})\n\nSubject: {}\nMessage:\n{}\n",
            name, request.email, request.subject, request.message
        ),
        html: format!(
            "<h3>New Contact Form Submission</h3>\
             <p><strong>From:</strong> {} ({})</p>\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Message:</strong></p><p>{}</p>",
            escape_xml(&name),
            escape_xml(&request.email),
            escape_xml(&request.subject),
            html_paragraphs(&request.message)
        ),
    }
}

fn acknowledgment(request: &ContactRequest) -> MailMessage {
    MailMessage {
        to: request.email.clone(),
        reply_to: None,
        subject: format!("We received your inquiry: {}", request.subject),
        text: format!(
            "Hello {},\n\nThank you for contacting Reptile Global. We have received your message \
             and will get back to you as soon as possible.\n\nYour message details:\nSubject: {}\nMessage: {}\n",
            request.first_name, request.subject, request.message
        ),
        html: format!(
            "<h3>Thank you for contacting Reptile Global</h3>\
             <p>Hello {},</p>\
             <p>Thank you for your inquiry. We have received your message and will get back to you as soon as possible.</p>\
             <hr /><p><strong>Your message details:</strong></p>\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Message:</strong></p><p>{}</p>",
            escape_xml(&request.first_name),
            escape_xml(&request.subject),
            html_paragraphs(&request.message)
        ),
    }
}

pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    inbox: String,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>, inbox: impl Into<String>) -> Self {
        Self {
            mailer,
            inbox: inbox.into(),
        }
    }

    /// Forward the form to the inbox and acknowledge it to the sender. Both
    /// mails go out concurrently; either failing fails the request.
    pub async fn submit(&self, request: ContactRequest) -> Result<()> {
        request.validate()?;

        let to_inbox = inbox_message(&request, &self.inbox);
        let to_sender = acknowledgment(&request);
        let sent = tokio::try_join!(self.mailer.send(&to_inbox), self.mailer.send(&to_sender));

        match sent {
            Ok(_) => {
                tracing::info!(subject = %request.subject, "Contact form delivered");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Contact form delivery failed: {}", e);
                Err(AppError::MailDelivery)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<()> {
            if self.fail_for.as_deref() == Some(message.to.as_str()) {
                return Err(AppError::upstream("mail", "relay refused"));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn request() -> ContactRequest {
        ContactRequest {
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            email: "ada@example.com".into(),
            subject: "Shipping a <tortoise>".into(),
            message: "Line one\nLine two".into(),
        }
    }

    #[tokio::test]
    async fn test_sends_inbox_and_acknowledgment() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = ContactService::new(mailer.clone(), "inbox@reptileglobal.site");
        svc.submit(request()).await.unwrap();

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 2);
        let inbox = sent.iter().find(|m| m.to == "inbox@reptileglobal.site").unwrap();
        assert_eq!(inbox.reply_to.as_deref(), Some("ada@example.com"));
        assert_eq!(inbox.subject, "New Contact Form Submission: Shipping a <tortoise>");
        assert!(inbox.html.contains("Shipping a &lt;tortoise&gt;"));
        assert!(inbox.html.contains("Line one<br>Line two"));

        let ack = sent.iter().find(|m| m.to == "ada@example.com").unwrap();
        assert_eq!(ack.subject, "We received your inquiry: Shipping a <tortoise>");
        assert!(ack.text.starts_with("Hello Ada,"));
    }

    #[tokio::test]
    async fn test_any_failed_mail_fails_the_request() {
        let mailer = Arc::new(RecordingMailer {
            fail_for: Some("ada@example.com".into()),
            ..Default::default()
        });
        let svc = ContactService::new(mailer, "inbox@reptileglobal.site");
        let err = svc.submit(request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to send email");
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_sending() {
        let mailer = Arc::new(RecordingMailer::default());
        let svc = ContactService::new(mailer.clone(), "inbox@reptileglobal.site");
        let mut req = request();
        req.email = "not-an-email".into();
        assert_eq!(
            svc.submit(req).await.unwrap_err().to_string(),
            "email: Invalid email address"
        );
        assert!(mailer.sent.lock().await.is_empty());
    }
}
