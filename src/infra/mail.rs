//! Mail provider adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::info;

use crate::application::notifications::{MailError, Mailer};
use crate::config::EmailSettings;
use crate::presentation::email::EmailMessage;

use super::error::InfraError;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends through an HTTP email API that accepts
/// `{from, to, subject, html, text}` with bearer authentication.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: Url,
        api_key: String,
        from: String,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("lumblog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(InfraError::http_client("mail"))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), MailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Logs outgoing mail instead of sending it. Used when no provider key is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            target = "lumblog::infra::mail",
            to = %to,
            subject = %message.subject,
            "mail provider not configured; email logged only"
        );
        Ok(())
    }
}

/// The HTTP mailer when an API key is configured, otherwise the log mailer.
pub fn mailer_from_settings(settings: &EmailSettings) -> Result<Arc<dyn Mailer>, InfraError> {
    let Some(key) = settings.api_key.as_deref() else {
        return Ok(Arc::new(LogMailer));
    };

    let mailer = HttpMailer::new(
        settings.api_url.clone(),
        key.to_string(),
        settings.from.clone(),
        settings.timeout,
    )?;
    Ok(Arc::new(mailer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_provider_shape() {
        let body = SendEmailRequest {
            from: "Blog <noreply@example.com>",
            to: ["reader@example.com"],
            subject: "New Article: Hello",
            html: "<p>hi</p>",
            text: "hi",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "Blog <noreply@example.com>",
                "to": ["reader@example.com"],
                "subject": "New Article: Hello",
                "html": "<p>hi</p>",
                "text": "hi",
            })
        );
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let message = EmailMessage {
            subject: "s".into(),
            html: "h".into(),
            text: "t".into(),
        };
        assert!(LogMailer.send("reader@example.com", &message).await.is_ok());
    }
}
