//! Resend Email Sender
//!
//! Transactional email over the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;

use enroll_core::{EmailMessage, EmailSender, EnrollError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";
pub const DEFAULT_FROM: &str = "Course Enrollment <onboarding@resend.dev>";

#[derive(Clone, Debug)]
pub struct ResendConfig {
    pub api_key: String,

    /// Sender, e.g. `Academy <hello@academy.dev>`
    pub from: String,

    pub base_url: String,
}

impl ResendConfig {
    /// Read `RESEND_API_KEY` and `EMAIL_FROM`; `None` when no key is set
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty())?;
        let from = std::env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM.into());

        Some(Self {
            api_key,
            from,
            base_url: DEFAULT_BASE_URL.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct ResendEmailSender {
    http: reqwest::Client,
    config: ResendConfig,
}

impl ResendEmailSender {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn body<'a>(&'a self, message: &'a EmailMessage) -> SendEmailBody<'a> {
        SendEmailBody {
            from: &self.config.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&self.body(message))
            .send()
            .await
            .map_err(|e| EnrollError::upstream("email", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EnrollError::upstream("email", format!("{status}: {detail}")));
        }

        tracing::debug!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Sender used when no provider is configured; logs instead of sending
#[derive(Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email provider not configured, skipping send"
        );
        Ok(())
    }
}
