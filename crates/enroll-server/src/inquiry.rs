//! Contact Inquiries
//!
//! A public contact form: one notice to the site admin and one
//! acknowledgement to the sender. All user input is escaped before it is
//! placed into HTML.

use serde::Deserialize;

use enroll_core::{escape_html, EmailMessage, EmailSender, EnrollError, Result};

const MAX_MESSAGE_LEN: usize = 5_000;

#[derive(Clone, Debug, Deserialize)]
pub struct Inquiry {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

impl Inquiry {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.message.trim().is_empty() {
            return Err(EnrollError::InvalidRequest("name and message are required".into()));
        }
        if !self.email.contains('@') || self.email.contains(char::is_whitespace) {
            return Err(EnrollError::InvalidRequest("a valid email is required".into()));
        }
        if self.message.len() > MAX_MESSAGE_LEN {
            return Err(EnrollError::InvalidRequest("message is too long".into()));
        }
        Ok(())
    }

    pub fn admin_notice(&self, admin_email: &str) -> EmailMessage {
        let name = escape_html(self.name.trim());
        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p><strong>Phone:</strong> {}</p>", escape_html(p)))
            .unwrap_or_default();

        EmailMessage {
            to: admin_email.into(),
            subject: format!("New Inquiry from {}", self.name.trim()),
            html: format!(
                "<h2>New Contact Inquiry</h2>\
                 <p><strong>Name:</strong> {name}</p>\
                 <p><strong>Email:</strong> {email}</p>\
                 {phone}\
                 <p><strong>Message:</strong></p>\
                 <p>{message}</p>",
                email = escape_html(&self.email),
                message = escape_html(&self.message),
            ),
        }
    }

    pub fn acknowledgement(&self) -> EmailMessage {
        EmailMessage {
            to: self.email.clone(),
            subject: "Thank you for contacting us!".into(),
            html: format!(
                "<h1>Thank you for reaching out!</h1>\
                 <p>Hi {name},</p>\
                 <p>We have received your message and will get back to you shortly.</p>\
                 <p>Your message:</p>\
                 <p><em>{message}</em></p>",
                name = escape_html(self.name.trim()),
                message = escape_html(&self.message),
            ),
        }
    }
}

/// Send both emails. The admin notice is the one that matters, so its
/// failure is returned; a failed acknowledgement is only logged.
pub async fn submit(
    email: &dyn EmailSender,
    admin_email: Option<&str>,
    inquiry: &Inquiry,
) -> Result<()> {
    inquiry.validate()?;

    let admin = admin_email.ok_or_else(|| EnrollError::Config("ADMIN_EMAIL not set".into()))?;
    email.send(&inquiry.admin_notice(admin)).await?;

    if let Err(e) = email.send(&inquiry.acknowledgement()).await {
        tracing::warn!(error = %e, "Failed to send inquiry acknowledgement");
    }

    tracing::info!(from = %inquiry.email, "Inquiry received");
    Ok(())
}
