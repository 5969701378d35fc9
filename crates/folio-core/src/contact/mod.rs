//! Contact form relay
//!
//! Validates a submission, then sends a notification to the site owner's
//! inbox followed by an auto-reply to the visitor.

mod mailer;

pub use mailer::{HttpMailer, Mailer};

#[cfg(test)]
pub(crate) use mailer::test_support;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::config::ContactConfig;
use crate::error::{Error, Result};
use crate::models::{ContactRequest, ContactSubmission, OutgoingMail};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Reply for a missing field
pub const MISSING_FIELDS: &str = "All fields are required";

/// Reply for a malformed address
pub const INVALID_EMAIL: &str = "Please provide a valid email address";

/// Check a raw contact request
pub fn validate(request: ContactRequest) -> Result<ContactSubmission> {
    fn required(value: Option<String>) -> Result<String> {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::validation(MISSING_FIELDS))
    }

    let submission = ContactSubmission {
        name: required(request.name)?,
        email: required(request.email)?.trim().to_string(),
        subject: required(request.subject)?,
        message: required(request.message)?,
    };

    if !EMAIL_RE.is_match(&submission.email) {
        return Err(Error::validation(INVALID_EMAIL));
    }

    Ok(submission)
}

/// Sends contact form mail
#[derive(Clone)]
pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    inbox: Option<String>,
    sender: Option<String>,
    owner_name: String,
}

impl std::fmt::Debug for ContactService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactService")
            .field("inbox", &self.inbox)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl ContactService {
    /// Create a service
    pub fn new(mailer: Arc<dyn Mailer>, config: &ContactConfig) -> Self {
        Self {
            mailer,
            inbox: config.inbox.clone().filter(|s| !s.trim().is_empty()),
            sender: config.sender.clone().filter(|s| !s.trim().is_empty()),
            owner_name: config.owner_name.clone(),
        }
    }

    /// Create a service delivering through the configured HTTP relay
    pub fn from_config(config: &ContactConfig) -> Result<Self> {
        let mailer = HttpMailer::new(config)?;
        if !mailer.is_configured() {
            warn!("No mail relay configured, contact submissions will fail");
        }
        Ok(Self::new(Arc::new(mailer), config))
    }

    /// Validate and relay a submission
    pub async fn submit(&self, request: ContactRequest) -> Result<()> {
        let submission = validate(request)?;

        if let Err(err) = self.deliver(&submission).await {
            error!(
                error = %err,
                name = %submission.name,
                email = %submission.email,
                subject = %submission.subject,
                "Error sending email"
            );
            return Err(err);
        }

        info!(email = %submission.email, "Contact message relayed");
        Ok(())
    }

    async fn deliver(&self, submission: &ContactSubmission) -> Result<()> {
        let inbox = self
            .inbox
            .as_deref()
            .ok_or_else(|| Error::Mail("no contact inbox configured".to_string()))?;
        let from = self.sender.as_deref().unwrap_or(inbox);

        self.mailer
            .send(&notification(submission, from, inbox))
            .await?;
        self.mailer
            .send(&auto_reply(submission, from, &self.owner_name))
            .await
    }
}

fn notification(submission: &ContactSubmission, from: &str, inbox: &str) -> OutgoingMail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0ea5e9;">New Contact Form Submission</h2>
  <div style="background-color: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Subject:</strong> {subject}</p>
    <p><strong>Message:</strong></p>
    <div style="background-color: white; padding: 15px; border-radius: 4px; border-left: 4px solid #0ea5e9;">
      {message}
    </div>
  </div>
  <p style="color: #64748b; font-size: 14px;">This message was sent from your portfolio contact form.</p>
</div>"#,
        name = escape_html(&submission.name),
        email = escape_html(&submission.email),
        subject = escape_html(&submission.subject),
        message = html_paragraph(&submission.message),
    );

    OutgoingMail {
        from: from.to_string(),
        to: inbox.to_string(),
        subject: format!("Portfolio Contact: {}", submission.subject),
        html,
    }
}

fn auto_reply(submission: &ContactSubmission, from: &str, owner_name: &str) -> OutgoingMail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0ea5e9;">Thank you for your message!</h2>
  <p>Hi {name},</p>
  <p>Thank you for reaching out to me through my portfolio. I've received your message and will get back to you as soon as possible.</p>
  <div style="background-color: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Your message:</strong></p>
    <div style="background-color: white; padding: 15px; border-radius: 4px; border-left: 4px solid #0ea5e9;">
      {message}
    </div>
  </div>
  <p>Best regards,<br>{owner}</p>
</div>"#,
        name = escape_html(&submission.name),
        message = html_paragraph(&submission.message),
        owner = escape_html(owner_name),
    );

    OutgoingMail {
        from: from.to_string(),
        to: submission.email.clone(),
        subject: "Thank you for reaching out!".to_string(),
        html,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escaped text with line breaks kept
fn html_paragraph(text: &str) -> String {
    escape_html(text).replace("\r\n", "\n").replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingMailer;
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn request(name: &str, email: &str, subject: &str, message: &str) -> ContactRequest {
        let field = |v: &str| (!v.is_empty()).then(|| v.to_string());
        ContactRequest {
            name: field(name),
            email: field(email),
            subject: field(subject),
            message: field(message),
        }
    }

    fn config() -> ContactConfig {
        ContactConfig {
            inbox: Some("owner@example.com".to_string()),
            ..ContactConfig::default()
        }
    }

    #[rstest]
    #[case("", "a@b.co", "Hi", "Hello", MISSING_FIELDS)]
    #[case("Ann", "", "Hi", "Hello", MISSING_FIELDS)]
    #[case("Ann", "a@b.co", "   ", "Hello", MISSING_FIELDS)]
    #[case("Ann", "a@b.co", "Hi", "", MISSING_FIELDS)]
    #[case("Ann", "not-an-email", "Hi", "Hello", INVALID_EMAIL)]
    #[case("Ann", "a@b", "Hi", "Hello", INVALID_EMAIL)]
    #[case("Ann", "a b@c.io", "Hi", "Hello", INVALID_EMAIL)]
    fn test_validation_rejects(
        #[case] name: &str,
        #[case] email: &str,
        #[case] subject: &str,
        #[case] message: &str,
        #[case] expected: &str,
    ) {
        let err = validate(request(name, email, subject, message)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), format!("Validation error: {expected}"));
    }

    #[test]
    fn test_validation_accepts_well_formed_submission() {
        let submission = validate(request("Ann", "ann@example.com", "Hi", "Hello")).unwrap();
        assert_eq!(submission.email, "ann@example.com");
    }

    #[tokio::test]
    async fn test_submit_sends_notification_then_auto_reply() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = ContactService::new(mailer.clone(), &config());

        service
            .submit(request("Ann <b>", "ann@example.com", "Role", "Line one\nLine two"))
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);

        assert_eq!(sent[0].to, "owner@example.com");
        assert_eq!(sent[0].from, "owner@example.com");
        assert_eq!(sent[0].subject, "Portfolio Contact: Role");
        assert!(sent[0].html.contains("Ann &lt;b&gt;"));
        assert!(sent[0].html.contains("Line one<br>Line two"));

        assert_eq!(sent[1].to, "ann@example.com");
        assert_eq!(sent[1].subject, "Thank you for reaching out!");
        assert!(sent[1].html.contains("Best regards,<br>Tahira"));
    }

    #[tokio::test]
    async fn test_invalid_submission_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = ContactService::new(mailer.clone(), &config());

        let err = service
            .submit(request("Ann", "nope", "Hi", "Hello"))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mailer_failure_is_reported() {
        let service = ContactService::new(Arc::new(RecordingMailer::failing()), &config());

        let err = service
            .submit(request("Ann", "ann@example.com", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Mail(_)));
    }

    #[tokio::test]
    async fn test_missing_inbox_is_a_mail_error() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = ContactService::new(mailer.clone(), &ContactConfig::default());

        let err = service
            .submit(request("Ann", "ann@example.com", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Mail(_)));
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
