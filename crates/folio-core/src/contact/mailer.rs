//! Mail delivery

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ContactConfig;
use crate::error::{Error, Result};
use crate::models::OutgoingMail;

/// Something that can deliver a rendered email
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one email
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Delivers mail through an HTTP relay accepting `{from, to, subject, html}` JSON
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    relay_url: Option<String>,
    token: Option<String>,
}

impl HttpMailer {
    /// Create a mailer from configuration
    pub fn new(config: &ContactConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            relay_url: config.relay_url.clone().filter(|url| !url.trim().is_empty()),
            token: config.relay_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    /// Whether a relay endpoint is configured
    pub fn is_configured(&self) -> bool {
        self.relay_url.is_some()
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let url = self
            .relay_url
            .as_deref()
            .ok_or_else(|| Error::Mail("no mail relay configured".to_string()))?;

        let mut request = self.client.post(url).json(mail);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Mail(format!("relay returned {status}: {body}")));
        }

        debug!(to = %mail.to, subject = %mail.subject, "Mail handed to relay");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mail() -> OutgoingMail {
        OutgoingMail {
            from: "site@example.com".to_string(),
            to: "owner@example.com".to_string(),
            subject: "Portfolio Contact: Hi".to_string(),
            html: "<p>hello</p>".to_string(),
        }
    }

    fn config(url: Option<String>) -> ContactConfig {
        ContactConfig {
            relay_url: url,
            relay_token: Some("relay-secret".to_string()),
            ..ContactConfig::default()
        }
    }

    #[tokio::test]
    async fn test_posts_mail_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer relay-secret"))
            .and(body_json(json!({
                "from": "site@example.com",
                "to": "owner@example.com",
                "subject": "Portfolio Contact: Hi",
                "html": "<p>hello</p>"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&config(Some(format!("{}/send", server.uri())))).unwrap();
        mailer.send(&mail()).await.unwrap();
    }

    #[tokio::test]
    async fn test_relay_failure_is_mail_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&config(Some(server.uri()))).unwrap();
        let err = mailer.send(&mail()).await.unwrap_err();

        assert!(matches!(err, Error::Mail(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_relay_fails() {
        let mailer = HttpMailer::new(&config(None)).unwrap();

        assert!(!mailer.is_configured());
        assert!(matches!(mailer.send(&mail()).await, Err(Error::Mail(_))));
    }
}
