//! Outbound email through the Resend HTTP API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::EmailConfig;

/// A rendered email ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// How the provider answered a send
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Accepted { id: Option<String> },
    /// The provider refused the message; `details` is its response body
    Rejected { status: u16, details: JsonValue },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Submit one email. Transport failures are errors; provider refusals
    /// are reported as [`SendOutcome::Rejected`].
    async fn send(&self, email: &OutgoingEmail) -> Result<SendOutcome>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

pub struct ResendMailer {
    http: reqwest::Client,
    config: EmailConfig,
}

impl ResendMailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendOutcome> {
        let body = ResendRequest {
            from: &self.config.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach email provider")?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .context("Failed to read email provider response")?;

        if status.is_success() {
            let parsed: ResendResponse = serde_json::from_slice(&bytes)
                .context("Email provider returned an unreadable response")?;
            return Ok(SendOutcome::Accepted { id: parsed.id });
        }

        let details = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()));
        Ok(SendOutcome::Rejected {
            status: status.as_u16(),
            details,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer_for(api_url: String) -> ResendMailer {
        ResendMailer::new(EmailConfig {
            api_key: "re_test_key".to_string(),
            api_url,
            from: "Property Inspection <noreply@example.com>".to_string(),
        })
        .unwrap()
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "Booking confirmed".to_string(),
            html: "<p>hello</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test_key"))
            .and(body_json(json!({
                "from": "Property Inspection <noreply@example.com>",
                "to": ["alice@example.com"],
                "subject": "Booking confirmed",
                "html": "<p>hello</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_123"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = mailer_for(format!("{}/emails", server.uri()))
            .send(&email())
            .await
            .unwrap();

        assert_eq!(outcome, SendOutcome::Accepted { id: Some("msg_123".to_string()) });
    }

    #[tokio::test]
    async fn test_send_rejected_passes_details_through() {
        let server = MockServer::start().await;
        let provider_error = json!({
            "statusCode": 422,
            "name": "validation_error",
            "message": "Invalid `to` field."
        });
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_json(provider_error.clone()))
            .mount(&server)
            .await;

        let outcome = mailer_for(format!("{}/emails", server.uri()))
            .send(&email())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Rejected {
                status: 422,
                details: provider_error
            }
        );
    }

    #[tokio::test]
    async fn test_send_rejected_with_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let outcome = mailer_for(format!("{}/emails", server.uri()))
            .send(&email())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Rejected {
                status: 503,
                details: json!("upstream unavailable")
            }
        );
    }

    #[tokio::test]
    async fn test_send_unreadable_success_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = mailer_for(format!("{}/emails", server.uri())).send(&email()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_network_failure_is_error() {
        // Nothing listens on port 1
        let result = mailer_for("http://127.0.0.1:1/emails".to_string())
            .send(&email())
            .await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Failed to reach email provider"));
    }
}
