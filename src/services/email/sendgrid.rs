use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{http_client, DispatchError, EmailMessage, EmailProvider};
use crate::errors::AppError;

const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridProvider {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl SendGridProvider {
    pub fn new(
        api_url: Option<String>,
        api_key: String,
        from: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            from,
        })
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendGridPayload<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    // SendGrid requires text/plain before text/html.
    content: [Content<'a>; 2],
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        let payload = SendGridPayload {
            personalizations: [Personalization {
                to: [Address { email: &message.to }],
            }],
            from: Address { email: &self.from },
            subject: &message.subject,
            content: [
                Content {
                    kind: "text/plain",
                    value: &message.text_body,
                },
                Content {
                    kind: "text/html",
                    value: &message.html_body,
                },
            ],
        };

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "jane@example.com".to_string(),
            subject: "Share Your Experience with Atlas HomeServices".to_string(),
            html_body: "<a href=\"https://atlas.example/submit-review/abc\">Review</a>".to_string(),
            text_body: "https://atlas.example/submit-review/abc".to_string(),
        }
    }

    fn provider(server: &MockServer) -> SendGridProvider {
        SendGridProvider::new(
            Some(format!("{}/v3/mail/send", server.uri())),
            "SG.test".to_string(),
            "noreply@atlashomeservices.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_payload_uses_personalizations_and_plain_text_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test"))
            .and(body_json(json!({
                "personalizations": [{ "to": [{ "email": "jane@example.com" }] }],
                "from": { "email": "noreply@atlashomeservices.com" },
                "subject": "Share Your Experience with Atlas HomeServices",
                "content": [
                    { "type": "text/plain", "value": "https://atlas.example/submit-review/abc" },
                    { "type": "text/html", "value": "<a href=\"https://atlas.example/submit-review/abc\">Review</a>" },
                ],
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server).send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_key_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let result = provider(&server).send(&message()).await;
        assert!(matches!(result, Err(DispatchError::Rejected { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on port 1.
        let provider = SendGridProvider::new(
            Some("http://127.0.0.1:1/v3/mail/send".to_string()),
            "SG.test".to_string(),
            "noreply@atlashomeservices.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let result = provider.send(&message()).await;
        assert!(matches!(result, Err(DispatchError::Transport(_))));
    }
}
