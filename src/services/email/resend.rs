use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{http_client, DispatchError, EmailMessage, EmailProvider};
use crate::errors::AppError;

const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendProvider {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendProvider {
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
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[async_trait]
impl EmailProvider for ResendProvider {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html_body,
            text: &message.text_body,
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
            subject: "Your Painting Service Booking Confirmation".to_string(),
            html_body: "<p>Thanks</p>".to_string(),
            text_body: "Thanks".to_string(),
        }
    }

    fn provider(server: &MockServer) -> ResendProvider {
        ResendProvider::new(
            Some(format!("{}/emails", server.uri())),
            "re_test_key".to_string(),
            "noreply@atlashomeservices.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_message_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test_key"))
            .and(body_json(json!({
                "from": "noreply@atlashomeservices.com",
                "to": ["jane@example.com"],
                "subject": "Your Painting Service Booking Confirmation",
                "html": "<p>Thanks</p>",
                "text": "Thanks",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server).send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from address"))
            .mount(&server)
            .await;

        let result = provider(&server).send(&message()).await;
        match result {
            Err(DispatchError::Rejected { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "invalid from address");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
