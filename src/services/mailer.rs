use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Transactional email over a `{from, to, subject, html} -> {id}` HTTP API.
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }

    /// Send an email, returning the provider's message id.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String> {
        let request = SendEmailRequest {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::EmailApi(format!("API error: {}", error_text)));
        }

        let send_response: SendEmailResponse = response.json().await?;

        send_response
            .id
            .ok_or_else(|| AppError::EmailApi("No message id returned from API".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer re_key"))
            .and(body_json(json!({
                "from": "studio@example.com",
                "to": ["ops@example.com"],
                "subject": "Batch finished",
                "html": "<p>done</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_123"})))
            .mount(&server)
            .await;

        let mailer = Mailer::new(
            server.uri(),
            "re_key".to_string(),
            "studio@example.com".to_string(),
        )
        .unwrap();
        let id = mailer
            .send("ops@example.com", "Batch finished", "<p>done</p>")
            .await
            .unwrap();
        assert_eq!(id, "msg_123");
    }

    #[tokio::test]
    async fn rejected_send_is_an_email_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let mailer = Mailer::new(server.uri(), "k".to_string(), "bad".to_string()).unwrap();
        let err = mailer.send("ops@example.com", "s", "h").await.unwrap_err();
        assert!(matches!(err, AppError::EmailApi(msg) if msg.contains("invalid from")));
    }
}
