use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use tracing::{debug, info};

use super::{Notifier, NotifyError};
use crate::config::PushoverConfig;

pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverNotifier {
    client: Client,
    endpoint: String,
    token: String,
    user_key: String,
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    request: String,
    #[serde(default)]
    errors: Vec<String>,
}

impl PushoverNotifier {
    pub fn new(token: impl Into<String>, user_key: impl Into<String>) -> Self {
        PushoverNotifier {
            client: Client::new(),
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            token: token.into(),
            user_key: user_key.into(),
        }
    }

    /// Build from the config section, falling back to the PUSHOVER_API_TOKEN /
    /// PUSHOVER_USER_KEY environment variables for unset fields.
    pub fn from_config(config: &PushoverConfig) -> Result<Self, NotifyError> {
        let token = resolve_credential(&config.api_token, "PUSHOVER_API_TOKEN")?;
        let user_key = resolve_credential(&config.user_key, "PUSHOVER_USER_KEY")?;
        Ok(Self::new(token, user_key))
    }

    /// Point the notifier at a different endpoint. Tests use this to talk to
    /// a local mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn resolve_credential(configured: &str, env_var: &str) -> Result<String, NotifyError> {
    if !configured.is_empty() {
        return Ok(configured.to_string());
    }
    env::var(env_var)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(NotifyError::MissingCredentials)
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, message: &str, title: &str, url: &str) -> Result<(), NotifyError> {
        debug!("Sending \"{}\" via Pushover", title);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("token", self.token.as_str()),
                ("user", self.user_key.as_str()),
                ("message", message),
                ("title", title),
                ("url", url),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<PushoverResponse>(&text) {
                Ok(body) if !body.errors.is_empty() => body.errors.join(", "),
                _ => text.trim().to_string(),
            };
            return Err(NotifyError::Rejected(format!("HTTP {}: {}", status, detail)));
        }

        let body: PushoverResponse = response.json().await?;
        if body.status != 1 {
            return Err(NotifyError::Rejected(body.errors.join(", ")));
        }

        info!("Pushover accepted the message, request {}", body.request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_notifier(server: &MockServer) -> PushoverNotifier {
        PushoverNotifier::new("app-token", "user-key")
            .with_endpoint(format!("{}/1/messages.json", server.uri()))
    }

    #[tokio::test]
    async fn test_notify_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 1,
                "request": "647d2300-702c-4b38-8b2f-d56326ae460b"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = test_notifier(&server);
        let result = notifier
            .notify("In stock", "[gpw] Vertical Mouse: CHF 120", "https://shop.example/product/42")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_notify_sends_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 1,
                "request": "r1"
            })))
            .mount(&server)
            .await;

        let notifier = test_notifier(&server);
        notifier
            .notify("Sold out", "[gpw] Vertical Mouse", "https://shop.example/product/42")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("token=app-token"));
        assert!(body.contains("user=user-key"));
        assert!(body.contains("message=Sold+out"));
        assert!(body.contains("title=%5Bgpw%5D+Vertical+Mouse"));
        assert!(body.contains("url=https%3A%2F%2Fshop.example%2Fproduct%2F42"));
    }

    #[tokio::test]
    async fn test_notify_rejected_by_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "status": 0,
                "request": "r2",
                "errors": ["application token is invalid"]
            })))
            .mount(&server)
            .await;

        let notifier = test_notifier(&server);
        let result = notifier.notify("msg", "title", "https://shop.example").await;

        let err = result.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(_)));
        assert!(err.to_string().contains("application token is invalid"));
    }

    #[tokio::test]
    async fn test_notify_server_error_without_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let notifier = test_notifier(&server);
        let err = notifier
            .notify("msg", "title", "https://shop.example")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn test_from_config_uses_configured_credentials() {
        let notifier = PushoverNotifier::from_config(&PushoverConfig {
            api_token: "app-token".to_string(),
            user_key: "user-key".to_string(),
        })
        .unwrap();

        assert_eq!(notifier.token, "app-token");
        assert_eq!(notifier.user_key, "user-key");
        assert_eq!(notifier.endpoint, PUSHOVER_ENDPOINT);
    }

    #[test]
    fn test_from_config_missing_credentials() {
        // Ask for an env var that is never set so the fallback misses too.
        let result = resolve_credential("", "GPW_TEST_UNSET_CREDENTIAL");
        assert!(matches!(result, Err(NotifyError::MissingCredentials)));
    }
}
