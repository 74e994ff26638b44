// Email Provider Adapter
//
// Anti-Corruption Layer for transactional email services. Sends return
// 202 with an empty body on some providers, which decodes to null.

use async_trait::async_trait;

use super::read_json;
use crate::domain::action::ActionType;
use crate::domain::provider::{ProviderError, ProviderHandler};

pub struct EmailAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl EmailAdapter {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ProviderHandler for EmailAdapter {
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = match action {
            ActionType::EmailSend => self
                .client
                .post(self.url("/email/v1/messages"))
                .json(payload),
            ActionType::EmailSearch => self
                .client
                .post(self.url("/email/v1/messages/search"))
                .json(payload),
            other => {
                return Err(ProviderError::Rejected(format!(
                    "'{other}' is not an email operation"
                )))
            }
        };

        let response = request
            .header("X-Server-Token", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        read_json(response).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.url("/health"))
            .header("X-Server-Token", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            Err(ProviderError::Authentication("Invalid API key".into()))
        } else {
            Err(ProviderError::Network(format!(
                "HTTP {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn send_uses_server_token_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/email/v1/messages")
            .match_header("x-server-token", "mail-key")
            .with_status(202)
            .with_body("")
            .create_async()
            .await;

        let adapter = EmailAdapter::new(server.url(), "mail-key".into());
        let result = adapter
            .execute(
                &ActionType::EmailSend,
                &json!({"to": "jane@acme.test", "subject": "hi"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn auth_failure_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/email/v1/messages")
            .with_status(401)
            .with_body("bad token")
            .create_async()
            .await;

        let adapter = EmailAdapter::new(server.url(), "wrong".into());
        let err = adapter
            .execute(&ActionType::EmailSend, &json!({"to": "x@y.z"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
        assert!(!err.is_transient());
    }
}
