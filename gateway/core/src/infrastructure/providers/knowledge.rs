// Knowledge Base Provider Adapter
//
// Anti-Corruption Layer for knowledge/wiki systems (article search and
// retrieval).

use async_trait::async_trait;

use super::{payload_str_field, read_json};
use crate::domain::action::ActionType;
use crate::domain::provider::{ProviderError, ProviderHandler};

pub struct KnowledgeAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl KnowledgeAdapter {
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
impl ProviderHandler for KnowledgeAdapter {
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = match action {
            ActionType::KnowledgeSearch => self
                .client
                .post(self.url("/knowledge/v1/search"))
                .json(payload),
            ActionType::KnowledgeGetArticle => {
                let article_id = payload_str_field(payload, "article_id")?;
                self.client
                    .get(self.url(&format!("/knowledge/v1/articles/{article_id}")))
            }
            other => {
                return Err(ProviderError::Rejected(format!(
                    "'{other}' is not a knowledge operation"
                )))
            }
        };

        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        read_json(response).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.url("/health"))
            .bearer_auth(&self.api_key)
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
    async fn get_article_builds_resource_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/knowledge/v1/articles/kb-7")
            .with_status(200)
            .with_body(r#"{"article_id": "kb-7", "title": "VPN setup"}"#)
            .create_async()
            .await;

        let adapter = KnowledgeAdapter::new(server.url(), "k".into());
        let result = adapter
            .execute(
                &ActionType::KnowledgeGetArticle,
                &json!({"article_id": "kb-7"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["title"], "VPN setup");
    }

    #[tokio::test]
    async fn malformed_upstream_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/knowledge/v1/search")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let adapter = KnowledgeAdapter::new(server.url(), "k".into());
        let err = adapter
            .execute(&ActionType::KnowledgeSearch, &json!({"query": "vpn"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
