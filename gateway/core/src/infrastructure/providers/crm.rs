// CRM Provider Adapter
//
// Anti-Corruption Layer for CRM-style REST APIs (HubSpot-compatible
// contact resources).

use async_trait::async_trait;

use super::{payload_str_field, read_json};
use crate::domain::action::ActionType;
use crate::domain::provider::{ProviderError, ProviderHandler};

pub struct CrmAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CrmAdapter {
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
impl ProviderHandler for CrmAdapter {
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = match action {
            ActionType::CrmCreateContact => self
                .client
                .post(self.url("/crm/v1/contacts"))
                .json(payload),
            ActionType::CrmUpdateContact => {
                let contact_id = payload_str_field(payload, "id")?;
                self.client
                    .patch(self.url(&format!("/crm/v1/contacts/{contact_id}")))
                    .json(payload)
            }
            ActionType::CrmSearchContacts => self
                .client
                .post(self.url("/crm/v1/contacts/search"))
                .json(payload),
            other => {
                return Err(ProviderError::Rejected(format!(
                    "'{other}' is not a CRM operation"
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
    async fn create_contact_posts_to_contacts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/crm/v1/contacts")
            .match_header("authorization", "Bearer test-key")
            .with_status(201)
            .with_body(r#"{"id": "c-1", "email": "jane@acme.test"}"#)
            .create_async()
            .await;

        let adapter = CrmAdapter::new(server.url(), "test-key".into());
        let result = adapter
            .execute(
                &ActionType::CrmCreateContact,
                &json!({"email": "jane@acme.test"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["id"], "c-1");
    }

    #[tokio::test]
    async fn update_without_id_is_rejected() {
        let adapter = CrmAdapter::new("http://127.0.0.1:9".into(), "k".into());
        let err = adapter
            .execute(&ActionType::CrmUpdateContact, &json!({"email": "x@y.z"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/crm/v1/contacts/search")
            .with_status(429)
            .create_async()
            .await;

        let adapter = CrmAdapter::new(server.url(), "k".into());
        let err = adapter
            .execute(&ActionType::CrmSearchContacts, &json!({"query": "jane"}))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
