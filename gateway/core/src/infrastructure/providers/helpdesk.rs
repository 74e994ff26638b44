// Helpdesk Provider Adapter
//
// Anti-Corruption Layer for ticketing systems (Zendesk-compatible ticket
// resources).

use async_trait::async_trait;

use super::{payload_str_field, read_json};
use crate::domain::action::ActionType;
use crate::domain::provider::{ProviderError, ProviderHandler};

pub struct HelpdeskAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HelpdeskAdapter {
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
impl ProviderHandler for HelpdeskAdapter {
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = match action {
            ActionType::HelpdeskCreateTicket => self
                .client
                .post(self.url("/helpdesk/v1/tickets"))
                .json(payload),
            ActionType::HelpdeskUpdateTicket => {
                let ticket_id = payload_str_field(payload, "ticket_id")?;
                self.client
                    .patch(self.url(&format!("/helpdesk/v1/tickets/{ticket_id}")))
                    .json(payload)
            }
            ActionType::HelpdeskSearchTickets => self
                .client
                .post(self.url("/helpdesk/v1/tickets/search"))
                .json(payload),
            other => {
                return Err(ProviderError::Rejected(format!(
                    "'{other}' is not a helpdesk operation"
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
    async fn update_patches_ticket_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/helpdesk/v1/tickets/T-42")
            .with_status(200)
            .with_body(r#"{"ticket_id": "T-42", "status": "solved"}"#)
            .create_async()
            .await;

        let adapter = HelpdeskAdapter::new(server.url(), "k".into());
        let result = adapter
            .execute(
                &ActionType::HelpdeskUpdateTicket,
                &json!({"ticket_id": "T-42", "status": "solved"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["status"], "solved");
    }

    #[tokio::test]
    async fn upstream_5xx_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/helpdesk/v1/tickets")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let adapter = HelpdeskAdapter::new(server.url(), "k".into());
        let err = adapter
            .execute(&ActionType::HelpdeskCreateTicket, &json!({"subject": "help"}))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
