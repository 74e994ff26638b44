// Calendar Provider Adapter
//
// Anti-Corruption Layer for calendar services. Event listings translate
// top-level scalar payload fields into query parameters.

use async_trait::async_trait;

use super::read_json;
use crate::domain::action::ActionType;
use crate::domain::provider::{ProviderError, ProviderHandler};

pub struct CalendarAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CalendarAdapter {
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

    /// Flatten scalar payload fields into query parameters. Nested values
    /// are rejected, matching what calendar list endpoints accept.
    fn query_params(
        payload: &serde_json::Value,
    ) -> Result<Vec<(String, String)>, ProviderError> {
        let Some(object) = payload.as_object() else {
            return Ok(Vec::new());
        };
        let mut params = Vec::with_capacity(object.len());
        for (key, value) in object {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ProviderError::Rejected(format!(
                        "list filter '{key}' must be a scalar value"
                    )))
                }
            };
            params.push((key.clone(), rendered));
        }
        Ok(params)
    }
}

#[async_trait]
impl ProviderHandler for CalendarAdapter {
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = match action {
            ActionType::CalendarCreateEvent => self
                .client
                .post(self.url("/calendar/v1/events"))
                .json(payload),
            ActionType::CalendarListEvents => self
                .client
                .get(self.url("/calendar/v1/events"))
                .query(&Self::query_params(payload)?),
            other => {
                return Err(ProviderError::Rejected(format!(
                    "'{other}' is not a calendar operation"
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
