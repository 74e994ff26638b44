// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::types::{
    ActionListFilter, ActionLog, ActionLogSummary, ActionStats, AuditListFilter, AuditLog,
    DispatchBody, ErrorEnvelope, ProviderHealthReport,
};

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A well-formed gateway error envelope.
    #[error("gateway error {code}: {message} (correlation {correlation_id})")]
    Gateway {
        status: u16,
        code: String,
        message: String,
        correlation_id: uuid::Uuid,
    },

    #[error("unexpected response (HTTP {status}): {body}")]
    Unexpected { status: u16, body: String },
}

/// Client for interacting with the GARRISON gateway.
pub struct GatewayClient {
    base_url: String,
    client: Client,
    api_key: Option<String>,
    admin_token: Option<String>,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            api_key: None,
            admin_token: None,
        }
    }

    /// Set the tenant API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the admin token for the admin surface.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key.as_str());
        }
        if let Some(token) = &self.admin_token {
            request = request.header("X-Admin-Token", token.as_str());
        }
        request
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SdkError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(SdkError::Gateway {
                status: status.as_u16(),
                code: envelope.code,
                message: envelope.message,
                correlation_id: envelope.correlation_id,
            }),
            Err(_) => Err(SdkError::Unexpected {
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// Dispatch a provider action. The returned log is the durable record
    /// of the outcome, whatever it was.
    pub async fn dispatch(&self, body: &DispatchBody) -> Result<ActionLog, SdkError> {
        let request = self
            .apply_auth(self.client.post(self.url("/api/v1/actions")))
            .json(body);
        Self::decode(request.send().await?).await
    }

    /// List action logs with optional filters and pagination.
    pub async fn list_action_logs(
        &self,
        filter: &ActionListFilter,
    ) -> Result<Vec<ActionLogSummary>, SdkError> {
        let request = self
            .apply_auth(self.client.get(self.url("/api/v1/logs/actions")))
            .query(filter);
        Self::decode(request.send().await?).await
    }

    /// Fetch one action log including raw request/response payloads.
    pub async fn get_action_log(&self, id: uuid::Uuid) -> Result<ActionLog, SdkError> {
        let request =
            self.apply_auth(self.client.get(self.url(&format!("/api/v1/logs/actions/{id}"))));
        Self::decode(request.send().await?).await
    }

    /// Recently failed actions, for operational alerting.
    pub async fn recent_failed_actions(
        &self,
        minutes: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<ActionLogSummary>, SdkError> {
        let mut query: Vec<(&str, i64)> = Vec::new();
        if let Some(minutes) = minutes {
            query.push(("minutes", minutes));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        let request = self
            .apply_auth(
                self.client
                    .get(self.url("/api/v1/logs/actions/failed/recent")),
            )
            .query(&query);
        Self::decode(request.send().await?).await
    }

    /// Aggregate dispatch statistics over the gateway's recent window.
    pub async fn action_stats(&self) -> Result<ActionStats, SdkError> {
        let request = self.apply_auth(self.client.get(self.url("/api/v1/logs/stats")));
        Self::decode(request.send().await?).await
    }

    /// List audit logs with optional filters.
    pub async fn list_audit_logs(
        &self,
        filter: &AuditListFilter,
    ) -> Result<Vec<AuditLog>, SdkError> {
        let request = self
            .apply_auth(self.client.get(self.url("/api/v1/logs/audits")))
            .query(filter);
        Self::decode(request.send().await?).await
    }

    /// Audit history of one resource, oldest first.
    pub async fn audits_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditLog>, SdkError> {
        let request = self.apply_auth(self.client.get(self.url(&format!(
            "/api/v1/logs/audits/resource/{resource_type}/{resource_id}"
        ))));
        Self::decode(request.send().await?).await
    }

    /// Probe provider health through the gateway.
    pub async fn provider_health(&self) -> Result<ProviderHealthReport, SdkError> {
        let request = self.client.get(self.url("/health/providers"));
        Self::decode(request.send().await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn dispatch_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/actions")
            .match_header("x-api-key", "grsn_test")
            .with_status(200)
            .with_body(
                json!({
                    "id": "5f8b7c3e-8a9f-4f1f-9d9c-1f2e3a4b5c6d",
                    "tenant_id": "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9",
                    "action_type": "email_send",
                    "provider_name": "postmark",
                    "request_payload": {"to": "x@y.z"},
                    "response_data": null,
                    "status": "success",
                    "error_message": null,
                    "attempts": 1,
                    "execution_time_ms": 42,
                    "created_at": "2026-03-01T00:00:00Z",
                    "updated_at": "2026-03-01T00:00:01Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GatewayClient::new(server.url()).with_api_key("grsn_test");
        let log = client
            .dispatch(&DispatchBody {
                action_type: "email_send".into(),
                provider_name: "postmark".into(),
                payload: json!({"to": "x@y.z"}),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(log.status, "success");
        assert_eq!(log.attempts, 1);
    }

    #[tokio::test]
    async fn error_envelope_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/logs/stats")
            .with_status(401)
            .with_body(
                json!({
                    "code": "unauthorized",
                    "message": "invalid or missing API key",
                    "correlation_id": "5f8b7c3e-8a9f-4f1f-9d9c-1f2e3a4b5c6d",
                    "timestamp": "2026-03-01T00:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GatewayClient::new(server.url());
        let err = client.action_stats().await.unwrap_err();
        match err {
            SdkError::Gateway { status, code, .. } => {
                assert_eq!(status, 401);
                assert_eq!(code, "unauthorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
