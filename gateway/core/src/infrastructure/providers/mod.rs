// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Registry - Capability Resolution and Health Tracking
//
// Maps a logical (kind, name) pair to a capability handler. The handler
// table is built once at startup from configuration and is immutable
// afterwards, so the hot dispatch path takes no lock. Health state lives
// in a concurrent map refreshed by explicit probes.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::config::{resolve_secret, GatewayConfig};
use crate::domain::provider::{ProviderHandler, ProviderHealth, ProviderKind};

mod calendar;
mod crm;
mod email;
mod helpdesk;
mod knowledge;

pub use calendar::CalendarAdapter;
pub use crm::CrmAdapter;
pub use email::EmailAdapter;
pub use helpdesk::HelpdeskAdapter;
pub use knowledge::KnowledgeAdapter;

/// Dispatch-time resolution failures, distinguished so the ActionLog can
/// name the exact cause.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("ProviderNotConfigured: no {kind} provider named '{name}' is registered")]
    NotConfigured { kind: ProviderKind, name: String },

    #[error("ProviderUnavailable: provider '{name}' failed its last health check: {reason}")]
    Unavailable { name: String, reason: String },
}

/// Registry for provider capability handlers.
pub struct ProviderRegistry {
    handlers: HashMap<(ProviderKind, String), Arc<dyn ProviderHandler>>,
    health: DashMap<String, ProviderHealth>,
}

impl ProviderRegistry {
    /// An empty registry; every resolution fails with `NotConfigured`.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            health: DashMap::new(),
        }
    }

    /// Create the provider registry from gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let mut handlers: HashMap<(ProviderKind, String), Arc<dyn ProviderHandler>> =
            HashMap::new();

        info!("Initializing provider registry");

        for provider in &config.providers {
            if !provider.enabled {
                info!("Provider '{}' disabled, skipping", provider.name);
                continue;
            }

            let api_key = resolve_secret(&provider.api_key)?;
            let endpoint = provider.endpoint.clone();

            let handler: Arc<dyn ProviderHandler> = match provider.kind {
                ProviderKind::Crm => Arc::new(CrmAdapter::new(endpoint, api_key)),
                ProviderKind::Helpdesk => Arc::new(HelpdeskAdapter::new(endpoint, api_key)),
                ProviderKind::Calendar => Arc::new(CalendarAdapter::new(endpoint, api_key)),
                ProviderKind::Email => Arc::new(EmailAdapter::new(endpoint, api_key)),
                ProviderKind::Knowledge => Arc::new(KnowledgeAdapter::new(endpoint, api_key)),
            };

            info!(
                "Registered {} provider '{}' -> {}",
                provider.kind, provider.name, provider.endpoint
            );
            handlers.insert((provider.kind, provider.name.clone()), handler);
        }

        if handlers.is_empty() {
            warn!("No providers configured - every dispatch will fail resolution");
        }

        Ok(Self {
            handlers,
            health: DashMap::new(),
        })
    }

    /// Resolve a handler for dispatch.
    ///
    /// An unknown pair is `NotConfigured`; a registered handler whose last
    /// health probe failed is `Unavailable`. A provider that has never
    /// been probed is assumed healthy.
    pub fn resolve(
        &self,
        kind: ProviderKind,
        name: &str,
    ) -> Result<Arc<dyn ProviderHandler>, RegistryError> {
        let handler = self
            .handlers
            .get(&(kind, name.to_string()))
            .ok_or_else(|| RegistryError::NotConfigured {
                kind,
                name: name.to_string(),
            })?;

        if let Some(health) = self.health.get(name) {
            if !health.healthy {
                return Err(RegistryError::Unavailable {
                    name: name.to_string(),
                    reason: health
                        .error
                        .clone()
                        .unwrap_or_else(|| "health probe failed".to_string()),
                });
            }
        }

        Ok(handler.clone())
    }

    /// Probe every registered provider and refresh the health cache.
    pub async fn health_check_all(&self) -> BTreeMap<String, ProviderHealth> {
        let mut results = BTreeMap::new();

        for ((_, name), handler) in &self.handlers {
            let health = match handler.health_check().await {
                Ok(()) => ProviderHealth::healthy(Utc::now()),
                Err(err) => {
                    warn!("Provider '{}' failed health check: {}", name, err);
                    ProviderHealth::unhealthy(Utc::now(), err.to_string())
                }
            };
            self.health.insert(name.clone(), health.clone());
            results.insert(name.clone(), health);
        }

        results
    }

    /// Last known health per provider, without probing.
    pub fn health_snapshot(&self) -> BTreeMap<String, ProviderHealth> {
        self.health
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.handlers.keys().map(|(_, name)| name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Register a handler directly. Intended for tests and embedded
    /// setups that bypass configuration.
    pub fn with_handler(
        mut self,
        kind: ProviderKind,
        name: impl Into<String>,
        handler: Arc<dyn ProviderHandler>,
    ) -> Self {
        self.handlers.insert((kind, name.into()), handler);
        self
    }

    /// Overwrite one provider's cached health state.
    pub fn set_health(&self, name: impl Into<String>, health: ProviderHealth) {
        self.health.insert(name.into(), health);
    }
}

/// Map an upstream HTTP error status to the provider error taxonomy.
/// Shared by every adapter in this module.
pub(crate) fn error_for_status(
    status: reqwest::StatusCode,
    body: String,
) -> crate::domain::provider::ProviderError {
    use crate::domain::provider::ProviderError;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ProviderError::Authentication(body)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimit
    } else if status.is_server_error() {
        ProviderError::Upstream {
            status: status.as_u16(),
            message: body,
        }
    } else {
        ProviderError::Rejected(format!("HTTP {}: {}", status.as_u16(), body))
    }
}

/// Decode a provider response body, mapping failures into the taxonomy.
pub(crate) async fn read_json(
    response: reqwest::Response,
) -> Result<serde_json::Value, crate::domain::provider::ProviderError> {
    use crate::domain::provider::ProviderError;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(error_for_status(status, body));
    }

    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;
    if text.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Pull a required string field out of an action payload.
pub(crate) fn payload_str_field<'a>(
    payload: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, crate::domain::provider::ProviderError> {
    payload.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        crate::domain::provider::ProviderError::Rejected(format!(
            "payload is missing required field '{field}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ProviderEndpointConfig;

    fn config_with(providers: Vec<ProviderEndpointConfig>) -> GatewayConfig {
        GatewayConfig {
            providers,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn registry_creation_skips_disabled() {
        let config = config_with(vec![
            ProviderEndpointConfig {
                name: "hubspot".into(),
                kind: ProviderKind::Crm,
                endpoint: "https://crm.internal.test".into(),
                api_key: None,
                enabled: true,
            },
            ProviderEndpointConfig {
                name: "zendesk".into(),
                kind: ProviderKind::Helpdesk,
                endpoint: "https://desk.internal.test".into(),
                api_key: None,
                enabled: false,
            },
        ]);

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.resolve(ProviderKind::Crm, "hubspot").is_ok());
        assert!(matches!(
            registry.resolve(ProviderKind::Helpdesk, "zendesk"),
            Err(RegistryError::NotConfigured { .. })
        ));
    }

    #[test]
    fn kind_scoping_applies() {
        let config = config_with(vec![ProviderEndpointConfig {
            name: "hubspot".into(),
            kind: ProviderKind::Crm,
            endpoint: "https://crm.internal.test".into(),
            api_key: None,
            enabled: true,
        }]);
        let registry = ProviderRegistry::from_config(&config).unwrap();
        // Registered under crm, not resolvable as an email provider.
        assert!(matches!(
            registry.resolve(ProviderKind::Email, "hubspot"),
            Err(RegistryError::NotConfigured { .. })
        ));
    }

    #[test]
    fn unhealthy_provider_is_unavailable() {
        let config = config_with(vec![ProviderEndpointConfig {
            name: "hubspot".into(),
            kind: ProviderKind::Crm,
            endpoint: "https://crm.internal.test".into(),
            api_key: None,
            enabled: true,
        }]);
        let registry = ProviderRegistry::from_config(&config).unwrap();
        registry.set_health(
            "hubspot",
            ProviderHealth::unhealthy(Utc::now(), "connection refused".into()),
        );
        assert!(matches!(
            registry.resolve(ProviderKind::Crm, "hubspot"),
            Err(RegistryError::Unavailable { .. })
        ));
    }

    #[test]
    fn status_mapping() {
        use crate::domain::provider::ProviderError;

        assert!(matches!(
            error_for_status(reqwest::StatusCode::UNAUTHORIZED, "no".into()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ProviderError::RateLimit
        ));
        assert!(matches!(
            error_for_status(reqwest::StatusCode::BAD_GATEWAY, "oops".into()),
            ProviderError::Upstream { status: 502, .. }
        ));
        assert!(matches!(
            error_for_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, "bad".into()),
            ProviderError::Rejected(_)
        ));
    }
}
