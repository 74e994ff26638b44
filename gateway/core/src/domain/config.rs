// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration schema for GARRISON gateway nodes, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server binding and admin surface
// - Storage backend selection (in-memory vs PostgreSQL)
// - Dispatch policy (timeout, retry budget, backoff, stats window)
// - Provider endpoint registration with env-indirect credentials

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::provider::ProviderKind;

pub const API_VERSION: &str = "garrison.dev/v1";
pub const KIND: &str = "GatewayConfig";

const CONFIG_PATH_ENV: &str = "GARRISON_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "garrison.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("environment variable not set: {0}")]
    MissingEnv(String),
}

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "garrison.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    /// Manifest metadata (name, labels, version)
    pub metadata: ManifestMetadata,

    /// Gateway configuration specification
    pub spec: GatewayConfig,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name (unique identifier)
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional: Labels for categorization and discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Gateway configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Provider endpoint registrations, one per external system.
    #[serde(default)]
    pub providers: Vec<ProviderEndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional Prometheus exporter port; metrics are disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,

    /// Admin surface token (supports "env:VAR_NAME" indirection). The
    /// admin endpoints return 403 when no token is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_port: None,
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: DatabaseBackend,

    /// Connection string for the postgres backend (supports "env:VAR_NAME").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Wall-clock bound on one provider handler invocation.
    #[serde(with = "humantime_serde", default = "default_action_timeout")]
    pub action_timeout: Duration,

    /// Total attempt budget per dispatch (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base; attempt n sleeps base * 2^(n-1), capped below.
    #[serde(with = "humantime_serde", default = "default_retry_base_delay")]
    pub retry_base_delay: Duration,

    #[serde(with = "humantime_serde", default = "default_retry_max_delay")]
    pub retry_max_delay: Duration,

    /// Recent window over which /logs/stats aggregates.
    #[serde(with = "humantime_serde", default = "default_stats_window")]
    pub stats_window: Duration,

    /// Row cap inside the stats window, so a hot tenant cannot make the
    /// read path unbounded.
    #[serde(default = "default_stats_row_cap")]
    pub stats_row_cap: i64,

    #[serde(default = "default_page_limit")]
    pub default_page_limit: i64,

    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: i64,

    /// Interval of the background provider health probe.
    #[serde(with = "humantime_serde", default = "default_health_refresh")]
    pub health_refresh_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            action_timeout: default_action_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_delay: default_retry_base_delay(),
            retry_max_delay: default_retry_max_delay(),
            stats_window: default_stats_window(),
            stats_row_cap: default_stats_row_cap(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            health_refresh_interval: default_health_refresh(),
        }
    }
}

/// One registered provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpointConfig {
    /// Logical provider name, unique across the gateway (e.g. "hubspot").
    pub name: String,

    /// Integration area this endpoint serves.
    pub kind: ProviderKind,

    /// Base URL of the external system.
    pub endpoint: String,

    /// Credential (supports "env:VAR_NAME" syntax).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8400
}
fn default_backend() -> DatabaseBackend {
    DatabaseBackend::Memory
}
fn default_max_connections() -> u32 {
    5
}
fn default_action_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay() -> Duration {
    Duration::from_millis(500)
}
fn default_retry_max_delay() -> Duration {
    Duration::from_secs(10)
}
fn default_stats_window() -> Duration {
    Duration::from_secs(60 * 60)
}
fn default_stats_row_cap() -> i64 {
    5000
}
fn default_page_limit() -> i64 {
    50
}
fn default_max_page_limit() -> i64 {
    200
}
fn default_health_refresh() -> Duration {
    Duration::from_secs(60)
}
fn default_enabled() -> bool {
    true
}

impl GatewayConfigManifest {
    /// Parse a manifest from YAML.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let manifest: Self = serde_yaml::from_str(raw)?;
        Ok(manifest)
    }

    /// Load a manifest from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Discover the configuration: explicit path, then the
    /// `GARRISON_CONFIG` environment variable, then `./garrison.yaml`,
    /// finally built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&env_path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::Invalid(format!(
                "apiVersion must be '{API_VERSION}', got '{}'",
                self.api_version
            )));
        }
        if self.kind != KIND {
            return Err(ConfigError::Invalid(format!(
                "kind must be '{KIND}', got '{}'",
                self.kind
            )));
        }
        if self.spec.dispatch.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_attempts must be at least 1".into(),
            ));
        }
        if self.spec.dispatch.default_page_limit > self.spec.dispatch.max_page_limit {
            return Err(ConfigError::Invalid(
                "dispatch.default_page_limit exceeds dispatch.max_page_limit".into(),
            ));
        }
        if self.spec.database.backend == DatabaseBackend::Postgres
            && self.spec.database.url.is_none()
        {
            return Err(ConfigError::Invalid(
                "database.url is required for the postgres backend".into(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.spec.providers {
            if provider.name.is_empty() {
                return Err(ConfigError::Invalid("provider name may not be empty".into()));
            }
            if provider.endpoint.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' has an empty endpoint",
                    provider.name
                )));
            }
            if !seen.insert(provider.name.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider name '{}'",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "garrison-local".to_string(),
                version: None,
                labels: None,
            },
            spec: GatewayConfig::default(),
        }
    }
}

/// Resolve a possibly env-indirect secret ("env:VAR_NAME" syntax).
pub fn resolve_secret(value: &Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if v.starts_with("env:") => {
            let var_name = v.strip_prefix("env:").unwrap();
            std::env::var(var_name).map_err(|_| ConfigError::MissingEnv(var_name.to_string()))
        }
        Some(v) => Ok(v.clone()),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: garrison.dev/v1
kind: GatewayConfig
metadata:
  name: edge-1
spec:
  server:
    host: 0.0.0.0
    port: 9000
  database:
    backend: memory
  dispatch:
    action_timeout: 5s
    max_attempts: 4
    retry_base_delay: 250ms
  providers:
    - name: hubspot
      kind: crm
      endpoint: https://crm.internal.test
      api_key: env:HUBSPOT_API_KEY
    - name: zendesk
      kind: helpdesk
      endpoint: https://desk.internal.test
      enabled: false
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = GatewayConfigManifest::from_yaml(SAMPLE).unwrap();
        manifest.validate().unwrap();
        assert_eq!(manifest.spec.server.port, 9000);
        assert_eq!(manifest.spec.dispatch.max_attempts, 4);
        assert_eq!(
            manifest.spec.dispatch.action_timeout,
            Duration::from_secs(5)
        );
        assert_eq!(manifest.spec.providers.len(), 2);
        assert_eq!(manifest.spec.providers[0].kind, ProviderKind::Crm);
        assert!(!manifest.spec.providers[1].enabled);
    }

    #[test]
    fn defaults_are_valid() {
        GatewayConfigManifest::default().validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_provider_names() {
        let mut manifest = GatewayConfigManifest::default();
        for _ in 0..2 {
            manifest.spec.providers.push(ProviderEndpointConfig {
                name: "hubspot".into(),
                kind: ProviderKind::Crm,
                endpoint: "https://crm.internal.test".into(),
                api_key: None,
                enabled: true,
            });
        }
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_postgres_without_url() {
        let mut manifest = GatewayConfigManifest::default();
        manifest.spec.database.backend = DatabaseBackend::Postgres;
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_zero_attempts() {
        let mut manifest = GatewayConfigManifest::default();
        manifest.spec.dispatch.max_attempts = 0;
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn resolves_literal_secret() {
        assert_eq!(
            resolve_secret(&Some("plain-token".into())).unwrap(),
            "plain-token"
        );
        assert_eq!(resolve_secret(&None).unwrap(), "");
    }
}
