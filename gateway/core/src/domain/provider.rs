// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Domain Interface (Anti-Corruption Layer)
//
// Defines the domain interface for external integration providers (CRM,
// helpdesk, calendar, email, knowledge). Prevents vendor lock-in by
// abstracting the external APIs behind one handler per provider kind.
//
// Implementations in infrastructure/providers/ directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::action::ActionType;

/// The five integration areas the gateway routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Crm,
    Helpdesk,
    Calendar,
    Email,
    Knowledge,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Crm => "crm",
            ProviderKind::Helpdesk => "helpdesk",
            ProviderKind::Calendar => "calendar",
            ProviderKind::Email => "email",
            ProviderKind::Knowledge => "knowledge",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crm" => Ok(ProviderKind::Crm),
            "helpdesk" => Ok(ProviderKind::Helpdesk),
            "calendar" => Ok(ProviderKind::Calendar),
            "email" => Ok(ProviderKind::Email),
            "knowledge" => Ok(ProviderKind::Knowledge),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// Domain interface for provider capability handlers.
///
/// One implementation per provider kind; instances are registered at
/// startup and never change afterwards.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    /// Execute one action against the external system.
    async fn execute(
        &self,
        action: &ActionType,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Check whether the provider is reachable and accepting requests.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Errors surfaced by provider handlers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Rejected by provider: {0}")]
    Rejected(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the dispatcher's retry policy applies. Rate limits and
    /// upstream 5xx responses are transient; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit | ProviderError::Upstream { .. }
        )
    }
}

/// Last observed health of one registered provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderHealth {
    pub fn healthy(at: DateTime<Utc>) -> Self {
        Self {
            healthy: true,
            last_check: at,
            error: None,
        }
    }

    pub fn unhealthy(at: DateTime<Utc>, error: String) -> Self {
        Self {
            healthy: false,
            last_check: at,
            error: Some(error),
        }
    }
}

/// Per-tenant provider configuration.
///
/// A tagged, versioned schema per provider kind: malformed or unknown
/// config bodies are rejected at deserialization instead of silently
/// riding along as an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum ProviderSettings {
    #[serde(rename = "crm/v1")]
    CrmV1 {
        #[serde(skip_serializing_if = "Option::is_none")]
        pipeline: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        owner_id: Option<String>,
        #[serde(default)]
        custom_fields: HashMap<String, String>,
    },

    #[serde(rename = "helpdesk/v1")]
    HelpdeskV1 {
        #[serde(skip_serializing_if = "Option::is_none")]
        default_queue: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default_priority: Option<String>,
    },

    #[serde(rename = "calendar/v1")]
    CalendarV1 {
        #[serde(skip_serializing_if = "Option::is_none")]
        calendar_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },

    #[serde(rename = "email/v1")]
    EmailV1 {
        from_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },

    #[serde(rename = "knowledge/v1")]
    KnowledgeV1 {
        #[serde(skip_serializing_if = "Option::is_none")]
        base_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSettings::CrmV1 { .. } => ProviderKind::Crm,
            ProviderSettings::HelpdeskV1 { .. } => ProviderKind::Helpdesk,
            ProviderSettings::CalendarV1 { .. } => ProviderKind::Calendar,
            ProviderSettings::EmailV1 { .. } => ProviderKind::Email,
            ProviderSettings::KnowledgeV1 { .. } => ProviderKind::Knowledge,
        }
    }
}
