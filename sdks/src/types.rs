// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Wire types mirrored from the gateway REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Request body for `POST /api/v1/actions`.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchBody {
    pub action_type: String,
    pub provider_name: String,
    pub payload: serde_json::Value,
}

/// Full action log row as returned by dispatch and the detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub action_type: String,
    pub provider_name: String,
    pub request_payload: serde_json::Value,
    pub response_data: Option<serde_json::Value>,
    pub status: String,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view without the raw payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionLogSummary {
    pub id: Uuid,
    pub action_type: String,
    pub provider_name: String,
    pub status: String,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionStats {
    pub window_minutes: i64,
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub timeout_count: u64,
    pub avg_execution_ms: f64,
    pub by_type: BTreeMap<String, u64>,
    pub by_provider: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub changes: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub last_check: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderHealthReport {
    pub status: String,
    pub providers: BTreeMap<String, ProviderHealth>,
}

/// Error envelope attached to every non-2xx gateway response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Optional filters for action log listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Optional filters for audit log listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}
