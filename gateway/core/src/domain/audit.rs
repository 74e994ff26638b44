// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Before/after snapshot attached to a state-changing audit event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

impl ChangeSet {
    pub fn new(before: Option<serde_json::Value>, after: Option<serde_json::Value>) -> Self {
        Self { before, after }
    }
}

/// Request-scoped context carried into audit records.
///
/// `user_id` is absent for system-initiated operations.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Append-only record of a security/compliance-relevant state change.
///
/// Never mutated after creation: the repository trait exposes no update
/// or delete for this aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub tenant_id: TenantId,
    pub user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub changes: Option<ChangeSet>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        tenant_id: TenantId,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        changes: Option<ChangeSet>,
        ctx: &RequestContext,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            tenant_id,
            user_id: ctx.user_id.clone(),
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            changes,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_events_carry_no_user() {
        let log = AuditLog::new(
            TenantId::new(),
            "tenant.created",
            "tenant",
            "t-1",
            None,
            &RequestContext::default(),
        );
        assert!(log.user_id.is_none());
        assert!(log.changes.is_none());
    }

    #[test]
    fn changes_serialize_sparsely() {
        let changes = ChangeSet::new(None, Some(json!({"is_active": false})));
        let raw = serde_json::to_string(&changes).unwrap();
        assert!(!raw.contains("before"));
        assert!(raw.contains("after"));
    }
}
