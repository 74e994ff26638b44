// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Recorder
//!
//! Emits append-only audit records for every state-changing operation
//! (tenant creation, key rotation, config changes).
//!
//! ## Failure Semantics
//!
//! An audit write failure must never roll back or block the operation it
//! describes. Failures are surfaced on the operator channel instead: a
//! structured `error!` event carrying the full context plus the
//! `gateway_audit_write_failures_total` counter, so a dropped record is
//! always a reportable incident rather than a silent gap.

use std::sync::Arc;
use tracing::error;

use crate::domain::audit::{AuditLog, AuditLogId, ChangeSet, RequestContext};
use crate::domain::repository::AuditLogRepository;
use crate::domain::tenant::TenantId;

pub struct AuditRecorder {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditRecorder {
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Record one audit event. Returns the record id, or `None` when the
    /// write failed and was reported to the operator channel.
    pub async fn record(
        &self,
        tenant_id: TenantId,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        changes: Option<ChangeSet>,
        ctx: &RequestContext,
    ) -> Option<AuditLogId> {
        let log = AuditLog::new(tenant_id, action, resource_type, resource_id, changes, ctx);
        match self.repository.append(&log).await {
            Ok(()) => Some(log.id),
            Err(err) => {
                metrics::counter!("gateway_audit_write_failures_total").increment(1);
                error!(
                    tenant_id = %tenant_id,
                    action,
                    resource_type,
                    resource_id,
                    error = %err,
                    "audit write failed; event was NOT persisted"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::repository::{AuditLogFilter, Page, RepositoryError};

    struct FailingAuditRepository;

    #[async_trait]
    impl AuditLogRepository for FailingAuditRepository {
        async fn append(&self, _log: &AuditLog) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database("disk full".into()))
        }

        async fn list(
            &self,
            _tenant_id: TenantId,
            _filter: &AuditLogFilter,
            _page: Page,
        ) -> Result<Vec<AuditLog>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn find_by_resource(
            &self,
            _tenant_id: TenantId,
            _resource_type: &str,
            _resource_id: &str,
            _page: Page,
        ) -> Result<Vec<AuditLog>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    struct CollectingAuditRepository {
        rows: Mutex<Vec<AuditLog>>,
    }

    #[async_trait]
    impl AuditLogRepository for CollectingAuditRepository {
        async fn append(&self, log: &AuditLog) -> Result<(), RepositoryError> {
            self.rows.lock().unwrap().push(log.clone());
            Ok(())
        }

        async fn list(
            &self,
            _tenant_id: TenantId,
            _filter: &AuditLogFilter,
            _page: Page,
        ) -> Result<Vec<AuditLog>, RepositoryError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn find_by_resource(
            &self,
            _tenant_id: TenantId,
            _resource_type: &str,
            _resource_id: &str,
            _page: Page,
        ) -> Result<Vec<AuditLog>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let recorder = AuditRecorder::new(Arc::new(FailingAuditRepository));
        let id = recorder
            .record(
                TenantId::new(),
                "tenant.created",
                "tenant",
                "t-1",
                None,
                &RequestContext::default(),
            )
            .await;
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn successful_write_returns_id() {
        let repo = Arc::new(CollectingAuditRepository {
            rows: Mutex::new(Vec::new()),
        });
        let recorder = AuditRecorder::new(repo.clone());
        let id = recorder
            .record(
                TenantId::new(),
                "tenant.api_key_rotated",
                "tenant",
                "t-1",
                None,
                &RequestContext::default(),
            )
            .await;
        assert!(id.is_some());
        assert_eq!(repo.rows.lock().unwrap().len(), 1);
    }
}
