// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-memory repository implementations for development and testing.
// Each write holds the mutex for the duration of the mutation, giving the
// same per-write atomicity the PostgreSQL implementations get from
// single-row statements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;

use crate::domain::action::{ActionLog, ActionLogId, ActionStatus};
use crate::domain::audit::AuditLog;
use crate::domain::repository::{
    ActionLogFilter, ActionLogRepository, AuditLogFilter, AuditLogRepository, Page,
    RepositoryError, TenantRepository,
};
use crate::domain::tenant::{Tenant, TenantId};

fn poisoned() -> RepositoryError {
    RepositoryError::Database("Mutex poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryTenantRepository {
    tenants: Arc<Mutex<HashMap<TenantId, Tenant>>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn insert(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.lock().map_err(|_| poisoned())?;
        if tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(RepositoryError::Conflict(format!(
                "slug '{}' already exists",
                tenant.slug
            )));
        }
        if tenants
            .values()
            .any(|t| t.api_key_digest == tenant.api_key_digest)
        {
            return Err(RepositoryError::Conflict("api key digest collision".into()));
        }
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.lock().map_err(|_| poisoned())?;
        match tenants.get_mut(&tenant.id) {
            Some(slot) => {
                *slot = tenant.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(tenant.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.lock().map_err(|_| poisoned())?;
        Ok(tenants.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.lock().map_err(|_| poisoned())?;
        Ok(tenants.values().find(|t| t.slug == slug).cloned())
    }

    async fn find_by_api_key_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.lock().map_err(|_| poisoned())?;
        // Constant-time comparison over every candidate digest.
        let needle = digest.as_bytes();
        let mut found = None;
        for tenant in tenants.values() {
            if bool::from(tenant.api_key_digest.as_bytes().ct_eq(needle)) {
                found = Some(tenant.clone());
            }
        }
        Ok(found)
    }

    async fn list_all(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let tenants = self.tenants.lock().map_err(|_| poisoned())?;
        let mut all: Vec<Tenant> = tenants.values().cloned().collect();
        all.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActionLogRepository {
    logs: Arc<Mutex<Vec<ActionLog>>>,
}

impl InMemoryActionLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &ActionLog, b: &ActionLog) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.0.cmp(&a.id.0))
}

fn matches_filter(log: &ActionLog, filter: &ActionLogFilter) -> bool {
    if let Some(action_type) = filter.action_type {
        if log.action_type != action_type {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if log.status != status {
            return false;
        }
    }
    if let Some(provider) = &filter.provider_name {
        if &log.provider_name != provider {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if log.created_at < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if log.created_at >= until {
            return false;
        }
    }
    true
}

#[async_trait]
impl ActionLogRepository for InMemoryActionLogRepository {
    async fn insert(&self, log: &ActionLog) -> Result<(), RepositoryError> {
        let mut logs = self.logs.lock().map_err(|_| poisoned())?;
        logs.push(log.clone());
        Ok(())
    }

    async fn update(&self, log: &ActionLog) -> Result<(), RepositoryError> {
        let mut logs = self.logs.lock().map_err(|_| poisoned())?;
        match logs
            .iter_mut()
            .find(|row| row.id == log.id && row.tenant_id == log.tenant_id)
        {
            Some(row) => {
                *row = log.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(log.id.to_string())),
        }
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ActionLogId,
    ) -> Result<Option<ActionLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        Ok(logs
            .iter()
            .find(|row| row.id == id && row.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ActionLogFilter,
        page: Page,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<ActionLog> = logs
            .iter()
            .filter(|row| row.tenant_id == tenant_id && matches_filter(row, filter))
            .cloned()
            .collect();
        matching.sort_by(newest_first);
        Ok(matching
            .into_iter()
            .skip(page.skip.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn find_failed_since(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<ActionLog> = logs
            .iter()
            .filter(|row| {
                row.tenant_id == tenant_id
                    && row.created_at >= since
                    && matches!(row.status, ActionStatus::Failure | ActionStatus::Timeout)
            })
            .cloned()
            .collect();
        matching.sort_by(newest_first);
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn find_window(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        cap: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<ActionLog> = logs
            .iter()
            .filter(|row| row.tenant_id == tenant_id && row.created_at >= since)
            .cloned()
            .collect();
        matching.sort_by(newest_first);
        matching.truncate(cap.max(0) as usize);
        Ok(matching)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditLogRepository {
    logs: Arc<Mutex<Vec<AuditLog>>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, log: &AuditLog) -> Result<(), RepositoryError> {
        let mut logs = self.logs.lock().map_err(|_| poisoned())?;
        logs.push(log.clone());
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AuditLogFilter,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<AuditLog> = logs
            .iter()
            .filter(|row| {
                row.tenant_id == tenant_id
                    && filter
                        .action
                        .as_ref()
                        .map(|a| &row.action == a)
                        .unwrap_or(true)
                    && filter
                        .resource_type
                        .as_ref()
                        .map(|rt| &row.resource_type == rt)
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.0.cmp(&a.id.0))
        });
        Ok(matching
            .into_iter()
            .skip(page.skip.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn find_by_resource(
        &self,
        tenant_id: TenantId,
        resource_type: &str,
        resource_id: &str,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError> {
        let logs = self.logs.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<AuditLog> = logs
            .iter()
            .filter(|row| {
                row.tenant_id == tenant_id
                    && row.resource_type == resource_type
                    && row.resource_id == resource_id
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(matching
            .into_iter()
            .skip(page.skip.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }
}
