// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in
//! the domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `TenantRepository` | `Tenant` | `InMemoryTenantRepository`, `PostgresTenantRepository` |
//! | `ActionLogRepository` | `ActionLog` | `InMemoryActionLogRepository`, `PostgresActionLogRepository` |
//! | `AuditLogRepository` | `AuditLog` | `InMemoryAuditLogRepository`, `PostgresAuditLogRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at gateway startup based on
//! configuration (`garrison.yaml`). In-memory implementations are used for
//! development and testing; PostgreSQL implementations for production.
//!
//! `AuditLogRepository` intentionally exposes no update or delete: the
//! audit trail is append-only. `ActionLogRepository::update` is the single
//! permitted post-creation mutation, covering the in-place status
//! transitions of one dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::action::{ActionLog, ActionLogId, ActionStatus, ActionType};
use crate::domain::audit::AuditLog;
use crate::domain::tenant::{Tenant, TenantId};

/// Pagination window with a clamped limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Build a page from raw query parameters, clamping the limit into
    /// `1..=max_limit` and the skip to non-negative.
    pub fn clamped(
        skip: Option<i64>,
        limit: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        let skip = skip.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
        Self { skip, limit }
    }
}

/// Filter predicate for ActionLog listings. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct ActionLogFilter {
    pub action_type: Option<ActionType>,
    pub status: Option<ActionStatus>,
    pub provider_name: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Filter predicate for AuditLog listings.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub resource_type: Option<String>,
}

/// Repository interface for Tenant aggregates
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Insert a new tenant. Slug and key-digest collisions yield
    /// `RepositoryError::Conflict`.
    async fn insert(&self, tenant: &Tenant) -> Result<(), RepositoryError>;

    /// Replace the stored row atomically (key rotation relies on this
    /// being a single-row swap).
    async fn update(&self, tenant: &Tenant) -> Result<(), RepositoryError>;

    /// Find tenant by ID
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError>;

    /// Find tenant by slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, RepositoryError>;

    /// Find tenant by API key digest
    async fn find_by_api_key_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Tenant>, RepositoryError>;

    /// List all tenants
    async fn list_all(&self) -> Result<Vec<Tenant>, RepositoryError>;
}

/// Repository interface for ActionLog aggregates
///
/// Every query is tenant-scoped; there is no cross-tenant read path.
#[async_trait]
pub trait ActionLogRepository: Send + Sync {
    /// Insert the initial row for a dispatch.
    async fn insert(&self, log: &ActionLog) -> Result<(), RepositoryError>;

    /// Update the same row in place (status transition, attempt counter,
    /// accumulated duration).
    async fn update(&self, log: &ActionLog) -> Result<(), RepositoryError>;

    /// Find one log within a tenant's scope.
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ActionLogId,
    ) -> Result<Option<ActionLog>, RepositoryError>;

    /// Filtered listing ordered by `created_at DESC, id DESC` so pages are
    /// stable and disjoint.
    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ActionLogFilter,
        page: Page,
    ) -> Result<Vec<ActionLog>, RepositoryError>;

    /// `failure`/`timeout` rows newer than `since`, newest first.
    async fn find_failed_since(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError>;

    /// Bounded recent window used by stats aggregation, newest first,
    /// capped at `cap` rows.
    async fn find_window(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        cap: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError>;
}

/// Repository interface for the append-only AuditLog trail
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one audit event. There is no update or delete.
    async fn append(&self, log: &AuditLog) -> Result<(), RepositoryError>;

    /// Filtered listing, newest first.
    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AuditLogFilter,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError>;

    /// Every event touching one resource, oldest first (a resource
    /// history reads top-down).
    async fn find_by_resource(
        &self,
        tenant_id: TenantId,
        resource_type: &str,
        resource_id: &str,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit_and_skip() {
        let page = Page::clamped(None, None, 50, 200);
        assert_eq!(page, Page { skip: 0, limit: 50 });

        let page = Page::clamped(Some(-5), Some(9999), 50, 200);
        assert_eq!(page, Page { skip: 0, limit: 200 });

        let page = Page::clamped(Some(100), Some(0), 50, 200);
        assert_eq!(page, Page { skip: 100, limit: 1 });
    }
}
