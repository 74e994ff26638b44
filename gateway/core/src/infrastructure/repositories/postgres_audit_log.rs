// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL AuditLog Repository
//!
//! Production `AuditLogRepository` implementation backed by the
//! `audit_logs` table. Append-only: this module issues INSERT and SELECT
//! statements exclusively.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{QueryBuilder, Row};

use crate::domain::audit::{AuditLog, AuditLogId, ChangeSet};
use crate::domain::repository::{AuditLogFilter, AuditLogRepository, Page, RepositoryError};
use crate::domain::tenant::TenantId;

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, user_id, action, resource_type, resource_id, \
     changes, ip_address, user_agent, created_at";

fn row_to_log(row: &PgRow) -> Result<AuditLog, RepositoryError> {
    let changes_val: Option<serde_json::Value> = row.get("changes");
    let changes: Option<ChangeSet> = changes_val
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| RepositoryError::Serialization(format!("changes: {e}")))?;

    Ok(AuditLog {
        id: AuditLogId(row.get("id")),
        tenant_id: TenantId(row.get("tenant_id")),
        user_id: row.get("user_id"),
        action: row.get("action"),
        resource_type: row.get("resource_type"),
        resource_id: row.get("resource_id"),
        changes,
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, log: &AuditLog) -> Result<(), RepositoryError> {
        let changes = log
            .changes
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, tenant_id, user_id, action, resource_type, resource_id,
                changes, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log.id.0)
        .bind(log.tenant_id.0)
        .bind(&log.user_id)
        .bind(&log.action)
        .bind(&log.resource_type)
        .bind(&log.resource_id)
        .bind(changes)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AuditLogFilter,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM audit_logs WHERE tenant_id = "
        ));
        query.push_bind(tenant_id.0);

        if let Some(action) = &filter.action {
            query.push(" AND action = ");
            query.push_bind(action.clone());
        }
        if let Some(resource_type) = &filter.resource_type {
            query.push(" AND resource_type = ");
            query.push_bind(resource_type.clone());
        }

        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(page.limit);
        query.push(" OFFSET ");
        query.push_bind(page.skip);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.iter().map(row_to_log).collect()
    }

    async fn find_by_resource(
        &self,
        tenant_id: TenantId,
        resource_type: &str,
        resource_id: &str,
        page: Page,
    ) -> Result<Vec<AuditLog>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM audit_logs \
             WHERE tenant_id = $1 AND resource_type = $2 AND resource_id = $3 \
             ORDER BY created_at ASC, id ASC LIMIT $4 OFFSET $5"
        ))
        .bind(tenant_id.0)
        .bind(resource_type)
        .bind(resource_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.iter().map(row_to_log).collect()
    }
}
