// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL ActionLog Repository
//!
//! Production `ActionLogRepository` implementation backed by the
//! `action_logs` table. The dispatcher's in-place status transitions map
//! to single-row `UPDATE` statements scoped by `(id, tenant_id)`, which
//! is what makes the "one row per dispatch" invariant hold under
//! concurrent dispatches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;

use crate::domain::action::{ActionLog, ActionLogId, ActionStatus, ActionType};
use crate::domain::repository::{
    ActionLogFilter, ActionLogRepository, Page, RepositoryError,
};
use crate::domain::tenant::TenantId;

pub struct PostgresActionLogRepository {
    pool: PgPool,
}

impl PostgresActionLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, action_type, provider_name, request_payload, \
     response_data, status, error_message, attempts, execution_time_ms, created_at, updated_at";

fn row_to_log(row: &PgRow) -> Result<ActionLog, RepositoryError> {
    let action_type_str: String = row.get("action_type");
    let status_str: String = row.get("status");
    let attempts: i32 = row.get("attempts");

    let action_type = ActionType::from_str(&action_type_str)
        .map_err(RepositoryError::Serialization)?;
    let status = ActionStatus::from_str(&status_str).map_err(RepositoryError::Serialization)?;

    Ok(ActionLog {
        id: ActionLogId(row.get("id")),
        tenant_id: TenantId(row.get("tenant_id")),
        action_type,
        provider_name: row.get("provider_name"),
        request_payload: row.get("request_payload"),
        response_data: row.get("response_data"),
        status,
        error_message: row.get("error_message"),
        attempts: attempts.max(0) as u32,
        execution_time_ms: row.get("execution_time_ms"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl ActionLogRepository for PostgresActionLogRepository {
    async fn insert(&self, log: &ActionLog) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO action_logs (
                id, tenant_id, action_type, provider_name, request_payload,
                response_data, status, error_message, attempts,
                execution_time_ms, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id.0)
        .bind(log.tenant_id.0)
        .bind(log.action_type.as_str())
        .bind(&log.provider_name)
        .bind(&log.request_payload)
        .bind(&log.response_data)
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.attempts as i32)
        .bind(log.execution_time_ms)
        .bind(log.created_at)
        .bind(log.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn update(&self, log: &ActionLog) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE action_logs SET
                response_data = $3,
                status = $4,
                error_message = $5,
                attempts = $6,
                execution_time_ms = $7,
                updated_at = $8
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(log.id.0)
        .bind(log.tenant_id.0)
        .bind(&log.response_data)
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.attempts as i32)
        .bind(log.execution_time_ms)
        .bind(log.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(log.id.to_string()));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: ActionLogId,
    ) -> Result<Option<ActionLog>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM action_logs WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(id.0)
        .bind(tenant_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.as_ref().map(row_to_log).transpose()
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &ActionLogFilter,
        page: Page,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM action_logs WHERE tenant_id = "
        ));
        query.push_bind(tenant_id.0);

        if let Some(action_type) = filter.action_type {
            query.push(" AND action_type = ");
            query.push_bind(action_type.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status.as_str());
        }
        if let Some(provider) = &filter.provider_name {
            query.push(" AND provider_name = ");
            query.push_bind(provider.clone());
        }
        if let Some(since) = filter.since {
            query.push(" AND created_at >= ");
            query.push_bind(since);
        }
        if let Some(until) = filter.until {
            query.push(" AND created_at < ");
            query.push_bind(until);
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

    async fn find_failed_since(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM action_logs \
             WHERE tenant_id = $1 AND created_at >= $2 AND status IN ('failure', 'timeout') \
             ORDER BY created_at DESC, id DESC LIMIT $3"
        ))
        .bind(tenant_id.0)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.iter().map(row_to_log).collect()
    }

    async fn find_window(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        cap: i64,
    ) -> Result<Vec<ActionLog>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM action_logs \
             WHERE tenant_id = $1 AND created_at >= $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3"
        ))
        .bind(tenant_id.0)
        .bind(since)
        .bind(cap)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.iter().map(row_to_log).collect()
    }
}
