// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Read-side surface over ActionLogs and AuditLogs: filtered listings,
// detail lookup, recent-failure alerting and bounded-window aggregates.

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::action::{ActionLog, ActionLogId, ActionStatus};
use crate::domain::audit::AuditLog;
use crate::domain::config::DispatchConfig;
use crate::domain::repository::{
    ActionLogFilter, ActionLogRepository, AuditLogFilter, AuditLogRepository, Page,
    RepositoryError,
};
use crate::domain::tenant::TenantId;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Read-path bounds, sourced from the dispatch config section.
#[derive(Debug, Clone)]
pub struct QueryLimits {
    pub default_page_limit: i64,
    pub max_page_limit: i64,
    pub stats_window: Duration,
    pub stats_row_cap: i64,
}

impl QueryLimits {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
            stats_window: config.stats_window,
            stats_row_cap: config.stats_row_cap,
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

/// Aggregate view over the recent dispatch window.
#[derive(Debug, Clone, Serialize, Deserialize)]
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

pub struct LogQueryService {
    actions: Arc<dyn ActionLogRepository>,
    audits: Arc<dyn AuditLogRepository>,
    limits: QueryLimits,
}

impl LogQueryService {
    pub fn new(
        actions: Arc<dyn ActionLogRepository>,
        audits: Arc<dyn AuditLogRepository>,
        limits: QueryLimits,
    ) -> Self {
        Self {
            actions,
            audits,
            limits,
        }
    }

    /// Clamp raw pagination parameters into a valid page.
    pub fn page(&self, skip: Option<i64>, limit: Option<i64>) -> Page {
        Page::clamped(
            skip,
            limit,
            self.limits.default_page_limit,
            self.limits.max_page_limit,
        )
    }

    pub async fn list_actions(
        &self,
        tenant_id: TenantId,
        filter: ActionLogFilter,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<ActionLog>, QueryError> {
        let page = self.page(skip, limit);
        Ok(self.actions.list(tenant_id, &filter, page).await?)
    }

    pub async fn get_action(
        &self,
        tenant_id: TenantId,
        id: ActionLogId,
    ) -> Result<ActionLog, QueryError> {
        self.actions
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("action log {id}")))
    }

    /// Failed and timed-out actions within the last `minutes`, for
    /// operational alerting. The window is capped at 24 hours.
    pub async fn recent_failures(
        &self,
        tenant_id: TenantId,
        minutes: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<ActionLog>, QueryError> {
        let minutes = minutes.unwrap_or(30).clamp(1, 24 * 60);
        let limit = limit
            .unwrap_or(self.limits.default_page_limit)
            .clamp(1, self.limits.max_page_limit);
        let since = Utc::now() - ChronoDuration::minutes(minutes);
        Ok(self
            .actions
            .find_failed_since(tenant_id, since, limit)
            .await?)
    }

    /// Aggregate over the bounded recent window (never full history).
    pub async fn action_stats(&self, tenant_id: TenantId) -> Result<ActionStats, QueryError> {
        let window_minutes = (self.limits.stats_window.as_secs() / 60) as i64;
        let since = Utc::now() - ChronoDuration::minutes(window_minutes);
        let rows = self
            .actions
            .find_window(tenant_id, since, self.limits.stats_row_cap)
            .await?;

        let mut stats = ActionStats {
            window_minutes,
            total: rows.len() as u64,
            success_count: 0,
            failure_count: 0,
            timeout_count: 0,
            avg_execution_ms: 0.0,
            by_type: BTreeMap::new(),
            by_provider: BTreeMap::new(),
        };

        let mut total_ms: i64 = 0;
        for row in &rows {
            match row.status {
                ActionStatus::Success => stats.success_count += 1,
                ActionStatus::Failure => stats.failure_count += 1,
                ActionStatus::Timeout => stats.timeout_count += 1,
                ActionStatus::Pending | ActionStatus::Retry => {}
            }
            total_ms += row.execution_time_ms;
            *stats
                .by_type
                .entry(row.action_type.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_provider
                .entry(row.provider_name.clone())
                .or_insert(0) += 1;
        }
        if !rows.is_empty() {
            stats.avg_execution_ms = total_ms as f64 / rows.len() as f64;
        }

        Ok(stats)
    }

    pub async fn list_audits(
        &self,
        tenant_id: TenantId,
        filter: AuditLogFilter,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<AuditLog>, QueryError> {
        let page = self.page(skip, limit);
        Ok(self.audits.list(tenant_id, &filter, page).await?)
    }

    pub async fn audits_for_resource(
        &self,
        tenant_id: TenantId,
        resource_type: &str,
        resource_id: &str,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<AuditLog>, QueryError> {
        let page = self.page(skip, limit);
        Ok(self
            .audits
            .find_by_resource(tenant_id, resource_type, resource_id, page)
            .await?)
    }
}
