// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::dispatch::{ActionDispatcher, DispatchRequest};
use crate::application::logs::LogQueryService;
use crate::application::tenants::TenantService;
use crate::domain::action::{ActionLog, ActionLogId, ActionStatus, ActionType};
use crate::domain::provider::ProviderSettings;
use crate::domain::repository::{ActionLogFilter, AuditLogFilter};
use crate::domain::tenant::{Tenant, TenantId};
use crate::infrastructure::db::Database;
use crate::infrastructure::providers::ProviderRegistry;
use crate::presentation::auth::{AdminGuard, AuthenticatedTenant, RequestMeta};
use crate::presentation::error::ApiError;

/// Storage readiness probe backing `/health/ready`.
pub enum ReadinessCheck {
    AlwaysReady,
    Postgres(Database),
}

impl ReadinessCheck {
    pub async fn check(&self) -> Result<(), String> {
        match self {
            ReadinessCheck::AlwaysReady => Ok(()),
            ReadinessCheck::Postgres(db) => db.ping().await.map_err(|e| e.to_string()),
        }
    }
}

pub struct AppState {
    pub tenants: Arc<TenantService>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub queries: Arc<LogQueryService>,
    pub registry: Arc<ProviderRegistry>,
    pub admin_token: Option<String>,
    pub readiness: ReadinessCheck,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/providers", get(provider_health))
        .route("/health/ready", get(readiness))
        .route("/api/v1/admin/tenants", post(create_tenant))
        .route(
            "/api/v1/admin/tenants/{id}/rotate-api-key",
            post(rotate_api_key),
        )
        .route("/api/v1/actions", post(dispatch_action))
        .route("/api/v1/logs/actions", get(list_actions))
        .route("/api/v1/logs/actions/failed/recent", get(recent_failures))
        .route("/api/v1/logs/actions/{id}", get(get_action))
        .route("/api/v1/logs/stats", get(action_stats))
        .route("/api/v1/logs/audits", get(list_audits))
        .route(
            "/api/v1/logs/audits/resource/{resource_type}/{resource_id}",
            get(audits_for_resource),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Outward tenant representation. Never includes key material.
#[derive(Serialize)]
pub struct TenantView {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub provider_configs: HashMap<String, ProviderSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Tenant> for TenantView {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            slug: tenant.slug.clone(),
            is_active: tenant.is_active,
            provider_configs: tenant.provider_configs.clone(),
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        }
    }
}

/// Listing view: outcome fields without the raw payloads. The detail
/// endpoint returns the full row including request/response bodies.
#[derive(Serialize)]
pub struct ActionLogSummary {
    pub id: ActionLogId,
    pub action_type: ActionType,
    pub provider_name: String,
    pub status: ActionStatus,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ActionLog> for ActionLogSummary {
    fn from(log: &ActionLog) -> Self {
        Self {
            id: log.id,
            action_type: log.action_type,
            provider_name: log.provider_name.clone(),
            status: log.status,
            error_message: log.error_message.clone(),
            attempts: log.attempts,
            execution_time_ms: log.execution_time_ms,
            created_at: log.created_at,
            updated_at: log.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Admin surface
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub provider_configs: HashMap<String, ProviderSettings>,
}

#[derive(Serialize)]
pub struct CreateTenantResponse {
    pub tenant: TenantView,
    /// One-time plaintext key; only the digest is stored.
    pub api_key: String,
}

async fn create_tenant(
    State(state): State<Arc<AppState>>,
    _guard: AdminGuard,
    RequestMeta(ctx): RequestMeta,
    body: Result<Json<CreateTenantRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::validation(e.body_text()))?;

    let (tenant, key) = state
        .tenants
        .create_tenant(request.name, request.slug, request.provider_configs, &ctx)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTenantResponse {
            tenant: TenantView::from(&tenant),
            api_key: key.expose().to_string(),
        }),
    ))
}

#[derive(Serialize)]
pub struct RotateKeyResponse {
    pub tenant_id: TenantId,
    /// One-time plaintext key; the previous key is already invalid.
    pub api_key: String,
}

async fn rotate_api_key(
    State(state): State<Arc<AppState>>,
    _guard: AdminGuard,
    RequestMeta(ctx): RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<RotateKeyResponse>, ApiError> {
    let tenant_id = TenantId::from_string(&id)
        .map_err(|_| ApiError::validation(format!("invalid tenant id '{id}'")))?;

    let (tenant, key) = state.tenants.rotate_api_key(tenant_id, &ctx).await?;

    Ok(Json(RotateKeyResponse {
        tenant_id: tenant.id,
        api_key: key.expose().to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DispatchBody {
    pub action_type: ActionType,
    pub provider_name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

async fn dispatch_action(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    body: Result<Json<DispatchBody>, JsonRejection>,
) -> Result<Json<ActionLog>, ApiError> {
    // An unknown action_type fails right here, before any log row exists.
    let Json(request) = body.map_err(|e| ApiError::validation(e.body_text()))?;

    let log = state
        .dispatcher
        .dispatch(
            &tenant,
            DispatchRequest {
                action_type: request.action_type,
                provider_name: request.provider_name,
                payload: request.payload,
            },
        )
        .await?;

    Ok(Json(log))
}

// ---------------------------------------------------------------------------
// Log queries
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ActionListQuery {
    pub action_type: Option<ActionType>,
    pub status: Option<ActionStatus>,
    pub provider_name: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_actions(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    query: Result<Query<ActionListQuery>, QueryRejection>,
) -> Result<Json<Vec<ActionLogSummary>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let filter = ActionLogFilter {
        action_type: query.action_type,
        status: query.status,
        provider_name: query.provider_name,
        since: None,
        until: None,
    };
    let logs = state
        .queries
        .list_actions(tenant.id, filter, query.skip, query.limit)
        .await?;

    Ok(Json(logs.iter().map(ActionLogSummary::from).collect()))
}

async fn get_action(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(id): Path<String>,
) -> Result<Json<ActionLog>, ApiError> {
    let log_id = ActionLogId::from_string(&id)
        .map_err(|_| ApiError::validation(format!("invalid action log id '{id}'")))?;

    let log = state.queries.get_action(tenant.id, log_id).await?;
    Ok(Json(log))
}

#[derive(Deserialize)]
pub struct RecentFailuresQuery {
    pub minutes: Option<i64>,
    pub limit: Option<i64>,
}

async fn recent_failures(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    query: Result<Query<RecentFailuresQuery>, QueryRejection>,
) -> Result<Json<Vec<ActionLogSummary>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let logs = state
        .queries
        .recent_failures(tenant.id, query.minutes, query.limit)
        .await?;

    Ok(Json(logs.iter().map(ActionLogSummary::from).collect()))
}

async fn action_stats(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.queries.action_stats(tenant.id).await?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
pub struct AuditListQuery {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_audits(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    query: Result<Query<AuditListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let filter = AuditLogFilter {
        action: query.action,
        resource_type: query.resource_type,
    };
    let logs = state
        .queries
        .list_audits(tenant.id, filter, query.skip, query.limit)
        .await?;

    Ok(Json(logs))
}

#[derive(Deserialize)]
pub struct ResourceAuditQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn audits_for_resource(
    State(state): State<Arc<AppState>>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path((resource_type, resource_id)): Path<(String, String)>,
    query: Result<Query<ResourceAuditQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;

    let logs = state
        .queries
        .audits_for_resource(
            tenant.id,
            &resource_type,
            &resource_id,
            query.skip,
            query.limit,
        )
        .await?;

    Ok(Json(logs))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "garrison-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn provider_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let providers = state.registry.health_check_all().await;
    let healthy = providers.values().all(|h| h.healthy);
    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "providers": providers,
    }))
}

async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.readiness.check().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ready"}))),
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "reason": reason})),
        ),
    }
}
