// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Tenant Repository
//!
//! Production `TenantRepository` implementation backed by the `tenants`
//! table via `sqlx`. Translates between the `Tenant` domain aggregate and
//! the relational schema; per-tenant provider configs round-trip through
//! a `jsonb` column.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;

use crate::domain::provider::ProviderSettings;
use crate::domain::repository::{RepositoryError, TenantRepository};
use crate::domain::tenant::{Tenant, TenantId};

pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_tenant(row: &PgRow) -> Result<Tenant, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let configs_val: serde_json::Value = row.get("provider_configs");
    let provider_configs: HashMap<String, ProviderSettings> =
        serde_json::from_value(configs_val)
            .map_err(|e| RepositoryError::Serialization(format!("provider_configs: {e}")))?;

    Ok(Tenant {
        id: TenantId(id),
        name: row.get("name"),
        slug: row.get("slug"),
        api_key_digest: row.get("api_key_digest"),
        provider_configs,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn insert(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let configs = serde_json::to_value(&tenant.provider_configs)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, slug, api_key_digest, provider_configs,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tenant.id.0)
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.api_key_digest)
        .bind(configs)
        .bind(tenant.is_active)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        let configs = serde_json::to_value(&tenant.provider_configs)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                name = $2,
                slug = $3,
                api_key_digest = $4,
                provider_configs = $5,
                is_active = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.0)
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.api_key_digest)
        .bind(configs)
        .bind(tenant.is_active)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(tenant.id.to_string()));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, api_key_digest, provider_configs,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, api_key_digest, provider_configs,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn find_by_api_key_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, api_key_digest, provider_configs,
                   is_active, created_at, updated_at
            FROM tenants
            WHERE api_key_digest = $1
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.as_ref().map(row_to_tenant).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, slug, api_key_digest, provider_configs,
                   is_active, created_at, updated_at
            FROM tenants
            ORDER BY slug ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.iter().map(row_to_tenant).collect()
    }
}
