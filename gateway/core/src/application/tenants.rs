// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::application::audit::AuditRecorder;
use crate::domain::audit::{ChangeSet, RequestContext};
use crate::domain::provider::ProviderSettings;
use crate::domain::repository::{RepositoryError, TenantRepository};
use crate::domain::tenant::{
    digest_api_key, validate_slug, ApiKey, AuthError, SlugError, Tenant, TenantId,
};

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("invalid slug: {0}")]
    InvalidSlug(#[from] SlugError),

    #[error("slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("tenant not found: {0}")]
    NotFound(TenantId),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TenantError {
    fn from(err: RepositoryError) -> Self {
        TenantError::Repository(err)
    }
}

/// Tenant lifecycle and authentication service.
///
/// Every state change this service performs is recorded through the
/// [`AuditRecorder`]; key rotation persists as a single row update so the
/// old key is rejected from the moment the write commits.
pub struct TenantService {
    repository: Arc<dyn TenantRepository>,
    audit: Arc<AuditRecorder>,
}

impl TenantService {
    pub fn new(repository: Arc<dyn TenantRepository>, audit: Arc<AuditRecorder>) -> Self {
        Self { repository, audit }
    }

    /// Create a tenant and hand back the plaintext API key exactly once.
    pub async fn create_tenant(
        &self,
        name: String,
        slug: String,
        provider_configs: HashMap<String, ProviderSettings>,
        ctx: &RequestContext,
    ) -> Result<(Tenant, ApiKey), TenantError> {
        validate_slug(&slug)?;

        let key = ApiKey::generate();
        let tenant = Tenant::new(name, slug.clone(), provider_configs, key.digest());

        match self.repository.insert(&tenant).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => return Err(TenantError::SlugTaken(slug)),
            Err(other) => return Err(other.into()),
        }

        info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant created");
        self.audit
            .record(
                tenant.id,
                "tenant.created",
                "tenant",
                &tenant.id.to_string(),
                Some(ChangeSet::new(
                    None,
                    Some(json!({"name": tenant.name, "slug": tenant.slug})),
                )),
                ctx,
            )
            .await;

        Ok((tenant, key))
    }

    /// Rotate the tenant's API key. The repository swap is atomic: there
    /// is no window where both the old and the new key resolve.
    pub async fn rotate_api_key(
        &self,
        id: TenantId,
        ctx: &RequestContext,
    ) -> Result<(Tenant, ApiKey), TenantError> {
        let mut tenant = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TenantError::NotFound(id))?;

        let key = ApiKey::generate();
        tenant.rotate_key(key.digest());
        self.repository.update(&tenant).await?;

        info!(tenant_id = %tenant.id, "API key rotated");
        // No key material in the audit record, only the fact of rotation.
        self.audit
            .record(
                tenant.id,
                "tenant.api_key_rotated",
                "tenant",
                &tenant.id.to_string(),
                None,
                ctx,
            )
            .await;

        Ok((tenant, key))
    }

    /// Resolve a presented API key to its tenant.
    ///
    /// Unknown keys and disabled tenants both fail; the outward response
    /// never distinguishes the two.
    pub async fn authenticate(&self, presented_key: &str) -> Result<Tenant, TenantError> {
        let digest = digest_api_key(presented_key);
        let tenant = self
            .repository
            .find_by_api_key_digest(&digest)
            .await?
            .ok_or(AuthError::InvalidKey)?;

        if !tenant.is_active {
            return Err(AuthError::TenantDisabled.into());
        }
        Ok(tenant)
    }

    /// Enable or disable a tenant. Takes effect on the next key lookup.
    pub async fn set_active(
        &self,
        id: TenantId,
        active: bool,
        ctx: &RequestContext,
    ) -> Result<Tenant, TenantError> {
        let mut tenant = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TenantError::NotFound(id))?;

        let before = tenant.is_active;
        tenant.set_active(active);
        self.repository.update(&tenant).await?;

        let action = if active {
            "tenant.activated"
        } else {
            "tenant.deactivated"
        };
        self.audit
            .record(
                tenant.id,
                action,
                "tenant",
                &tenant.id.to_string(),
                Some(ChangeSet::new(
                    Some(json!({"is_active": before})),
                    Some(json!({"is_active": active})),
                )),
                ctx,
            )
            .await;

        Ok(tenant)
    }

    /// Replace the tenant's per-provider configuration.
    pub async fn update_provider_configs(
        &self,
        id: TenantId,
        configs: HashMap<String, ProviderSettings>,
        ctx: &RequestContext,
    ) -> Result<Tenant, TenantError> {
        let mut tenant = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TenantError::NotFound(id))?;

        let before = serde_json::to_value(&tenant.provider_configs).ok();
        tenant.set_provider_configs(configs);
        self.repository.update(&tenant).await?;

        let after = serde_json::to_value(&tenant.provider_configs).ok();
        self.audit
            .record(
                tenant.id,
                "tenant.provider_configs_updated",
                "tenant",
                &tenant.id.to_string(),
                Some(ChangeSet::new(before, after)),
                ctx,
            )
            .await;

        Ok(tenant)
    }

    pub async fn get(&self, id: TenantId) -> Result<Tenant, TenantError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(TenantError::NotFound(id))
    }
}
