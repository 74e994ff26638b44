// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for tenant lifecycle: creation, key rotation
//! atomicity, deactivation and the audit trail they leave behind.

mod common;

use std::collections::HashMap;

use common::tenant_service;
use garrison_core::application::tenants::TenantError;
use garrison_core::domain::audit::RequestContext;
use garrison_core::domain::repository::{
    AuditLogFilter, AuditLogRepository, Page, TenantRepository,
};
use garrison_core::domain::tenant::AuthError;

fn ctx() -> RequestContext {
    RequestContext {
        user_id: Some("ops@garrison.test".to_string()),
        ip_address: Some("10.0.0.7".to_string()),
        user_agent: Some("garrison-cli/0.4".to_string()),
    }
}

#[tokio::test]
async fn created_tenant_authenticates_with_its_key() {
    let (service, _, _) = tenant_service();

    let (tenant, key) = service
        .create_tenant("Acme Corp".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();

    assert!(tenant.is_active);
    assert!(key.expose().starts_with("grsn_"));

    let resolved = service.authenticate(key.expose()).await.unwrap();
    assert_eq!(resolved.id, tenant.id);
    assert_eq!(resolved.slug, "acme");
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let (service, _, _) = tenant_service();

    service
        .create_tenant("Acme".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();
    let err = service
        .create_tenant("Acme Again".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, TenantError::SlugTaken(slug) if slug == "acme"));
}

#[tokio::test]
async fn malformed_slug_is_rejected_before_any_write() {
    let (service, tenants, _) = tenant_service();

    let err = service
        .create_tenant("Acme".into(), "Acme Corp!".into(), HashMap::new(), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, TenantError::InvalidSlug(_)));
    assert!(tenants.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn rotation_invalidates_old_key_immediately() {
    let (service, _, _) = tenant_service();

    let (tenant, old_key) = service
        .create_tenant("Acme".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();
    let (_, new_key) = service.rotate_api_key(tenant.id, &ctx()).await.unwrap();

    assert_ne!(old_key.expose(), new_key.expose());

    // Every subsequent resolution of the old key fails.
    for _ in 0..3 {
        let err = service.authenticate(old_key.expose()).await.unwrap_err();
        assert!(matches!(err, TenantError::Auth(AuthError::InvalidKey)));
    }

    // The new key resolves to the same tenant.
    let resolved = service.authenticate(new_key.expose()).await.unwrap();
    assert_eq!(resolved.id, tenant.id);
}

#[tokio::test]
async fn rotating_unknown_tenant_is_not_found() {
    let (service, _, _) = tenant_service();
    let err = service
        .rotate_api_key(garrison_core::domain::tenant::TenantId::new(), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, TenantError::NotFound(_)));
}

#[tokio::test]
async fn deactivation_takes_effect_on_next_lookup() {
    let (service, _, _) = tenant_service();

    let (tenant, key) = service
        .create_tenant("Acme".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();
    service.authenticate(key.expose()).await.unwrap();

    service.set_active(tenant.id, false, &ctx()).await.unwrap();
    let err = service.authenticate(key.expose()).await.unwrap_err();
    assert!(matches!(err, TenantError::Auth(AuthError::TenantDisabled)));

    service.set_active(tenant.id, true, &ctx()).await.unwrap();
    service.authenticate(key.expose()).await.unwrap();
}

#[tokio::test]
async fn state_changes_leave_an_ordered_audit_trail() {
    let (service, _, audits) = tenant_service();

    let (tenant, _) = service
        .create_tenant("Acme".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();
    service.rotate_api_key(tenant.id, &ctx()).await.unwrap();
    service.set_active(tenant.id, false, &ctx()).await.unwrap();

    let trail = audits
        .find_by_resource(
            tenant.id,
            "tenant",
            &tenant.id.to_string(),
            Page { skip: 0, limit: 50 },
        )
        .await
        .unwrap();

    let actions: Vec<&str> = trail.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "tenant.created",
            "tenant.api_key_rotated",
            "tenant.deactivated"
        ]
    );

    // Audit rows carry the request context and are tenant-scoped.
    for row in &trail {
        assert_eq!(row.tenant_id, tenant.id);
        assert_eq!(row.user_id.as_deref(), Some("ops@garrison.test"));
        assert_eq!(row.ip_address.as_deref(), Some("10.0.0.7"));
    }

    // Rotation must not leak key material into the trail.
    let rotation = &trail[1];
    assert!(rotation.changes.is_none());
}

#[tokio::test]
async fn audit_rows_are_never_mutated() {
    let (service, _, audits) = tenant_service();

    let (tenant, _) = service
        .create_tenant("Acme".into(), "acme".into(), HashMap::new(), &ctx())
        .await
        .unwrap();

    let first_read = audits
        .list(tenant.id, &AuditLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    let created_at = first_read[0].created_at;

    // Pile on more state changes, then observe the original row again.
    service.rotate_api_key(tenant.id, &ctx()).await.unwrap();
    service.set_active(tenant.id, false, &ctx()).await.unwrap();

    let second_read = audits
        .list(tenant.id, &AuditLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    let original = second_read
        .iter()
        .find(|row| row.id == first_read[0].id)
        .unwrap();
    assert_eq!(original.created_at, created_at);
    assert_eq!(original.action, first_read[0].action);
}
