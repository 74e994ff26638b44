// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the action dispatcher: outcome recording,
//! timeout handling and the transient-error retry policy.

mod common;

use serde_json::json;
use std::sync::Arc;

use common::{
    contact_payload, dispatcher_with, fast_policy, registry_with, test_tenant, Script,
    ScriptedProvider,
};
use garrison_core::application::dispatch::DispatchRequest;
use garrison_core::domain::action::{ActionStatus, ActionType};
use garrison_core::domain::provider::{ProviderHealth, ProviderKind};
use garrison_core::domain::repository::{ActionLogFilter, ActionLogRepository, Page};
use garrison_core::infrastructure::providers::ProviderRegistry;

fn crm_request() -> DispatchRequest {
    DispatchRequest {
        action_type: ActionType::CrmCreateContact,
        provider_name: "hubspot".to_string(),
        payload: contact_payload(),
    }
}

#[tokio::test]
async fn healthy_provider_dispatch_succeeds() {
    let provider = Arc::new(ScriptedProvider::new(Script::Succeed(
        json!({"id": "c-1", "email": "jane@acme.test"}),
    )));
    let registry = registry_with(ProviderKind::Crm, "hubspot", provider.clone());
    let (dispatcher, logs) = dispatcher_with(registry, fast_policy(3));
    let tenant = test_tenant("acme");

    let log = dispatcher.dispatch(&tenant, crm_request()).await.unwrap();

    assert_eq!(log.status, ActionStatus::Success);
    assert_eq!(log.attempts, 1);
    assert!(log.execution_time_ms > 0);
    assert_eq!(log.response_data.as_ref().unwrap()["id"], "c-1");
    assert!(log.error_message.is_none());
    assert_eq!(provider.calls(), 1);

    // Exactly one row exists, and it is the terminal one.
    let rows = logs
        .list(tenant.id, &ActionLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, log.id);
    assert_eq!(rows[0].status, ActionStatus::Success);
}

#[tokio::test]
async fn unknown_provider_records_failure() {
    let registry = Arc::new(ProviderRegistry::empty());
    let (dispatcher, logs) = dispatcher_with(registry, fast_policy(3));
    let tenant = test_tenant("acme");

    let log = dispatcher.dispatch(&tenant, crm_request()).await.unwrap();

    assert_eq!(log.status, ActionStatus::Failure);
    assert!(log
        .error_message
        .as_ref()
        .unwrap()
        .contains("ProviderNotConfigured"));
    assert_eq!(log.attempts, 0);

    let rows = logs
        .list(tenant.id, &ActionLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn unhealthy_provider_records_failure() {
    let provider = Arc::new(ScriptedProvider::new(Script::Succeed(json!({}))));
    let registry = registry_with(ProviderKind::Crm, "hubspot", provider.clone());
    registry.set_health(
        "hubspot",
        ProviderHealth::unhealthy(chrono::Utc::now(), "connection refused".into()),
    );
    let (dispatcher, _logs) = dispatcher_with(registry, fast_policy(3));
    let tenant = test_tenant("acme");

    let log = dispatcher.dispatch(&tenant, crm_request()).await.unwrap();

    assert_eq!(log.status, ActionStatus::Failure);
    assert!(log
        .error_message
        .as_ref()
        .unwrap()
        .contains("ProviderUnavailable"));
    // The handler was never invoked.
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn handler_timeout_is_terminal() {
    let provider = Arc::new(ScriptedProvider::new(Script::Hang));
    let registry = registry_with(ProviderKind::Knowledge, "confluence", provider.clone());
    let (dispatcher, _logs) = dispatcher_with(registry, fast_policy(3));
    let tenant = test_tenant("acme");

    let log = dispatcher
        .dispatch(
            &tenant,
            DispatchRequest {
                action_type: ActionType::KnowledgeSearch,
                provider_name: "confluence".to_string(),
                payload: json!({"query": "vpn"}),
            },
        )
        .await
        .unwrap();

    assert_eq!(log.status, ActionStatus::Timeout);
    assert!(log.response_data.is_none());
    assert!(log.error_message.as_ref().unwrap().contains("exceeded"));
    // A timed-out attempt is never retried.
    assert_eq!(log.attempts, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn transient_errors_retry_then_succeed() {
    let provider = Arc::new(ScriptedProvider::new(Script::TransientThenSucceed {
        failures: 2,
        response: json!({"id": "c-9"}),
    }));
    let registry = registry_with(ProviderKind::Crm, "hubspot", provider.clone());
    let (dispatcher, logs) = dispatcher_with(registry, fast_policy(3));
    let tenant = test_tenant("acme");

    let log = dispatcher.dispatch(&tenant, crm_request()).await.unwrap();

    assert_eq!(log.status, ActionStatus::Success);
    assert_eq!(log.attempts, 3);
    assert_eq!(provider.calls(), 3);
    assert_eq!(log.response_data.as_ref().unwrap()["id"], "c-9");
    assert!(log.execution_time_ms > 0);

    // Still a single row despite the intermediate retry transitions.
    let rows = logs
        .list(tenant.id, &ActionLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, ActionStatus::Success);
}

#[tokio::test]
async fn exhausted_retry_budget_is_failure() {
    let provider = Arc::new(ScriptedProvider::new(Script::AlwaysTransient));
    let registry = registry_with(ProviderKind::Email, "postmark", provider.clone());
    let (dispatcher, _logs) = dispatcher_with(registry, fast_policy(2));
    let tenant = test_tenant("acme");

    let log = dispatcher
        .dispatch(
            &tenant,
            DispatchRequest {
                action_type: ActionType::EmailSend,
                provider_name: "postmark".to_string(),
                payload: json!({"to": "jane@acme.test"}),
            },
        )
        .await
        .unwrap();

    assert_eq!(log.status, ActionStatus::Failure);
    assert_eq!(log.attempts, 2);
    assert_eq!(provider.calls(), 2);
    assert!(log.error_message.as_ref().unwrap().contains("Rate limit"));
}

#[tokio::test]
async fn terminal_error_does_not_retry() {
    let provider = Arc::new(ScriptedProvider::new(Script::AlwaysTerminal(
        "payload is missing required field 'email'".into(),
    )));
    let registry = registry_with(ProviderKind::Crm, "hubspot", provider.clone());
    let (dispatcher, _logs) = dispatcher_with(registry, fast_policy(5));
    let tenant = test_tenant("acme");

    let log = dispatcher
        .dispatch(
            &tenant,
            DispatchRequest {
                action_type: ActionType::CrmCreateContact,
                provider_name: "hubspot".to_string(),
                payload: json!({}),
            },
        )
        .await
        .unwrap();

    // A malformed payload is a handler-level failure, not validation.
    assert_eq!(log.status, ActionStatus::Failure);
    assert_eq!(log.attempts, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn concurrent_dispatches_write_distinct_rows() {
    let provider = Arc::new(ScriptedProvider::new(Script::Succeed(json!({"ok": true}))));
    let registry = registry_with(ProviderKind::Crm, "hubspot", provider);
    let (dispatcher, logs) = dispatcher_with(registry, fast_policy(3));
    let dispatcher = Arc::new(dispatcher);
    let tenant = test_tenant("acme");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let dispatcher = dispatcher.clone();
        let tenant = tenant.clone();
        handles.push(tokio::spawn(async move {
            dispatcher.dispatch(&tenant, crm_request()).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let log = handle.await.unwrap();
        assert_eq!(log.status, ActionStatus::Success);
        ids.push(log.id);
    }
    ids.sort_by_key(|id| id.0);
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let rows = logs
        .list(tenant.id, &ActionLogFilter::default(), Page { skip: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
}
