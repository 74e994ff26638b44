// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared test harness: scripted provider handlers and service builders
//! over the in-memory repositories.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use garrison_core::application::audit::AuditRecorder;
use garrison_core::application::dispatch::{ActionDispatcher, DispatchPolicy};
use garrison_core::application::tenants::TenantService;
use garrison_core::domain::action::ActionType;
use garrison_core::domain::provider::{ProviderError, ProviderHandler, ProviderKind};
use garrison_core::domain::tenant::{ApiKey, Tenant};
use garrison_core::infrastructure::providers::ProviderRegistry;
use garrison_core::infrastructure::repositories::{
    InMemoryActionLogRepository, InMemoryAuditLogRepository, InMemoryTenantRepository,
};

/// Behavior script for a stub provider handler.
#[allow(dead_code)]
pub enum Script {
    /// Succeed after a short delay so execution time is observable.
    Succeed(Value),
    /// Fail transiently (HTTP 503) for the first `failures` calls, then
    /// succeed with `response`.
    TransientThenSucceed { failures: u32, response: Value },
    /// Every call is a transient rate-limit error.
    AlwaysTransient,
    /// Every call is a terminal rejection.
    AlwaysTerminal(String),
    /// Never return within any reasonable dispatch timeout.
    Hang,
}

pub struct ScriptedProvider {
    script: Script,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderHandler for ScriptedProvider {
    async fn execute(
        &self,
        _action: &ActionType,
        _payload: &Value,
    ) -> Result<Value, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.script {
            Script::Succeed(response) => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(response.clone())
            }
            Script::TransientThenSucceed { failures, response } => {
                if call <= *failures {
                    Err(ProviderError::Upstream {
                        status: 503,
                        message: "upstream briefly unavailable".into(),
                    })
                } else {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(response.clone())
                }
            }
            Script::AlwaysTransient => Err(ProviderError::RateLimit),
            Script::AlwaysTerminal(message) => Err(ProviderError::Rejected(message.clone())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(Value::Null)
            }
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// A dispatch policy tuned for fast tests: tight timeout, 1ms backoff.
#[allow(dead_code)]
pub fn fast_policy(max_attempts: u32) -> DispatchPolicy {
    DispatchPolicy {
        action_timeout: Duration::from_millis(200),
        max_attempts,
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(8),
    }
}

/// Registry holding one scripted provider under `(kind, name)`.
#[allow(dead_code)]
pub fn registry_with(
    kind: ProviderKind,
    name: &str,
    provider: Arc<ScriptedProvider>,
) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::empty().with_handler(kind, name, provider))
}

/// A tenant persisted nowhere; dispatch tests only need the identity.
#[allow(dead_code)]
pub fn test_tenant(slug: &str) -> Tenant {
    Tenant::new(
        slug.to_uppercase(),
        slug.to_string(),
        HashMap::new(),
        ApiKey::generate().digest(),
    )
}

/// Dispatcher over a fresh in-memory log repository.
#[allow(dead_code)]
pub fn dispatcher_with(
    registry: Arc<ProviderRegistry>,
    policy: DispatchPolicy,
) -> (ActionDispatcher, Arc<InMemoryActionLogRepository>) {
    let logs = Arc::new(InMemoryActionLogRepository::new());
    let dispatcher = ActionDispatcher::new(registry, logs.clone(), policy);
    (dispatcher, logs)
}

/// Tenant service over fresh in-memory tenant and audit repositories.
#[allow(dead_code)]
pub fn tenant_service() -> (
    Arc<TenantService>,
    Arc<InMemoryTenantRepository>,
    Arc<InMemoryAuditLogRepository>,
) {
    let tenants = Arc::new(InMemoryTenantRepository::new());
    let audits = Arc::new(InMemoryAuditLogRepository::new());
    let recorder = Arc::new(AuditRecorder::new(audits.clone()));
    let service = Arc::new(TenantService::new(tenants.clone(), recorder));
    (service, tenants, audits)
}

#[allow(dead_code)]
pub fn contact_payload() -> Value {
    json!({"email": "jane@acme.test", "first_name": "Jane"})
}
