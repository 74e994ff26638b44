// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Action Dispatcher
//!
//! The write path of the gateway: resolves the provider capability,
//! creates the ActionLog row, invokes the handler under a bounded timeout
//! and drives the retry policy for transient provider errors.
//!
//! Once validation has passed, every outcome is captured into the log row
//! rather than raised to the caller: the caller always receives a
//! well-formed [`ActionLog`] reflecting what happened. Only storage
//! failures (the log row itself cannot be written) escape as errors.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::action::{ActionLog, ActionType};
use crate::domain::config::DispatchConfig;
use crate::domain::repository::{ActionLogRepository, RepositoryError};
use crate::domain::tenant::Tenant;
use crate::infrastructure::providers::ProviderRegistry;

/// Timeout and retry budget for one dispatch call.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub action_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl DispatchPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            action_timeout: config.action_timeout,
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: config.retry_base_delay,
            retry_max_delay: config.retry_max_delay,
        }
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

/// A validated dispatch request. `action_type` membership in the closed
/// catalogue is already guaranteed by the type.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub action_type: ActionType,
    pub provider_name: String,
    pub payload: serde_json::Value,
}

pub struct ActionDispatcher {
    registry: Arc<ProviderRegistry>,
    logs: Arc<dyn ActionLogRepository>,
    policy: DispatchPolicy,
}

impl ActionDispatcher {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        logs: Arc<dyn ActionLogRepository>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            registry,
            logs,
            policy,
        }
    }

    /// Dispatch one action on behalf of an authenticated tenant.
    ///
    /// Exactly one ActionLog row exists afterwards; intermediate retry
    /// transitions update that same row. Dispatch runs to completion even
    /// if the caller goes away; the row is the record of record.
    pub async fn dispatch(
        &self,
        tenant: &Tenant,
        request: DispatchRequest,
    ) -> Result<ActionLog, RepositoryError> {
        let kind = request.action_type.kind();

        let handler = match self.registry.resolve(kind, &request.provider_name) {
            Ok(handler) => handler,
            Err(err) => {
                // Resolution failed: the log row still exists so callers
                // can always audit what happened.
                let mut log = ActionLog::new(
                    tenant.id,
                    request.action_type,
                    request.provider_name,
                    request.payload,
                );
                log.fail(err.to_string());
                self.logs.insert(&log).await?;
                record_outcome(&log);
                return Ok(log);
            }
        };

        let mut log = ActionLog::new(
            tenant.id,
            request.action_type,
            request.provider_name,
            request.payload,
        );
        self.logs.insert(&log).await?;

        loop {
            let attempt_started = Instant::now();
            let outcome = tokio::time::timeout(
                self.policy.action_timeout,
                handler.execute(&log.action_type, &log.request_payload),
            )
            .await;
            log.record_attempt(attempt_started.elapsed().as_millis() as i64);

            match outcome {
                Ok(Ok(response)) => {
                    debug!(
                        action_log_id = %log.id,
                        attempts = log.attempts,
                        "dispatch succeeded"
                    );
                    log.complete(response);
                    break;
                }
                Err(_) => {
                    // A timed-out attempt is terminal; it never re-enters
                    // the retry loop and stores no response payload.
                    log.time_out(format!(
                        "provider call exceeded {}ms",
                        self.policy.action_timeout.as_millis()
                    ));
                    break;
                }
                Ok(Err(err)) if err.is_transient() && log.attempts < self.policy.max_attempts => {
                    warn!(
                        action_log_id = %log.id,
                        attempt = log.attempts,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "transient provider error, retrying"
                    );
                    log.mark_retry(err.to_string());
                    // Persist the intermediate state before sleeping so a
                    // concurrent reader observes the retry.
                    self.logs.update(&log).await?;
                    tokio::time::sleep(self.backoff_delay(log.attempts)).await;
                }
                Ok(Err(err)) => {
                    log.fail(err.to_string());
                    break;
                }
            }
        }

        self.logs.update(&log).await?;
        record_outcome(&log);
        Ok(log)
    }

    /// Exponential backoff after the n-th attempt, capped by the policy.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.policy
            .retry_base_delay
            .saturating_mul(factor)
            .min(self.policy.retry_max_delay)
    }
}

fn record_outcome(log: &ActionLog) {
    metrics::counter!("gateway_dispatch_total", "status" => log.status.as_str()).increment(1);
    metrics::histogram!("gateway_dispatch_duration_ms").record(log.execution_time_ms as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let dispatcher_policy = DispatchPolicy {
            action_timeout: Duration::from_secs(1),
            max_attempts: 5,
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_millis(350),
        };
        let dispatcher = ActionDispatcher {
            registry: Arc::new(ProviderRegistry::empty()),
            logs: Arc::new(
                crate::infrastructure::repositories::InMemoryActionLogRepository::new(),
            ),
            policy: dispatcher_policy,
        };
        assert_eq!(dispatcher.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(dispatcher.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(dispatcher.backoff_delay(3), Duration::from_millis(350));
        assert_eq!(dispatcher.backoff_delay(4), Duration::from_millis(350));
    }
}
