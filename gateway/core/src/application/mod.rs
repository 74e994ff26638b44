// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod tenants;
pub mod dispatch;
pub mod audit;
pub mod logs;

// Re-export services for convenience
pub use audit::AuditRecorder;
pub use dispatch::{ActionDispatcher, DispatchPolicy, DispatchRequest};
pub use logs::{ActionStats, LogQueryService, QueryError, QueryLimits};
pub use tenants::{TenantError, TenantService};
