// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod memory;
pub mod postgres_tenant;
pub mod postgres_action_log;
pub mod postgres_audit_log;

pub use memory::{
    InMemoryActionLogRepository, InMemoryAuditLogRepository, InMemoryTenantRepository,
};
pub use postgres_action_log::PostgresActionLogRepository;
pub use postgres_audit_log::PostgresAuditLogRepository;
pub use postgres_tenant::PostgresTenantRepository;
