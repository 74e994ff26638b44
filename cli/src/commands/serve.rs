// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway serving: wires repositories, provider registry and application
//! services, then runs the axum server until shutdown.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use garrison_core::application::audit::AuditRecorder;
use garrison_core::application::dispatch::{ActionDispatcher, DispatchPolicy};
use garrison_core::application::logs::{LogQueryService, QueryLimits};
use garrison_core::application::tenants::TenantService;
use garrison_core::domain::config::{
    resolve_secret, DatabaseBackend, GatewayConfigManifest,
};
use garrison_core::domain::repository::{
    ActionLogRepository, AuditLogRepository, TenantRepository,
};
use garrison_core::infrastructure::db::Database;
use garrison_core::infrastructure::providers::ProviderRegistry;
use garrison_core::infrastructure::repositories::{
    InMemoryActionLogRepository, InMemoryAuditLogRepository, InMemoryTenantRepository,
    PostgresActionLogRepository, PostgresAuditLogRepository, PostgresTenantRepository,
};
use garrison_core::presentation::api::{app, AppState, ReadinessCheck};

#[derive(Args, Default)]
pub struct ServeArgs {
    /// HTTP API host (overrides config)
    #[arg(long, env = "GARRISON_HOST")]
    pub host: Option<String>,

    /// HTTP API port (overrides config)
    #[arg(long, env = "GARRISON_PORT")]
    pub port: Option<u16>,
}

struct Repositories {
    tenants: Arc<dyn TenantRepository>,
    actions: Arc<dyn ActionLogRepository>,
    audits: Arc<dyn AuditLogRepository>,
    readiness: ReadinessCheck,
}

async fn build_repositories(
    manifest: &GatewayConfigManifest,
) -> Result<Repositories> {
    match manifest.spec.database.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory storage backend");
            Ok(Repositories {
                tenants: Arc::new(InMemoryTenantRepository::new()),
                actions: Arc::new(InMemoryActionLogRepository::new()),
                audits: Arc::new(InMemoryAuditLogRepository::new()),
                readiness: ReadinessCheck::AlwaysReady,
            })
        }
        DatabaseBackend::Postgres => {
            let url = resolve_secret(&manifest.spec.database.url)
                .context("Failed to resolve database.url")?;
            let database = Database::new(&url, manifest.spec.database.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            database
                .migrate()
                .await
                .context("Failed to apply schema migrations")?;
            info!("Using PostgreSQL storage backend");

            let pool = database.get_pool().clone();
            Ok(Repositories {
                tenants: Arc::new(PostgresTenantRepository::new(pool.clone())),
                actions: Arc::new(PostgresActionLogRepository::new(pool.clone())),
                audits: Arc::new(PostgresAuditLogRepository::new(pool)),
                readiness: ReadinessCheck::Postgres(database),
            })
        }
    }
}

pub async fn run(config_path: Option<&Path>, args: ServeArgs) -> Result<()> {
    let manifest =
        GatewayConfigManifest::discover(config_path).context("Failed to load configuration")?;
    manifest
        .validate()
        .context("Configuration validation failed")?;

    let config = manifest.spec.clone();

    if let Some(metrics_port) = config.server.metrics_port {
        let addr: std::net::SocketAddr = ([0, 0, 0, 0], metrics_port).into();
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics on {addr}");
    }

    let repositories = build_repositories(&manifest).await?;

    let registry = Arc::new(
        ProviderRegistry::from_config(&config).context("Failed to initialize providers")?,
    );
    if registry.is_empty() {
        warn!("No providers registered; dispatches will fail resolution");
    } else {
        let health = registry.health_check_all().await;
        let healthy = health.values().filter(|h| h.healthy).count();
        info!("Initial provider probe: {healthy}/{} healthy", health.len());
    }

    let audit = Arc::new(AuditRecorder::new(repositories.audits.clone()));
    let tenants = Arc::new(TenantService::new(repositories.tenants.clone(), audit));
    let dispatcher = Arc::new(ActionDispatcher::new(
        registry.clone(),
        repositories.actions.clone(),
        DispatchPolicy::from_config(&config.dispatch),
    ));
    let queries = Arc::new(LogQueryService::new(
        repositories.actions.clone(),
        repositories.audits.clone(),
        QueryLimits::from_config(&config.dispatch),
    ));

    let admin_token = match resolve_secret(&config.server.admin_token) {
        Ok(token) if !token.is_empty() => Some(token),
        Ok(_) => {
            warn!("No admin token configured; admin endpoints are disabled");
            None
        }
        Err(e) => return Err(e).context("Failed to resolve server.admin_token"),
    };

    let state = Arc::new(AppState {
        tenants,
        dispatcher,
        queries,
        registry: registry.clone(),
        admin_token,
        readiness: repositories.readiness,
    });

    // Background provider health refresh.
    let refresh_interval = config.dispatch.health_refresh_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            registry.health_check_all().await;
        }
    });

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    info!("GARRISON gateway listening on {host}:{port}");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
