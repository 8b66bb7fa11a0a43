//! CLI command handlers.

pub mod case;
pub mod init;
pub mod verify;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{
    all_embedded_migrations, create_pool, Migrator, PoolConfig, SqliteBudgetRepository,
    SqliteCaseRepository, SqliteDecisionRepository, SqliteSignalRepository, SqliteStepRepository,
    SqliteVerificationRepository,
};
use crate::domain::models::Config;
use crate::infrastructure::notification::HttpNotificationGateway;
use crate::infrastructure::procurement::HttpProcurementGateway;
use crate::infrastructure::reasoning::HttpReasoningGateway;
use crate::services::{Orchestrator, PipelineDeps, StageDispatcher};

/// Wire the full pipeline from configuration: pool, schema, sqlite
/// repositories, HTTP gateways, and the supervised dispatcher.
pub async fn bootstrap(config: &Config) -> Result<(Orchestrator, SqlitePool)> {
    let database_url = format!("sqlite://{}", config.database.path);
    let pool = create_pool(
        &database_url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::default()
        }),
    )
    .await
    .context("Failed to open database")?;

    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to run migrations")?;

    let deps = PipelineDeps {
        cases: Arc::new(SqliteCaseRepository::new(pool.clone())),
        budgets: Arc::new(SqliteBudgetRepository::new(pool.clone())),
        steps: Arc::new(SqliteStepRepository::new(pool.clone())),
        decisions: Arc::new(SqliteDecisionRepository::new(pool.clone())),
        signals: Arc::new(SqliteSignalRepository::new(pool.clone())),
        verifications: Arc::new(SqliteVerificationRepository::new(pool.clone())),
        reasoning: Arc::new(
            HttpReasoningGateway::new(&config.reasoning)
                .context("Failed to build reasoning gateway")?,
        ),
        procurement: Arc::new(
            HttpProcurementGateway::new(&config.procurement)
                .context("Failed to build procurement gateway")?,
        ),
        notification: Arc::new(
            HttpNotificationGateway::new(&config.notification)
                .context("Failed to build notification gateway")?,
        ),
    };

    let orchestrator = Orchestrator::new(
        deps,
        config.screening.clone(),
        &config.notification,
        Arc::new(StageDispatcher::new()),
    );

    Ok((orchestrator, pool))
}
