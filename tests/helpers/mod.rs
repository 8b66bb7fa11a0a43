#![allow(dead_code)]

pub mod database;
pub mod gateways;

use std::sync::Arc;

use casegate::adapters::sqlite::{
    SqliteBudgetRepository, SqliteCaseRepository, SqliteDecisionRepository,
    SqliteSignalRepository, SqliteStepRepository, SqliteVerificationRepository,
};
use casegate::domain::models::{NotificationConfig, ScreeningConfig};
use casegate::services::{Orchestrator, PipelineDeps, StageDispatcher};
use sqlx::SqlitePool;

use self::gateways::{ScriptedNotification, ScriptedProcurement, ScriptedReasoning};

/// Everything a pipeline test needs to drive and observe the system.
pub struct TestPipeline {
    pub orchestrator: Orchestrator,
    pub reasoning: Arc<ScriptedReasoning>,
    pub procurement: Arc<ScriptedProcurement>,
    pub notification: Arc<ScriptedNotification>,
    pub pool: SqlitePool,
}

impl TestPipeline {
    pub fn cases(&self) -> SqliteCaseRepository {
        SqliteCaseRepository::new(self.pool.clone())
    }

    pub fn budgets(&self) -> SqliteBudgetRepository {
        SqliteBudgetRepository::new(self.pool.clone())
    }

    pub fn steps(&self) -> SqliteStepRepository {
        SqliteStepRepository::new(self.pool.clone())
    }

    pub fn decisions(&self) -> SqliteDecisionRepository {
        SqliteDecisionRepository::new(self.pool.clone())
    }

    pub fn verifications(&self) -> SqliteVerificationRepository {
        SqliteVerificationRepository::new(self.pool.clone())
    }

    /// Wait for all in-flight stages to settle.
    pub async fn drain(&self) {
        self.orchestrator.dispatcher().drain().await;
    }
}

/// Wire an orchestrator over an in-memory database and scripted
/// gateways.
pub async fn build_pipeline(screening: ScreeningConfig) -> TestPipeline {
    let pool = database::setup_test_db().await;

    let reasoning = Arc::new(ScriptedReasoning::default());
    let procurement = Arc::new(ScriptedProcurement::default());
    let notification = Arc::new(ScriptedNotification::default());

    let deps = PipelineDeps {
        cases: Arc::new(SqliteCaseRepository::new(pool.clone())),
        budgets: Arc::new(SqliteBudgetRepository::new(pool.clone())),
        steps: Arc::new(SqliteStepRepository::new(pool.clone())),
        decisions: Arc::new(SqliteDecisionRepository::new(pool.clone())),
        signals: Arc::new(SqliteSignalRepository::new(pool.clone())),
        verifications: Arc::new(SqliteVerificationRepository::new(pool.clone())),
        reasoning: Arc::<ScriptedReasoning>::clone(&reasoning),
        procurement: Arc::<ScriptedProcurement>::clone(&procurement),
        notification: Arc::<ScriptedNotification>::clone(&notification),
    };

    let orchestrator = Orchestrator::new(
        deps,
        screening,
        &NotificationConfig::default(),
        Arc::new(StageDispatcher::new()),
    );

    TestPipeline {
        orchestrator,
        reasoning,
        procurement,
        notification,
        pool,
    }
}

/// A screening config whose tribunal never convenes, for tests that
/// focus on the straight pipeline.
pub fn screening_without_tribunal() -> ScreeningConfig {
    ScreeningConfig {
        tribunal_min_amount: f64::MAX,
        ..ScreeningConfig::default()
    }
}
