//! Casegate - Fraud Case Screening Orchestrator
//!
//! Casegate routes each financial transaction through a sequence of
//! decision stages, buying paid evidence signals only when their
//! expected value exceeds their cost, and recovers cases that crashed
//! mid-pipeline by replaying the persisted step log.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, errors, and ports
//! - **Adapters Layer** (`adapters`): SQLite persistence
//! - **Service Layer** (`services`): Stage agents, orchestrator, recovery
//! - **Infrastructure Layer** (`infrastructure`): Config and HTTP gateways
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use casegate::services::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Wire repositories and gateways, then submit cases.
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Budget, Case, CaseInput, CaseStatus, Config, Decision, PipelineStage, Signal, SignalType,
    StageStep, StepAction, Verdict, VerificationSession, VerificationStatus, VoiDecision,
    VoiEvaluation,
};
pub use domain::ports::{
    BudgetRepository, CaseRepository, DecisionRepository, NotificationGateway, ProcurementGateway,
    ReasoningGateway, SignalRepository, StepRepository, VerificationRepository,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    Orchestrator, PipelineDeps, RecoveryPlanner, StageDispatcher, SubmitOutcome,
    VerificationService,
};
