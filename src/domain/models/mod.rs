//! Domain models for the casegate screening system.

pub mod budget;
pub mod case;
pub mod config;
pub mod decision;
pub mod signal;
pub mod step;
pub mod verification;

pub use budget::{Budget, VoiDecision, VoiEvaluation};
pub use case::{Case, CaseInput, CaseStatus, PipelineStage, Verdict};
pub use config::{
    Band, Config, DatabaseConfig, LoggingConfig, NotificationConfig, ProcurementConfig,
    ReasoningConfig, RetryConfig, ScreeningConfig, SignalCatalogEntry,
};
pub use decision::Decision;
pub use signal::{Signal, SignalType};
pub use step::{StageStep, StepAction};
pub use verification::{
    hash_token, VerificationChannel, VerificationSession, VerificationStatus,
};
