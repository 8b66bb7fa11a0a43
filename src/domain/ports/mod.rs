//! Ports: persistence repositories and external collaborator gateways.

pub mod budget_repository;
pub mod case_repository;
pub mod decision_repository;
pub mod notification;
pub mod procurement;
pub mod reasoning;
pub mod signal_repository;
pub mod step_repository;
pub mod verification_repository;

pub use budget_repository::BudgetRepository;
pub use case_repository::{CaseFilters, CaseRepository};
pub use decision_repository::DecisionRepository;
pub use notification::NotificationGateway;
pub use procurement::{ProcurementGateway, PurchasedPayload};
pub use reasoning::{
    ArgumentBrief, ArgumentRequest, ArgumentSide, CaseBrief, EvidenceItem, PriorJudgment,
    ReasoningGateway, StructuredVerdict, TribunalRequest, TribunalSynthesis, VerdictRequest,
};
pub use signal_repository::SignalRepository;
pub use step_repository::StepRepository;
pub use verification_repository::VerificationRepository;
