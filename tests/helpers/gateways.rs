//! Scripted gateway doubles for pipeline tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use casegate::domain::errors::{DomainError, DomainResult};
use casegate::domain::models::{PipelineStage, SignalType, Verdict, VerificationChannel};
use casegate::domain::ports::{
    ArgumentBrief, ArgumentRequest, NotificationGateway, ProcurementGateway, PurchasedPayload,
    ReasoningGateway, StructuredVerdict, TribunalRequest, TribunalSynthesis, VerdictRequest,
};

/// Reasoning double returning scripted verdicts.
pub struct ScriptedReasoning {
    pub verdict: Mutex<StructuredVerdict>,
    pub synthesis: Mutex<TribunalSynthesis>,
    pub verdict_calls: AtomicU32,
    pub argument_calls: AtomicU32,
    pub synthesis_calls: AtomicU32,
    pub fail_next_verdict: AtomicBool,
    pub last_verification_outcome: Mutex<Option<String>>,
    pub last_evidence_types: Mutex<Vec<SignalType>>,
}

impl Default for ScriptedReasoning {
    fn default() -> Self {
        Self {
            verdict: Mutex::new(StructuredVerdict {
                decision: Verdict::Approve,
                confidence: 0.95,
                reasoning: "no material risk identified".to_string(),
                risk_factors: vec![],
                mitigating_factors: vec!["established account".to_string()],
            }),
            synthesis: Mutex::new(TribunalSynthesis {
                decision: Verdict::Deny,
                confidence: 0.9,
                reasoning: "prosecution argument prevails".to_string(),
                defense_strength: 0.4,
                prosecution_strength: 0.8,
                deciding_factors: vec!["velocity anomaly".to_string()],
            }),
            verdict_calls: AtomicU32::new(0),
            argument_calls: AtomicU32::new(0),
            synthesis_calls: AtomicU32::new(0),
            fail_next_verdict: AtomicBool::new(false),
            last_verification_outcome: Mutex::new(None),
            last_evidence_types: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedReasoning {
    pub fn set_verdict(&self, decision: Verdict, confidence: f64) {
        let mut verdict = self.verdict.lock().unwrap();
        verdict.decision = decision;
        verdict.confidence = confidence;
    }
}

#[async_trait]
impl ReasoningGateway for ScriptedReasoning {
    async fn synthesize_verdict(&self, request: &VerdictRequest) -> DomainResult<StructuredVerdict> {
        if self.fail_next_verdict.swap(false, Ordering::SeqCst) {
            return Err(DomainError::ReasoningFailed {
                stage: PipelineStage::EvidencePurchase,
                reason: "scripted outage".to_string(),
            });
        }
        self.verdict_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_verification_outcome.lock().unwrap() = request.verification_outcome.clone();
        *self.last_evidence_types.lock().unwrap() =
            request.evidence.iter().map(|e| e.signal_type).collect();
        Ok(self.verdict.lock().unwrap().clone())
    }

    async fn argue_position(&self, request: &ArgumentRequest) -> DomainResult<ArgumentBrief> {
        self.argument_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ArgumentBrief {
            confidence: 0.7,
            reasoning: format!("{} brief", request.side.as_str()),
            key_points: vec![format!("{} point", request.side.as_str())],
            factors: vec![],
        })
    }

    async fn synthesize_tribunal(&self, _request: &TribunalRequest) -> DomainResult<TribunalSynthesis> {
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.synthesis.lock().unwrap().clone())
    }
}

/// Procurement double selling scripted payloads at catalog prices.
pub struct ScriptedProcurement {
    pub prices: HashMap<SignalType, f64>,
    pub fail: Mutex<HashSet<SignalType>>,
    pub calls: Mutex<Vec<SignalType>>,
}

impl Default for ScriptedProcurement {
    fn default() -> Self {
        let mut prices = HashMap::new();
        prices.insert(SignalType::Velocity, 0.10);
        prices.insert(SignalType::Network, 0.25);
        prices.insert(SignalType::DeviceFingerprint, 0.18);
        prices.insert(SignalType::AccountHistory, 0.15);
        Self {
            prices,
            fail: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedProcurement {
    pub fn fail_type(&self, signal_type: SignalType) {
        self.fail.lock().unwrap().insert(signal_type);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcurementGateway for ScriptedProcurement {
    async fn purchase(
        &self,
        signal_type: SignalType,
        case_id: &str,
        _subject_id: &str,
    ) -> DomainResult<PurchasedPayload> {
        self.calls.lock().unwrap().push(signal_type);

        if self.fail.lock().unwrap().contains(&signal_type) {
            return Err(DomainError::ProcurementFailed(format!(
                "vendor timeout for {}",
                signal_type.as_str()
            )));
        }

        Ok(PurchasedPayload {
            payload: serde_json::json!({
                "signal": signal_type.as_str(),
                "case": case_id,
            }),
            actual_cost: *self.prices.get(&signal_type).unwrap_or(&0.10),
        })
    }
}

/// Notification double capturing outbound messages.
pub struct ScriptedNotification {
    pub delivered: AtomicBool,
    pub fail: AtomicBool,
    pub messages: Mutex<Vec<(String, String)>>,
}

impl Default for ScriptedNotification {
    fn default() -> Self {
        Self {
            delivered: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationGateway for ScriptedNotification {
    async fn notify(
        &self,
        _channel: VerificationChannel,
        target: &str,
        message: &str,
    ) -> DomainResult<bool> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::NotificationFailed(
                "scripted channel outage".to_string(),
            ));
        }
        self.messages
            .lock()
            .unwrap()
            .push((target.to_string(), message.to_string()));
        Ok(self.delivered.load(Ordering::SeqCst))
    }
}

/// Pull the session token back out of the captured outreach message.
/// Messages end with `code <token>.`.
pub fn extract_token(message: &str) -> String {
    message
        .rsplit("code ")
        .next()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_string()
}
