//! Configuration structures.

use serde::{Deserialize, Serialize};

use super::signal::SignalType;

/// Main configuration structure for Casegate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reasoning gateway configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Signal procurement gateway configuration
    #[serde(default)]
    pub procurement: ProcurementConfig,

    /// Notification gateway configuration
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Screening policy configuration
    #[serde(default)]
    pub screening: ScreeningConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            reasoning: ReasoningConfig::default(),
            procurement: ProcurementConfig::default(),
            notification: NotificationConfig::default(),
            screening: ScreeningConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".casegate/casegate.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Retry policy configuration shared by HTTP gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Reasoning gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReasoningConfig {
    /// Base URL of the reasoning service
    #[serde(default = "default_reasoning_url")]
    pub base_url: String,

    /// API key, if the service requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    /// Sustained requests per second
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: f64,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_reasoning_url() -> String {
    "http://localhost:8010".to_string()
}

const fn default_gateway_timeout_secs() -> u64 {
    30
}

const fn default_rate_limit_rps() -> f64 {
    10.0
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_url(),
            api_key: None,
            timeout_secs: default_gateway_timeout_secs(),
            rate_limit_rps: default_rate_limit_rps(),
            retry: RetryConfig::default(),
        }
    }
}

/// Signal procurement gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcurementConfig {
    /// Base URL of the signal vendor
    #[serde(default = "default_procurement_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_procurement_url() -> String {
    "http://localhost:8020".to_string()
}

impl Default for ProcurementConfig {
    fn default() -> Self {
        Self {
            base_url: default_procurement_url(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

/// Notification gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Base URL of the notification service
    #[serde(default = "default_notification_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    /// Default channel for verification outreach: sms, email, push
    #[serde(default = "default_notification_channel")]
    pub default_channel: String,
}

fn default_notification_url() -> String {
    "http://localhost:8030".to_string()
}

fn default_notification_channel() -> String {
    "sms".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            base_url: default_notification_url(),
            timeout_secs: default_gateway_timeout_secs(),
            default_channel: default_notification_channel(),
        }
    }
}

/// An inclusive band over a [0, 1] quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    /// Whether `value` falls inside the band (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// One purchasable signal type with its price and heuristic
/// confidence-gain constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignalCatalogEntry {
    /// Evidence type
    pub signal_type: SignalType,
    /// Quoted price per purchase
    pub price: f64,
    /// Fixed confidence-gain heuristic in [0, 1]
    pub confidence_gain: f64,
}

/// Screening policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScreeningConfig {
    /// Risk threshold below which the policy gate fast-paths approval
    #[serde(default = "default_approve_threshold")]
    pub approve_threshold: f64,

    /// Fixed per-case spend ceiling
    #[serde(default = "default_budget_ceiling")]
    pub budget_ceiling: f64,

    /// Verdict confidence band that triggers customer verification
    #[serde(default = "default_medium_confidence")]
    pub medium_confidence: Band,

    /// Risk score band that triggers customer verification
    #[serde(default = "default_medium_risk")]
    pub medium_risk: Band,

    /// Minimum amount for the adversarial tribunal to convene
    #[serde(default = "default_tribunal_min_amount")]
    pub tribunal_min_amount: f64,

    /// Verification session lifetime in minutes
    #[serde(default = "default_verification_expiry_minutes")]
    pub verification_expiry_minutes: i64,

    /// Purchased evidence lifetime in minutes
    #[serde(default = "default_signal_ttl_minutes")]
    pub signal_ttl_minutes: i64,

    /// Purchasable evidence catalog
    #[serde(default = "default_signal_catalog")]
    pub signals: Vec<SignalCatalogEntry>,
}

const fn default_approve_threshold() -> f64 {
    0.3
}

const fn default_budget_ceiling() -> f64 {
    25.0
}

const fn default_medium_confidence() -> Band {
    Band { low: 0.55, high: 0.80 }
}

const fn default_medium_risk() -> Band {
    Band { low: 0.4, high: 0.7 }
}

const fn default_tribunal_min_amount() -> f64 {
    1_000.0
}

const fn default_verification_expiry_minutes() -> i64 {
    30
}

const fn default_signal_ttl_minutes() -> i64 {
    60
}

fn default_signal_catalog() -> Vec<SignalCatalogEntry> {
    vec![
        SignalCatalogEntry {
            signal_type: SignalType::Velocity,
            price: 0.10,
            confidence_gain: 0.20,
        },
        SignalCatalogEntry {
            signal_type: SignalType::Network,
            price: 0.25,
            confidence_gain: 0.15,
        },
        SignalCatalogEntry {
            signal_type: SignalType::DeviceFingerprint,
            price: 0.18,
            confidence_gain: 0.12,
        },
        SignalCatalogEntry {
            signal_type: SignalType::AccountHistory,
            price: 0.15,
            confidence_gain: 0.10,
        },
    ]
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            approve_threshold: default_approve_threshold(),
            budget_ceiling: default_budget_ceiling(),
            medium_confidence: default_medium_confidence(),
            medium_risk: default_medium_risk(),
            tribunal_min_amount: default_tribunal_min_amount(),
            verification_expiry_minutes: default_verification_expiry_minutes(),
            signal_ttl_minutes: default_signal_ttl_minutes(),
            signals: default_signal_catalog(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.screening.approve_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.screening.signals.len(), 4);
        assert_eq!(config.database.path, ".casegate/casegate.db");
    }

    #[test]
    fn test_band_contains_is_inclusive() {
        let band = Band { low: 0.55, high: 0.80 };
        assert!(band.contains(0.55));
        assert!(band.contains(0.80));
        assert!(!band.contains(0.549));
        assert!(!band.contains(0.801));
    }
}
