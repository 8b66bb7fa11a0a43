use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid approve_threshold: {0}. Must be in [0, 1]")]
    InvalidApproveThreshold(f64),

    #[error("Invalid budget_ceiling: {0}. Must be positive")]
    InvalidBudgetCeiling(f64),

    #[error("Invalid {name} band: low ({low}) must not exceed high ({high}), both in [0, 1]")]
    InvalidBand { name: String, low: f64, high: f64 },

    #[error("Signal catalog cannot be empty")]
    EmptySignalCatalog,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .casegate/config.yaml (project config, created by init)
    /// 3. .casegate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CASEGATE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".casegate/config.yaml"))
            .merge(Yaml::file(".casegate/local.yaml"))
            .merge(Env::prefixed("CASEGATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.reasoning.rate_limit_rps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.reasoning.rate_limit_rps));
        }

        if config.reasoning.retry.initial_backoff_ms >= config.reasoning.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.reasoning.retry.initial_backoff_ms,
                config.reasoning.retry.max_backoff_ms,
            ));
        }

        let screening = &config.screening;
        if !(0.0..=1.0).contains(&screening.approve_threshold) {
            return Err(ConfigError::InvalidApproveThreshold(
                screening.approve_threshold,
            ));
        }

        if screening.budget_ceiling <= 0.0 {
            return Err(ConfigError::InvalidBudgetCeiling(screening.budget_ceiling));
        }

        for (name, band) in [
            ("medium_confidence", screening.medium_confidence),
            ("medium_risk", screening.medium_risk),
        ] {
            let in_range = (0.0..=1.0).contains(&band.low) && (0.0..=1.0).contains(&band.high);
            if band.low > band.high || !in_range {
                return Err(ConfigError::InvalidBand {
                    name: name.to_string(),
                    low: band.low,
                    high: band.high,
                });
            }
        }

        if screening.signals.is_empty() {
            return Err(ConfigError::EmptySignalCatalog);
        }

        for entry in &screening.signals {
            if entry.price < 0.0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "Signal '{}' price cannot be negative",
                    entry.signal_type.as_str()
                )));
            }
            if !(0.0..=1.0).contains(&entry.confidence_gain) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Signal '{}' confidence_gain must be in [0, 1]",
                    entry.signal_type.as_str()
                )));
            }
        }

        Ok(())
    }
}
