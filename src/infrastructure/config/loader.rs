use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::ContinuationConfig;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be between 1 and 1000")]
    InvalidMaxIterations(u32),

    #[error("Invalid max_duration_seconds: {0}. Must be at least 1")]
    InvalidMaxDuration(u64),

    #[error("Invalid quality_threshold: {0}. Must be within [0, 1]")]
    InvalidQualityThreshold(f64),

    #[error("Invalid revert_tolerance: {0}. Must be within [0, 1]")]
    InvalidRevertTolerance(f64),

    #[error("Invalid min_viability: {0}. Must be within [0, 1]")]
    InvalidMinViability(f64),

    #[error("Invalid max_opportunities: {0}. Cannot be 0")]
    InvalidMaxOpportunities(usize),

    #[error("Invalid max_calls_per_hour: {0}. Cannot be 0")]
    InvalidCallCeiling(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("enabled_categories cannot be empty")]
    NoEnabledCategories,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `.continuum/config.yaml` (project config, created by init)
    /// 3. `.continuum/local.yaml` (local overrides, optional)
    /// 4. Environment variables (`CONTINUUM_*` prefix, highest priority)
    pub fn load() -> Result<ContinuationConfig> {
        let config: ContinuationConfig = Figment::new()
            .merge(Serialized::defaults(ContinuationConfig::default()))
            .merge(Yaml::file(".continuum/config.yaml"))
            .merge(Yaml::file(".continuum/local.yaml"))
            .merge(Env::prefixed("CONTINUUM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<ContinuationConfig> {
        let config: ContinuationConfig = Figment::new()
            .merge(Serialized::defaults(ContinuationConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &ContinuationConfig) -> Result<(), ConfigError> {
        if config.max_iterations == 0 || config.max_iterations > 1000 {
            return Err(ConfigError::InvalidMaxIterations(config.max_iterations));
        }

        if config.max_duration_seconds == 0 {
            return Err(ConfigError::InvalidMaxDuration(config.max_duration_seconds));
        }

        if !(0.0..=1.0).contains(&config.quality_threshold) {
            return Err(ConfigError::InvalidQualityThreshold(
                config.quality_threshold,
            ));
        }

        if !(0.0..=1.0).contains(&config.revert_tolerance) {
            return Err(ConfigError::InvalidRevertTolerance(config.revert_tolerance));
        }

        if !(0.0..=1.0).contains(&config.discovery.min_viability) {
            return Err(ConfigError::InvalidMinViability(
                config.discovery.min_viability,
            ));
        }

        if config.discovery.max_opportunities == 0 {
            return Err(ConfigError::InvalidMaxOpportunities(
                config.discovery.max_opportunities,
            ));
        }

        if config.safety.max_calls_per_hour == 0 {
            return Err(ConfigError::InvalidCallCeiling(
                config.safety.max_calls_per_hour,
            ));
        }

        if config.enabled_categories.is_empty() {
            return Err(ConfigError::NoEnabledCategories);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }

    /// Serialize the default configuration as a YAML template, for
    /// `continuum init`.
    pub fn default_template() -> Result<String> {
        serde_yaml::to_string(&ContinuationConfig::default())
            .context("Failed to serialize default configuration")
    }
}
