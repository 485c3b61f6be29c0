//! Continuation engine configuration.
//!
//! Unknown options are ignored during deserialization; missing options fall
//! back to the stated defaults. The configuration is assembled by the
//! infrastructure loader (defaults → YAML → environment) and validated
//! before use.

use serde::{Deserialize, Serialize};

use super::opportunity::{CompositeWeights, OpportunityCategory};

/// Continuation aggressiveness mode.
///
/// Acts as a prior on the decision engine's preference criterion:
/// conservative favors low-risk corrective work, aggressive favors
/// high-impact expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Prefer low-complexity, corrective enhancements.
    Conservative,
    /// Balance impact against risk (default).
    Adaptive,
    /// Prefer high-impact, expansive enhancements.
    Aggressive,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Adaptive
    }
}

/// Safety strictness presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// Trip earlier, cool down longer, promote traversal findings to
    /// critical.
    Strict,
    /// The defaults as stated (default).
    Standard,
    /// Trip later, cool down faster.
    Relaxed,
}

impl Default for SafetyLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl SafetyLevel {
    /// Apply this level's adjustments to a safety configuration.
    ///
    /// Called once when the gate is constructed, after the base config has
    /// been loaded, so the values overlay the configured defaults:
    ///
    /// - **Strict**: failure threshold 3, cooldown 120 s.
    /// - **Standard**: no changes.
    /// - **Relaxed**: failure threshold 8, cooldown 30 s.
    pub fn apply(&self, safety: &mut SafetyConfig) {
        match self {
            SafetyLevel::Strict => {
                safety.consecutive_failure_threshold = 3;
                safety.cooldown_seconds = 120;
            }
            SafetyLevel::Standard => {}
            SafetyLevel::Relaxed => {
                safety.consecutive_failure_threshold = 8;
                safety.cooldown_seconds = 30;
            }
        }
    }
}

/// Safety gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SafetyConfig {
    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub consecutive_failure_threshold: u32,

    /// Seconds the breaker stays open before probation.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Consecutive probationary successes required to close the breaker.
    #[serde(default = "default_probation_successes")]
    pub probation_successes: u32,

    /// Rolling external-generation-call ceiling per hour, shared across all
    /// sessions in the process.
    #[serde(default = "default_max_calls_per_hour")]
    pub max_calls_per_hour: u32,

    /// Process memory ceiling in MB.
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,

    /// Recent-average iteration time over baseline that counts as
    /// performance degradation.
    #[serde(default = "default_degradation_factor")]
    pub perf_degradation_factor: f64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_cooldown_seconds() -> u64 {
    60
}

const fn default_probation_successes() -> u32 {
    3
}

const fn default_max_calls_per_hour() -> u32 {
    150
}

const fn default_max_memory_mb() -> u64 {
    4096
}

const fn default_degradation_factor() -> f64 {
    1.5
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            consecutive_failure_threshold: default_failure_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
            probation_successes: default_probation_successes(),
            max_calls_per_hour: default_max_calls_per_hour(),
            max_memory_mb: default_max_memory_mb(),
            perf_degradation_factor: default_degradation_factor(),
        }
    }
}

/// Enhancement discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DiscoveryConfig {
    /// Maximum opportunities returned per discovery pass.
    #[serde(default = "default_max_opportunities")]
    pub max_opportunities: usize,

    /// Minimum composite score for an opportunity to be viable.
    #[serde(default = "default_min_viability")]
    pub min_viability: f64,

    /// Composite score weights.
    #[serde(default)]
    pub weights: CompositeWeights,
}

const fn default_max_opportunities() -> usize {
    10
}

const fn default_min_viability() -> f64 {
    0.3
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_opportunities: default_max_opportunities(),
            min_viability: default_min_viability(),
            weights: CompositeWeights::default(),
        }
    }
}

/// Decision engine criterion weights.
///
/// Defaults per deployment policy: impact 30%, feasibility 25%, preference
/// alignment 20%, contextual relevance 15%, resource efficiency 10%.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DecisionWeights {
    /// Enhancement impact weight.
    #[serde(default = "default_w_impact")]
    pub impact: f64,
    /// Implementation feasibility weight.
    #[serde(default = "default_w_feasibility")]
    pub feasibility: f64,
    /// User/session preference alignment weight.
    #[serde(default = "default_w_preference")]
    pub preference: f64,
    /// Contextual relevance weight.
    #[serde(default = "default_w_relevance")]
    pub relevance: f64,
    /// Resource efficiency weight.
    #[serde(default = "default_w_resource")]
    pub resource: f64,
}

const fn default_w_impact() -> f64 {
    0.30
}

const fn default_w_feasibility() -> f64 {
    0.25
}

const fn default_w_preference() -> f64 {
    0.20
}

const fn default_w_relevance() -> f64 {
    0.15
}

const fn default_w_resource() -> f64 {
    0.10
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self {
            impact: default_w_impact(),
            feasibility: default_w_feasibility(),
            preference: default_w_preference(),
            relevance: default_w_relevance(),
            resource: default_w_resource(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a daily-rolled log file. Stdout-only when
    /// unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Top-level configuration for the continuation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContinuationConfig {
    /// Continuation aggressiveness mode.
    #[serde(default)]
    pub mode: Mode,

    /// Overall quality at which continuation stops: once the current
    /// result scores at or above this, further enhancement is declined.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Hard iteration ceiling per session.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Hard wall-clock ceiling per session, in seconds.
    #[serde(default = "default_max_duration_seconds")]
    pub max_duration_seconds: u64,

    /// Safety strictness preset.
    #[serde(default)]
    pub safety_level: SafetyLevel,

    /// Enhancement categories the discoverer may propose. Defaults to all.
    #[serde(default = "default_enabled_categories")]
    pub enabled_categories: Vec<OpportunityCategory>,

    /// Tolerance below which a negative quality delta triggers a revert.
    /// Global for all task types.
    #[serde(default = "default_revert_tolerance")]
    pub revert_tolerance: f64,

    /// Whether sessions run autonomously (no per-iteration confirmation).
    #[serde(default = "default_autonomous")]
    pub autonomous: bool,

    /// Safety gate configuration.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Discovery configuration.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Decision criterion weights.
    #[serde(default)]
    pub decision: DecisionWeights,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_quality_threshold() -> f64 {
    0.9
}

const fn default_max_iterations() -> u32 {
    20
}

const fn default_max_duration_seconds() -> u64 {
    600
}

fn default_enabled_categories() -> Vec<OpportunityCategory> {
    OpportunityCategory::all().to_vec()
}

const fn default_revert_tolerance() -> f64 {
    0.05
}

const fn default_autonomous() -> bool {
    true
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            quality_threshold: default_quality_threshold(),
            max_iterations: default_max_iterations(),
            max_duration_seconds: default_max_duration_seconds(),
            safety_level: SafetyLevel::default(),
            enabled_categories: default_enabled_categories(),
            revert_tolerance: default_revert_tolerance(),
            autonomous: default_autonomous(),
            safety: SafetyConfig::default(),
            discovery: DiscoveryConfig::default(),
            decision: DecisionWeights::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ContinuationConfig {
    /// The safety config with the safety level's adjustments applied.
    pub fn effective_safety(&self) -> SafetyConfig {
        let mut safety = self.safety.clone();
        self.safety_level.apply(&mut safety);
        safety
    }

    /// Whether a category is enabled for discovery.
    pub fn category_enabled(&self, category: OpportunityCategory) -> bool {
        self.enabled_categories.contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stated_values() {
        let config = ContinuationConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.max_duration_seconds, 600);
        assert_eq!(config.safety.max_calls_per_hour, 150);
        assert_eq!(config.safety.consecutive_failure_threshold, 5);
        assert_eq!(config.safety.probation_successes, 3);
        assert!((config.revert_tolerance - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.discovery.max_opportunities, 10);
        assert!((config.discovery.min_viability - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.mode, Mode::Adaptive);
        assert_eq!(config.safety_level, SafetyLevel::Standard);
        assert_eq!(config.enabled_categories.len(), 6);
    }

    #[test]
    fn test_decision_weights_sum_to_one() {
        let w = DecisionWeights::default();
        let sum = w.impact + w.feasibility + w.preference + w.relevance + w.resource;
        assert!((sum - 1.0).abs() < f64::EPSILON, "weights should sum to 1.0, got {sum}");
    }

    #[test]
    fn test_strict_level_tightens_gate() {
        let config = ContinuationConfig {
            safety_level: SafetyLevel::Strict,
            ..Default::default()
        };
        let safety = config.effective_safety();
        assert_eq!(safety.consecutive_failure_threshold, 3);
        assert_eq!(safety.cooldown_seconds, 120);
    }

    #[test]
    fn test_relaxed_level_loosens_gate() {
        let config = ContinuationConfig {
            safety_level: SafetyLevel::Relaxed,
            ..Default::default()
        };
        let safety = config.effective_safety();
        assert_eq!(safety.consecutive_failure_threshold, 8);
        assert_eq!(safety.cooldown_seconds, 30);
    }

    #[test]
    fn test_unknown_options_are_ignored() {
        let json = r#"{"mode":"aggressive","telemetry_endpoint":"http://x","max_iterations":7}"#;
        let config: ContinuationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode, Mode::Aggressive);
        assert_eq!(config.max_iterations, 7);
        // Everything not provided falls back to defaults.
        assert_eq!(config.max_duration_seconds, 600);
    }

    #[test]
    fn test_category_filter() {
        let config = ContinuationConfig {
            enabled_categories: vec![OpportunityCategory::ErrorCorrection],
            ..Default::default()
        };
        assert!(config.category_enabled(OpportunityCategory::ErrorCorrection));
        assert!(!config.category_enabled(OpportunityCategory::ContentExpansion));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = ContinuationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ContinuationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_iterations, config.max_iterations);
        assert_eq!(parsed.safety_level, config.safety_level);
    }
}
