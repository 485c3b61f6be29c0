//! Safety gate domain types: decisions, circuit-breaker state, content
//! findings, and resource classifications.

use serde::{Deserialize, Serialize};

/// Circuit breaker state.
///
/// Transitions are owned by the safety gate's transition table:
/// `Closed → Open` on a trip condition, `Open → HalfOpen` after cooldown,
/// `HalfOpen → Closed` after sustained probationary success, and
/// `HalfOpen → Open` on any failure during probation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Normal operation, continuation flows through.
    Closed,
    /// Tripped, all continuation blocked until cooldown elapses.
    Open,
    /// Probationary: limited test iterations allowed.
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What tripped the breaker. Recorded for audit alongside the deny reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCause {
    /// Consecutive-failure count reached the threshold.
    ConsecutiveFailures(u32),
    /// Recent average iteration time exceeded 1.5x the baseline.
    PerformanceDegradation,
    /// Improvement delta was negative for two or more consecutive
    /// iterations.
    QualityDecline,
    /// A hard resource ceiling was breached.
    ResourceBreach(ResourceKind),
}

impl std::fmt::Display for TripCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConsecutiveFailures(n) => write!(f, "{n} consecutive failures"),
            Self::PerformanceDegradation => write!(f, "performance degradation"),
            Self::QualityDecline => write!(f, "sustained quality decline"),
            Self::ResourceBreach(kind) => write!(f, "{kind} limit breached"),
        }
    }
}

/// The hard resource ceilings the safety gate enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Iteration-count ceiling.
    Iterations,
    /// Wall-clock duration ceiling.
    Duration,
    /// Rolling external-generation-call rate ceiling.
    CallRate,
    /// Process memory ceiling.
    Memory,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iterations => "iterations",
            Self::Duration => "duration",
            Self::CallRate => "call_rate",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a pre-execution plan validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyDecision {
    /// Whether the plan may proceed.
    pub allow: bool,
    /// Human-readable reason. Non-empty whenever `allow` is false.
    pub reason: String,
    /// Gate confidence in this decision, `[0, 1]`.
    pub confidence: f64,
    /// Optional numeric safety score, `[0, 1]`.
    pub safety_score: Option<f64>,
    /// Optional suggested mitigation.
    pub mitigation: Option<String>,
}

impl SafetyDecision {
    /// An allowing decision.
    pub fn allowed(reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            allow: true,
            reason: reason.into(),
            confidence,
            safety_score: None,
            mitigation: None,
        }
    }

    /// A denying decision. The reason must identify what blocked the plan;
    /// an empty reason is replaced so the invariant `allow=false ⇒
    /// non-empty reason` holds even on caller mistakes.
    pub fn denied(reason: impl Into<String>, confidence: f64) -> Self {
        let mut reason = reason.into();
        if reason.is_empty() {
            reason = "denied for unspecified safety reason".to_string();
        }
        Self {
            allow: false,
            reason,
            confidence,
            safety_score: None,
            mitigation: None,
        }
    }

    /// Attach a numeric safety score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.safety_score = Some(score.clamp(0.0, 1.0));
        self
    }

    /// Attach a suggested mitigation.
    pub fn with_mitigation(mut self, mitigation: impl Into<String>) -> Self {
        self.mitigation = Some(mitigation.into());
        self
    }
}

/// Immediate action requested by the in-flight monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmediateAction {
    /// Halt the session now (critical content-safety hit). Maps to the
    /// `SAFETY_HALTED` terminal state.
    Halt,
    /// Discard the candidate output but let the loop continue.
    DiscardCandidate,
}

/// Outcome of an in-flight execution check.
///
/// `continue_run == false` with [`ImmediateAction::Halt`] means a safety
/// halt; `continue_run == false` without an action means an orderly stop
/// (resource exhaustion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionDecision {
    /// Whether execution may continue.
    pub continue_run: bool,
    /// Human-readable reason.
    pub reason: String,
    /// Action the orchestrator must take immediately, if any.
    pub immediate_action: Option<ImmediateAction>,
}

impl ExecutionDecision {
    /// Execution may proceed.
    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            continue_run: true,
            reason: reason.into(),
            immediate_action: None,
        }
    }

    /// Stop for a critical safety hit.
    pub fn halt(reason: impl Into<String>) -> Self {
        Self {
            continue_run: false,
            reason: reason.into(),
            immediate_action: Some(ImmediateAction::Halt),
        }
    }

    /// Stop in an orderly fashion (resource exhaustion).
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            continue_run: false,
            reason: reason.into(),
            immediate_action: None,
        }
    }
}

/// Severity of a content-safety finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    /// Recorded, execution continues.
    Warning,
    /// Forces an immediate stop regardless of circuit-breaker state.
    Critical,
}

/// A single content-safety finding from the pattern scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFinding {
    /// The pattern that matched.
    pub pattern: String,
    /// What the pattern indicates.
    pub description: String,
    /// Finding severity.
    pub severity: FindingSeverity,
}

/// Snapshot of an in-flight execution handed to the monitor.
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot<'a> {
    /// Candidate output under validation.
    pub output: &'a str,
    /// Iteration that produced it.
    pub iteration: u32,
    /// Wall-clock elapsed since session start, in milliseconds.
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_never_has_empty_reason() {
        let decision = SafetyDecision::denied("", 0.9);
        assert!(!decision.allow);
        assert!(!decision.reason.is_empty());
    }

    #[test]
    fn test_denied_keeps_given_reason() {
        let decision = SafetyDecision::denied("iteration limit reached", 1.0);
        assert_eq!(decision.reason, "iteration limit reached");
    }

    #[test]
    fn test_halt_carries_immediate_action() {
        let decision = ExecutionDecision::halt("critical content");
        assert!(!decision.continue_run);
        assert_eq!(decision.immediate_action, Some(ImmediateAction::Halt));
    }

    #[test]
    fn test_stop_has_no_immediate_action() {
        let decision = ExecutionDecision::stop("duration limit");
        assert!(!decision.continue_run);
        assert!(decision.immediate_action.is_none());
    }

    #[test]
    fn test_breaker_state_serde() {
        assert_eq!(
            serde_json::to_string(&BreakerState::HalfOpen).unwrap(),
            "\"half_open\""
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(FindingSeverity::Critical > FindingSeverity::Warning);
    }

    #[test]
    fn test_with_score_clamps() {
        let decision = SafetyDecision::allowed("ok", 1.0).with_score(1.7);
        assert_eq!(decision.safety_score, Some(1.0));
    }
}
