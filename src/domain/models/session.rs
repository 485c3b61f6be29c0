//! Continuation sessions: the stateful container for one end-to-end run.
//!
//! The orchestrator is the sole writer of a [`ContinuationSession`]; every
//! other component receives read-only projections and returns new values.
//! On termination the session is frozen and summarized into a
//! [`ConsolidatedResult`] carrying the best result seen across the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::assessment::QualityAssessment;
use super::opportunity::EnhancementOpportunity;
use super::safety::ResourceKind;
use super::task_result::TaskResult;

/// Orchestrator state machine.
///
/// `Init → Assessing → Selecting → Generating → Validating → (loop to
/// Assessing) | Stopped | SafetyHalted | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session created, history empty.
    Init,
    /// Scoring the current result and discovering opportunities.
    Assessing,
    /// Validating the plan and selecting the next action.
    Selecting,
    /// External generation in flight.
    Generating,
    /// Scoring the candidate and monitoring safety.
    Validating,
    /// Terminal: ran out of useful improvements, budget, or was asked to
    /// stop.
    Stopped,
    /// Terminal: halted by the safety gate.
    SafetyHalted,
    /// Terminal: unrecoverable failure (provider auth, dual provider
    /// failure).
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Assessing => "assessing",
            Self::Selecting => "selecting",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Stopped => "stopped",
            Self::SafetyHalted => "safety_halted",
            Self::Error => "error",
        }
    }

    /// Whether this state ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::SafetyHalted | Self::Error)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached `Stopped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The discoverer found nothing viable. The normal end of a session.
    NoViableOpportunities,
    /// The current result already meets the configured quality threshold.
    QualityTargetReached,
    /// The decision engine declined to continue for another reason.
    DecisionDeclined(String),
    /// The caller requested a stop.
    UserRequested,
    /// A hard resource ceiling was reached.
    ResourceExhausted(ResourceKind),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoViableOpportunities => write!(f, "no viable enhancements remain"),
            Self::QualityTargetReached => write!(f, "quality target reached"),
            Self::DecisionDeclined(reason) => write!(f, "declined: {reason}"),
            Self::UserRequested => write!(f, "user requested"),
            Self::ResourceExhausted(kind) => write!(f, "{kind} budget exhausted"),
        }
    }
}

/// How a session terminated. Distinguishes "ran out of useful improvements"
/// from "had to be stopped for safety" from "failed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Orderly stop.
    Stopped { reason: StopReason },
    /// Safety gate halt, reported distinctly from `Stopped`.
    SafetyHalted { reason: String },
    /// Unrecoverable failure, reported with full context.
    Error { error: String },
}

impl Termination {
    /// The terminal state this termination corresponds to.
    pub fn state(&self) -> SessionState {
        match self {
            Self::Stopped { .. } => SessionState::Stopped,
            Self::SafetyHalted { .. } => SessionState::SafetyHalted,
            Self::Error { .. } => SessionState::Error,
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped { reason } => write!(f, "stopped: {reason}"),
            Self::SafetyHalted { reason } => write!(f, "safety halted: {reason}"),
            Self::Error { error } => write!(f, "error: {error}"),
        }
    }
}

/// Outcome of one enhancement iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationOutcome {
    /// Candidate accepted; `current` was superseded.
    Applied { delta: f64 },
    /// Candidate regressed beyond tolerance and was discarded.
    Reverted { delta: f64 },
    /// Generation failed on both providers.
    Failed { reason: String },
    /// The safety gate blocked the candidate.
    SafetyBlocked { reason: String },
}

impl IterationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Reverted { .. } => "reverted",
            Self::Failed { .. } => "failed",
            Self::SafetyBlocked { .. } => "safety_blocked",
        }
    }
}

/// One record in the enhancement history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Iteration number this entry describes.
    pub iteration: u32,
    /// The opportunity that was attempted.
    pub opportunity: EnhancementOpportunity,
    /// Assessment of the candidate, when one was produced.
    pub assessment: Option<QualityAssessment>,
    /// What happened.
    pub outcome: IterationOutcome,
    /// Audit copy of any safety-gate reason that applied to this iteration.
    #[serde(default)]
    pub safety_note: Option<String>,
    /// When the iteration completed.
    pub completed_at: DateTime<Utc>,
    /// Iteration wall time in milliseconds.
    pub duration_ms: u64,
}

/// Per-category acceptance statistics, used as session preference signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Iterations in this category that were applied.
    pub accepted: u32,
    /// Iterations in this category that were reverted.
    pub reverted: u32,
}

/// The stateful container for one end-to-end continuation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationSession {
    /// Session identifier.
    pub id: Uuid,
    /// The result the session started from.
    pub initial: TaskResult,
    /// The current accepted result.
    pub current: TaskResult,
    /// Ordered enhancement history.
    pub history: Vec<HistoryEntry>,
    /// Iteration counter. Never exceeds `max_iterations`.
    pub iteration: u32,
    /// Session start timestamp.
    pub started_at: DateTime<Utc>,
    /// Configured iteration ceiling.
    pub max_iterations: u32,
    /// Configured wall-clock ceiling in seconds. Enforced by the safety
    /// gate, not self-enforced.
    pub max_duration_seconds: u64,
    /// Whether the session runs autonomously.
    pub autonomous: bool,
    /// Current state-machine state.
    pub state: SessionState,
    /// Best result seen so far (not necessarily the current one).
    pub best: TaskResult,
    /// Overall score of `best`, when it has been assessed.
    pub best_score: Option<f64>,
    /// Overall score of `current`, when it has been assessed.
    pub current_score: Option<f64>,
    /// Per-category acceptance statistics.
    #[serde(default)]
    pub category_stats: BTreeMap<String, CategoryStats>,
}

impl ContinuationSession {
    /// Create a fresh session around an initial result.
    pub fn new(initial: TaskResult, max_iterations: u32, max_duration_seconds: u64, autonomous: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            current: initial.clone(),
            best: initial.clone(),
            initial,
            history: Vec::new(),
            iteration: 0,
            started_at: Utc::now(),
            max_iterations,
            max_duration_seconds,
            autonomous,
            state: SessionState::Init,
            best_score: None,
            current_score: None,
            category_stats: BTreeMap::new(),
        }
    }

    /// Wall-clock elapsed since session start, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        elapsed.num_milliseconds().max(0) as u64
    }

    /// Fraction of the iteration/time budget remaining, `[0, 1]`, taken as
    /// the minimum across both dimensions.
    pub fn remaining_budget_fraction(&self) -> f64 {
        let iter_frac = 1.0 - f64::from(self.iteration) / f64::from(self.max_iterations.max(1));
        let max_ms = (self.max_duration_seconds * 1000).max(1) as f64;
        let time_frac = 1.0 - self.elapsed_ms() as f64 / max_ms;
        iter_frac.min(time_frac).clamp(0.0, 1.0)
    }

    /// Record a completed iteration.
    ///
    /// Increments the counter and appends the history entry; category
    /// statistics are updated for applied/reverted outcomes. The caller is
    /// responsible for having checked the iteration ceiling beforehand.
    pub fn record_iteration(&mut self, entry: HistoryEntry) {
        let key = entry.opportunity.category.as_str().to_string();
        let stats = self.category_stats.entry(key).or_default();
        match entry.outcome {
            IterationOutcome::Applied { .. } => stats.accepted += 1,
            IterationOutcome::Reverted { .. } => stats.reverted += 1,
            IterationOutcome::Failed { .. } | IterationOutcome::SafetyBlocked { .. } => {}
        }
        self.history.push(entry);
        self.iteration += 1;
    }

    /// Update the best-seen result if the new score beats it.
    pub fn consider_best(&mut self, result: &TaskResult, score: f64) {
        if self.best_score.is_none_or(|best| score > best) {
            self.best = result.clone();
            self.best_score = Some(score);
        }
    }

    /// Freeze the session into its consolidated terminal result.
    pub fn consolidate(&self, termination: Termination) -> ConsolidatedResult {
        ConsolidatedResult {
            session_id: self.id,
            result: self.best.clone(),
            best_score: self.best_score,
            iterations: self.iteration,
            elapsed_ms: self.elapsed_ms(),
            history: self.history.clone(),
            termination,
        }
    }
}

/// The final consolidated output of a terminated session: the best-quality
/// result seen across the run, the full history, and the termination
/// reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Session identifier.
    pub session_id: Uuid,
    /// Best-quality result seen across the session.
    pub result: TaskResult,
    /// Score of that result, when assessed.
    pub best_score: Option<f64>,
    /// Iterations completed.
    pub iterations: u32,
    /// Total session wall time in milliseconds.
    pub elapsed_ms: u64,
    /// Full enhancement history.
    pub history: Vec<HistoryEntry>,
    /// How the session ended.
    pub termination: Termination,
}
