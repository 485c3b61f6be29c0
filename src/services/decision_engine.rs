//! Decision engine: weighted multi-criteria selection of the next action.
//!
//! `decide` is a pure function of its inputs -- no hidden state -- so the
//! continuation policy is independently testable. It never invokes
//! generation; it only returns the selection.
//!
//! Criteria and default weights:
//!
//! | Criterion            | Weight |
//! |----------------------|--------|
//! | enhancement impact   | 0.30   |
//! | feasibility          | 0.25   |
//! | preference alignment | 0.20   |
//! | contextual relevance | 0.15   |
//! | resource efficiency  | 0.10   |
//!
//! Safety clearance has absolute precedence: a denying
//! [`SafetyDecision`] yields `continue = false` regardless of opportunity
//! scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::models::{
    CategoryStats, ContinuationSession, DecisionWeights, EnhancementOpportunity, Mode,
    OpportunityCategory, SafetyDecision,
};

/// Read-only projection of session state the decision needs.
#[derive(Debug, Clone)]
pub struct SessionView<'a> {
    /// Current iteration counter.
    pub iteration: u32,
    /// Configured iteration ceiling.
    pub max_iterations: u32,
    /// Elapsed wall time in milliseconds.
    pub elapsed_ms: u64,
    /// Configured wall-time ceiling in milliseconds.
    pub max_duration_ms: u64,
    /// Overall quality of the current result, once assessed.
    pub current_quality: Option<f64>,
    /// Per-category acceptance statistics from this session.
    pub category_stats: &'a BTreeMap<String, CategoryStats>,
    /// Configured aggressiveness mode.
    pub mode: Mode,
}

impl<'a> SessionView<'a> {
    /// Project a view out of a session.
    pub fn of(session: &'a ContinuationSession, mode: Mode) -> Self {
        Self {
            iteration: session.iteration,
            max_iterations: session.max_iterations,
            elapsed_ms: session.elapsed_ms(),
            max_duration_ms: session.max_duration_seconds * 1000,
            current_quality: session.current_score,
            category_stats: &session.category_stats,
            mode,
        }
    }

    /// Remaining budget fraction, the minimum across iterations and time.
    fn remaining_fraction(&self) -> f64 {
        let iter_frac =
            1.0 - f64::from(self.iteration) / f64::from(self.max_iterations.max(1));
        let time_frac = 1.0 - self.elapsed_ms as f64 / self.max_duration_ms.max(1) as f64;
        iter_frac.min(time_frac).clamp(0.0, 1.0)
    }
}

/// The decision: continue with a selected opportunity, or stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Whether to continue enhancing.
    pub continue_run: bool,
    /// The chosen opportunity, when continuing.
    pub selected: Option<EnhancementOpportunity>,
    /// Why this decision was reached.
    pub reasoning: String,
    /// Decision confidence, `[0, 1]`, from the agreement of the winner's
    /// criterion scores.
    pub confidence: f64,
}

impl Decision {
    fn stop(reasoning: impl Into<String>) -> Self {
        Self {
            continue_run: false,
            selected: None,
            reasoning: reasoning.into(),
            confidence: 1.0,
        }
    }
}

/// Weighted multi-criteria decision engine.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    weights: DecisionWeights,
    quality_threshold: f64,
}

impl DecisionEngine {
    pub fn new(weights: DecisionWeights, quality_threshold: f64) -> Self {
        Self {
            weights,
            quality_threshold,
        }
    }

    /// Select the next action.
    ///
    /// Stops when the safety gate denied the plan, no opportunities exist,
    /// the resource budget is spent, or the current result already meets
    /// the quality threshold. Otherwise picks the opportunity with the
    /// highest weighted score; ties break by lowest implementation
    /// complexity, then by original discovery order.
    pub fn decide(
        &self,
        opportunities: &[EnhancementOpportunity],
        view: &SessionView<'_>,
        clearance: &SafetyDecision,
    ) -> Decision {
        if !clearance.allow {
            return Decision::stop(format!("safety gate denied plan: {}", clearance.reason));
        }
        if opportunities.is_empty() {
            return Decision::stop("no viable enhancement opportunities");
        }
        if view.iteration >= view.max_iterations {
            return Decision::stop(format!(
                "iteration budget exhausted ({} of {})",
                view.iteration, view.max_iterations
            ));
        }
        if view.elapsed_ms >= view.max_duration_ms {
            return Decision::stop(format!(
                "time budget exhausted ({} ms of {} ms)",
                view.elapsed_ms, view.max_duration_ms
            ));
        }
        if let Some(quality) = view.current_quality {
            if quality >= self.quality_threshold {
                return Decision::stop(format!(
                    "quality target reached ({quality:.2} >= {:.2})",
                    self.quality_threshold
                ));
            }
        }

        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_criteria = [0.0; 5];
        for (index, opportunity) in opportunities.iter().enumerate() {
            let criteria = self.criteria(opportunity, view);
            let score = self.weighted(&criteria);
            let beats = score > best_score + 1e-12
                || ((score - best_score).abs() <= 1e-12
                    && opportunity.complexity + 1e-12 < opportunities[best_index].complexity);
            if beats {
                best_index = index;
                best_score = score;
                best_criteria = criteria;
            }
        }

        let winner = opportunities[best_index].clone();
        let confidence = confidence_from_criteria(&best_criteria);

        debug!(
            category = %winner.category,
            score = best_score,
            confidence,
            "selected enhancement"
        );

        Decision {
            continue_run: true,
            reasoning: format!(
                "selected {} (weighted score {best_score:.2}): {}",
                winner.category, winner.description
            ),
            selected: Some(winner),
            confidence,
        }
    }

    /// Criterion scores for one opportunity:
    /// `[impact, feasibility, preference, relevance, resource]`.
    fn criteria(&self, opportunity: &EnhancementOpportunity, view: &SessionView<'_>) -> [f64; 5] {
        [
            opportunity.estimated_impact,
            opportunity.feasibility(),
            preference_alignment(opportunity, view),
            opportunity.context_relevance,
            resource_efficiency(opportunity, view),
        ]
    }

    fn weighted(&self, criteria: &[f64; 5]) -> f64 {
        self.weights.impact * criteria[0]
            + self.weights.feasibility * criteria[1]
            + self.weights.preference * criteria[2]
            + self.weights.relevance * criteria[3]
            + self.weights.resource * criteria[4]
    }
}

/// Alignment of an opportunity with observed preference signals: a mode
/// prior blended with this session's accept/revert history for the
/// category.
fn preference_alignment(opportunity: &EnhancementOpportunity, view: &SessionView<'_>) -> f64 {
    let prior = mode_prior(view.mode, opportunity.category);
    let stats = view
        .category_stats
        .get(opportunity.category.as_str())
        .copied()
        .unwrap_or_default();
    let total = stats.accepted + stats.reverted;
    if total == 0 {
        prior
    } else {
        let observed = f64::from(stats.accepted) / f64::from(total);
        0.5 * prior + 0.5 * observed
    }
}

fn mode_prior(mode: Mode, category: OpportunityCategory) -> f64 {
    use OpportunityCategory as C;
    match mode {
        Mode::Conservative => match category {
            C::ErrorCorrection => 0.9,
            C::QualityImprovement => 0.8,
            C::Optimization => 0.6,
            C::Structural => 0.5,
            C::KnowledgeIntegration => 0.4,
            C::ContentExpansion => 0.3,
        },
        Mode::Adaptive => 0.6,
        Mode::Aggressive => match category {
            C::ContentExpansion => 0.9,
            C::KnowledgeIntegration => 0.8,
            C::Structural => 0.6,
            C::Optimization | C::QualityImprovement => 0.5,
            C::ErrorCorrection => 0.4,
        },
    }
}

/// Cheap enhancements late in the budget are efficient; expensive ones with
/// a nearly spent budget are not.
fn resource_efficiency(opportunity: &EnhancementOpportunity, view: &SessionView<'_>) -> f64 {
    let remaining = view.remaining_fraction();
    (opportunity.feasibility() * (0.4 + 0.6 * remaining)).clamp(0.0, 1.0)
}

/// Confidence from the variance of the winner's criterion scores: low
/// variance (all criteria agree) yields high confidence. Any criterion
/// below 0.2 multiplies confidence down by 0.7 as a conservative penalty.
fn confidence_from_criteria(criteria: &[f64; 5]) -> f64 {
    let mean = criteria.iter().sum::<f64>() / criteria.len() as f64;
    let variance =
        criteria.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / criteria.len() as f64;
    let std_dev = variance.sqrt();

    // Criteria live in [0, 1], so the standard deviation tops out at 0.5.
    let mut confidence = (1.0 - 2.0 * std_dev).clamp(0.1, 1.0);
    if criteria.iter().any(|c| *c < 0.2) {
        confidence *= 0.7;
    }
    confidence.clamp(0.0, 1.0)
}
