//! Enhancement opportunities: candidate improvements ranked by the
//! discoverer and consumed by the decision engine.
//!
//! Opportunities are produced fresh on every loop pass and discarded once
//! consumed. Relevance changes as the result evolves, so they are never
//! carried across iterations.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Closed set of enhancement categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityCategory {
    /// Add missing content: sections, cases, coverage.
    ContentExpansion,
    /// Raise the quality of what already exists.
    QualityImprovement,
    /// Fold in retrieved context or domain knowledge.
    KnowledgeIntegration,
    /// Reorganize for structure and readability.
    Structural,
    /// Make the output faster, shorter, or cheaper.
    Optimization,
    /// Fix a detected defect.
    ErrorCorrection,
}

impl OpportunityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentExpansion => "content_expansion",
            Self::QualityImprovement => "quality_improvement",
            Self::KnowledgeIntegration => "knowledge_integration",
            Self::Structural => "structural",
            Self::Optimization => "optimization",
            Self::ErrorCorrection => "error_correction",
        }
    }

    /// All categories, in declaration order.
    pub fn all() -> [OpportunityCategory; 6] {
        [
            Self::ContentExpansion,
            Self::QualityImprovement,
            Self::KnowledgeIntegration,
            Self::Structural,
            Self::Optimization,
            Self::ErrorCorrection,
        ]
    }
}

impl std::fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights for the composite opportunity score.
///
/// The composite is
/// `(w_impact·impact + w_feasibility·(1−complexity) + w_relevance·relevance
/// + w_potential·potential) x synergy`, clamped to `[0, 1]`. Weights should
/// sum to 1.0; non-unit sums produce scaled composites, which is acceptable
/// if consistent within one discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeWeights {
    /// Weight for the estimated impact. Default: 0.35.
    pub w_impact: f64,
    /// Weight for feasibility (`1 − complexity`). Default: 0.25.
    pub w_feasibility: f64,
    /// Weight for contextual relevance. Default: 0.20.
    pub w_relevance: f64,
    /// Weight for quality-improvement potential. Default: 0.20.
    pub w_potential: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            w_impact: 0.35,
            w_feasibility: 0.25,
            w_relevance: 0.20,
            w_potential: 0.20,
        }
    }
}

/// A candidate improvement to the current task result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementOpportunity {
    /// Enhancement category.
    pub category: OpportunityCategory,
    /// What the enhancement would do.
    pub description: String,
    /// Estimated impact on the result, `[0, 1]`.
    pub estimated_impact: f64,
    /// Implementation complexity, `[0, 1]` (0 = trivial).
    pub complexity: f64,
    /// Quality-improvement potential, `[0, 1]`.
    pub quality_potential: f64,
    /// Contextual relevance to the current task, `[0, 1]`.
    pub context_relevance: f64,
    /// Derived ranking score, `[0, 1]`. Recomputed whenever the opportunity
    /// is re-evaluated against updated state.
    pub composite_score: f64,
    /// The gap this opportunity was generated from.
    pub source_gap: String,
}

impl EnhancementOpportunity {
    /// Feasibility is the inverse of complexity.
    pub fn feasibility(&self) -> f64 {
        (1.0 - self.complexity).clamp(0.0, 1.0)
    }

    /// Recompute the composite score under the given weights and synergy
    /// factor. The synergy multiplier is uncapped, but the final composite
    /// is clamped to `[0, 1]`.
    pub fn recompute_composite(&mut self, weights: &CompositeWeights, synergy: f64) {
        let raw = weights.w_impact * self.estimated_impact
            + weights.w_feasibility * self.feasibility()
            + weights.w_relevance * self.context_relevance
            + weights.w_potential * self.quality_potential;
        self.composite_score = (raw * synergy).clamp(0.0, 1.0);
    }

    /// Ranking order: descending composite score; ties broken by lower
    /// implementation complexity, then by higher raw estimated impact.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .composite_score
            .partial_cmp(&self.composite_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                self.complexity
                    .partial_cmp(&other.complexity)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                other
                    .estimated_impact
                    .partial_cmp(&self.estimated_impact)
                    .unwrap_or(Ordering::Equal)
            })
    }
}
