//! Enhancement discoverer: turns a task result plus context into a ranked
//! list of enhancement opportunities.
//!
//! Four independent analyzers each produce zero or more raw gaps:
//!
//! - **content-completeness** -- truncation markers, thin output, verbosity
//! - **quality-gap** -- rubric dimensions scoring below par
//! - **contextual-relevance** -- retrieved context the output never used
//! - **pattern-based** -- categories that historically paid off for this
//!   task type (read-only consultation of the injected pattern bank)
//!
//! Gaps are cross-referenced pairwise for synergistic combinations (fixing
//! completeness *and* technical depth together is worth more than either
//! alone), then expanded into opportunities whose composite scores are the
//! weighted sum of impact, feasibility, relevance, and quality potential,
//! multiplied by the synergy factor and clamped to `[0, 1]`.
//!
//! An empty return is not an error: it is the normal signal that the
//! orchestrator should stop.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::models::{
    DiscoveryConfig, EnhancementOpportunity, OpportunityCategory, QualityAssessment, TaskResult,
    TaskType, DIM_CONTENT, DIM_TECHNICAL,
};
use crate::domain::ports::{ContextStore, PatternMemory, Snippet};

/// Dimension score below which the quality-gap analyzer reports a gap.
const DIMENSION_GAP_THRESHOLD: f64 = 0.65;

/// A raw deficiency found by one analyzer.
#[derive(Debug, Clone)]
struct Gap {
    kind: GapKind,
    severity: f64,
    description: String,
}

#[derive(Debug, Clone, PartialEq)]
enum GapKind {
    /// Output is thin or visibly truncated.
    Completeness,
    /// Output is bloated and should be condensed.
    Verbosity,
    /// A rubric dimension scored below par.
    Dimension(String),
    /// Retrieved context went unused.
    ContextCoverage,
    /// The pattern bank says this category keeps paying off.
    Recurring(OpportunityCategory),
}

/// Discovers and ranks enhancement opportunities.
pub struct EnhancementDiscoverer {
    config: DiscoveryConfig,
    enabled_categories: Vec<OpportunityCategory>,
    context_store: Arc<dyn ContextStore>,
    patterns: Arc<dyn PatternMemory>,
}

impl EnhancementDiscoverer {
    /// Build a discoverer. The pattern bank is passed explicitly so
    /// discovery stays a pure function of its inputs and testable without a
    /// live store.
    pub fn new(
        config: DiscoveryConfig,
        enabled_categories: Vec<OpportunityCategory>,
        context_store: Arc<dyn ContextStore>,
        patterns: Arc<dyn PatternMemory>,
    ) -> Self {
        Self {
            config,
            enabled_categories,
            context_store,
            patterns,
        }
    }

    /// Produce opportunities for the current result, ordered by descending
    /// composite score and truncated to the configured maximum.
    pub async fn discover(
        &self,
        result: &TaskResult,
        assessment: &QualityAssessment,
    ) -> Vec<EnhancementOpportunity> {
        let snippets = self.retrieve_context(result).await;

        let mut gaps = Vec::new();
        gaps.extend(completeness_analyzer(result));
        gaps.extend(quality_gap_analyzer(assessment));
        gaps.extend(relevance_analyzer(result, &snippets));
        gaps.extend(self.pattern_analyzer(result.task_type).await);

        if gaps.is_empty() {
            debug!(session_result_iteration = result.iteration, "no gaps found");
            return Vec::new();
        }

        let mut opportunities: Vec<EnhancementOpportunity> = Vec::new();
        for gap in &gaps {
            let synergy = synergy_factor(gap, &gaps);
            for mut opportunity in opportunities_for_gap(gap) {
                if !self.enabled_categories.contains(&opportunity.category) {
                    continue;
                }
                opportunity.recompute_composite(&self.config.weights, synergy);
                if opportunity.composite_score >= self.config.min_viability {
                    opportunities.push(opportunity);
                }
            }
        }

        // Stable sort preserves discovery order across full ties, which the
        // decision engine relies on for its final tie-break.
        opportunities.sort_by(|a, b| a.ranking_cmp(b));
        opportunities.truncate(self.config.max_opportunities);

        debug!(
            count = opportunities.len(),
            top_score = opportunities.first().map(|o| o.composite_score),
            "discovery pass complete"
        );
        opportunities
    }

    async fn retrieve_context(&self, result: &TaskResult) -> Vec<Snippet> {
        let query: String = result.output.chars().take(240).collect();
        match self.context_store.retrieve(&query, 5).await {
            Ok(snippets) => snippets,
            Err(err) => {
                // Retrieval is optional; a failing store degrades to the
                // immediate task context.
                warn!(error = %err, "context retrieval failed, continuing without");
                Vec::new()
            }
        }
    }

    async fn pattern_analyzer(&self, task_type: TaskType) -> Vec<Gap> {
        let ranked = match self.patterns.recurring_categories(task_type).await {
            Ok(ranked) => ranked,
            Err(err) => {
                warn!(error = %err, "pattern bank unavailable, skipping pattern analyzer");
                return Vec::new();
            }
        };
        ranked
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .take(2)
            .map(|(category, count)| Gap {
                kind: GapKind::Recurring(category),
                severity: (0.3 + 0.1 * f64::from(count)).min(0.7),
                description: format!(
                    "{category} enhancements were accepted {count} times for {task_type} tasks"
                ),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Analyzers
// ---------------------------------------------------------------------------

fn completeness_analyzer(result: &TaskResult) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let output = &result.output;
    let words = output.split_whitespace().count();

    let expected_words = match result.task_type {
        TaskType::Code | TaskType::Automation => 40,
        TaskType::Multimedia | TaskType::Analytics => 120,
        TaskType::DocumentQa => 60,
    };

    if words < expected_words {
        let severity = 1.0 - words as f64 / expected_words as f64;
        gaps.push(Gap {
            kind: GapKind::Completeness,
            severity,
            description: format!(
                "output has {words} words; comparable {} results run to {expected_words}+",
                result.task_type
            ),
        });
    }

    for marker in ["TODO", "TBD", "FIXME"] {
        if output.contains(marker) {
            gaps.push(Gap {
                kind: GapKind::Completeness,
                severity: 0.6,
                description: format!("unresolved {marker} marker left in output"),
            });
            break;
        }
    }

    if words > 1500 {
        gaps.push(Gap {
            kind: GapKind::Verbosity,
            severity: ((words - 1500) as f64 / 1500.0).min(0.8),
            description: format!("output runs to {words} words and could be condensed"),
        });
    }

    gaps
}

fn quality_gap_analyzer(assessment: &QualityAssessment) -> Vec<Gap> {
    assessment
        .dimensions
        .iter()
        .filter(|(_, score)| **score < DIMENSION_GAP_THRESHOLD)
        .map(|(name, score)| Gap {
            kind: GapKind::Dimension(name.clone()),
            severity: (1.0 - score).clamp(0.0, 1.0),
            description: format!("{name} scored {score:.2}, below the {DIMENSION_GAP_THRESHOLD} bar"),
        })
        .collect()
}

fn relevance_analyzer(result: &TaskResult, snippets: &[Snippet]) -> Vec<Gap> {
    if snippets.is_empty() {
        return Vec::new();
    }
    let lowered = result.output.to_lowercase();
    let unused: Vec<&Snippet> = snippets
        .iter()
        .filter(|snippet| {
            let terms: Vec<String> = snippet
                .content
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .filter(|w| w.len() >= 5)
                .collect();
            !terms.is_empty() && !terms.iter().any(|term| lowered.contains(term.as_str()))
        })
        .collect();

    if unused.is_empty() {
        return Vec::new();
    }

    let fraction = unused.len() as f64 / snippets.len() as f64;
    vec![Gap {
        kind: GapKind::ContextCoverage,
        severity: (0.3 + 0.6 * fraction).min(0.9),
        description: format!(
            "{} of {} retrieved context snippets are not reflected in the output",
            unused.len(),
            snippets.len()
        ),
    }]
}

// ---------------------------------------------------------------------------
// Synergy
// ---------------------------------------------------------------------------

/// Synergy multiplier for one gap given every gap found this pass.
///
/// Pairs that are more valuable fixed together than separately multiply the
/// member gaps' scores. Multipliers compose; the final composite is clamped
/// to `[0, 1]` downstream, so the factor itself is uncapped.
fn synergy_factor(gap: &Gap, all: &[Gap]) -> f64 {
    let has = |predicate: &dyn Fn(&GapKind) -> bool| all.iter().any(|g| predicate(&g.kind));
    let technical = |kind: &GapKind| matches!(kind, GapKind::Dimension(d) if d == DIM_TECHNICAL);
    let content = |kind: &GapKind| matches!(kind, GapKind::Dimension(d) if d == DIM_CONTENT);

    let mut factor = 1.0;
    match &gap.kind {
        GapKind::Completeness => {
            // Low completeness plus low technical depth is a compound
            // deficiency: expanding without fixing depth wastes the pass.
            if has(&technical) {
                factor *= 1.25;
            }
            if has(&|k| *k == GapKind::ContextCoverage) {
                factor *= 1.15;
            }
        }
        GapKind::Dimension(d) if d == DIM_TECHNICAL => {
            if has(&|k| *k == GapKind::Completeness) {
                factor *= 1.25;
            }
            if has(&content) {
                factor *= 1.10;
            }
        }
        GapKind::Dimension(d) if d == DIM_CONTENT => {
            if has(&technical) {
                factor *= 1.10;
            }
        }
        GapKind::ContextCoverage => {
            if has(&|k| *k == GapKind::Completeness) {
                factor *= 1.15;
            }
        }
        _ => {}
    }
    factor
}

// ---------------------------------------------------------------------------
// Opportunity generation
// ---------------------------------------------------------------------------

/// Expand one gap into one or more opportunities using a strategy
/// appropriate to its category. Composite scores are recomputed by the
/// caller; the fields here are the raw estimates.
fn opportunities_for_gap(gap: &Gap) -> Vec<EnhancementOpportunity> {
    let severity = gap.severity.clamp(0.0, 1.0);
    let base = |category: OpportunityCategory, description: String, relevance: f64| {
        EnhancementOpportunity {
            category,
            description,
            estimated_impact: (0.35 + 0.55 * severity).min(1.0),
            complexity: (0.25 + 0.35 * severity).min(1.0),
            quality_potential: (0.30 + 0.55 * severity).min(1.0),
            context_relevance: relevance,
            composite_score: 0.0,
            source_gap: gap.description.clone(),
        }
    };

    match &gap.kind {
        GapKind::Completeness => {
            let mut out = vec![base(
                OpportunityCategory::ContentExpansion,
                "expand the output to cover the missing ground".to_string(),
                0.6,
            )];
            if severity > 0.6 {
                // Severely thin output usually also lacks shape.
                out.push(base(
                    OpportunityCategory::Structural,
                    "restructure the output around explicit sections".to_string(),
                    0.5,
                ));
            }
            out
        }
        GapKind::Verbosity => vec![base(
            OpportunityCategory::Optimization,
            "condense the output, removing repetition".to_string(),
            0.5,
        )],
        GapKind::Dimension(name) => {
            let (category, description) = category_for_dimension(name);
            vec![base(category, description, 0.5 + 0.3 * severity)]
        }
        GapKind::ContextCoverage => vec![base(
            OpportunityCategory::KnowledgeIntegration,
            "work the unused retrieved context into the output".to_string(),
            0.85,
        )],
        GapKind::Recurring(category) => vec![base(
            *category,
            format!("apply a {category} pass, which historically pays off here"),
            0.55,
        )],
    }
}

fn category_for_dimension(name: &str) -> (OpportunityCategory, String) {
    match name {
        DIM_TECHNICAL => (
            OpportunityCategory::ErrorCorrection,
            "harden the technically weak parts of the output".to_string(),
        ),
        "robustness" | "accuracy" => (
            OpportunityCategory::ErrorCorrection,
            format!("correct the deficiencies dragging down {name}"),
        ),
        "grounding" | "insight_novelty" => (
            OpportunityCategory::KnowledgeIntegration,
            format!("bring in supporting material to lift {name}"),
        ),
        "depth" | "insight_depth" | "completeness" => (
            OpportunityCategory::ContentExpansion,
            format!("deepen the output where {name} falls short"),
        ),
        "actionability" => (
            OpportunityCategory::Structural,
            "restructure findings into concrete, ordered recommendations".to_string(),
        ),
        _ => (
            OpportunityCategory::QualityImprovement,
            format!("raise the {name} of the existing output"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::QualityAssessment;
    use crate::domain::ports::{NullContextStore, NullPatternMemory, StaticContextStore};
    use std::collections::BTreeMap;

    fn assessment_with(dims: &[(&str, f64)]) -> QualityAssessment {
        let mut dimensions = BTreeMap::new();
        for (name, score) in dims {
            dimensions.insert((*name).to_string(), *score);
        }
        let overall =
            dimensions.values().sum::<f64>() / dimensions.len().max(1) as f64;
        QualityAssessment {
            overall,
            dimensions,
            delta: None,
            confidence: 0.9,
        }
    }

    fn discoverer() -> EnhancementDiscoverer {
        EnhancementDiscoverer::new(
            DiscoveryConfig::default(),
            OpportunityCategory::all().to_vec(),
            Arc::new(NullContextStore::new()),
            Arc::new(NullPatternMemory::new()),
        )
    }

    fn long_result() -> TaskResult {
        let body = "a thorough and complete result ".repeat(20);
        TaskResult::new(body, TaskType::Code)
    }

    #[tokio::test]
    async fn test_excellent_result_yields_no_opportunities() {
        let d = discoverer();
        let assessment = assessment_with(&[(DIM_CONTENT, 0.95), (DIM_TECHNICAL, 0.92)]);
        let opportunities = d.discover(&long_result(), &assessment).await;
        assert!(
            opportunities.is_empty(),
            "no gaps should mean no opportunities, got {opportunities:?}"
        );
    }

    #[tokio::test]
    async fn test_weak_dimension_produces_opportunity() {
        let d = discoverer();
        let assessment = assessment_with(&[(DIM_CONTENT, 0.9), (DIM_TECHNICAL, 0.3)]);
        let opportunities = d.discover(&long_result(), &assessment).await;
        assert!(!opportunities.is_empty());
        assert!(opportunities
            .iter()
            .any(|o| o.category == OpportunityCategory::ErrorCorrection));
    }

    #[tokio::test]
    async fn test_ordering_is_descending_composite() {
        let d = discoverer();
        let assessment = assessment_with(&[
            (DIM_CONTENT, 0.4),
            (DIM_TECHNICAL, 0.2),
            ("actionability", 0.5),
        ]);
        let result = TaskResult::new("short", TaskType::Analytics);
        let opportunities = d.discover(&result, &assessment).await;
        assert!(opportunities.len() >= 2);
        for pair in opportunities.windows(2) {
            assert!(
                pair[0].composite_score >= pair[1].composite_score,
                "opportunities out of order"
            );
        }
    }

    #[tokio::test]
    async fn test_all_scores_viable_and_bounded() {
        let d = discoverer();
        let assessment = assessment_with(&[(DIM_CONTENT, 0.1), (DIM_TECHNICAL, 0.1)]);
        let result = TaskResult::new("tiny TODO", TaskType::Code);
        let opportunities = d.discover(&result, &assessment).await;
        for o in &opportunities {
            assert!(o.composite_score >= 0.3, "below viability: {o:?}");
            assert!(o.composite_score <= 1.0, "above unit bound: {o:?}");
        }
    }

    #[tokio::test]
    async fn test_truncates_to_max() {
        let config = DiscoveryConfig {
            max_opportunities: 2,
            ..Default::default()
        };
        let d = EnhancementDiscoverer::new(
            config,
            OpportunityCategory::all().to_vec(),
            Arc::new(NullContextStore::new()),
            Arc::new(NullPatternMemory::new()),
        );
        let assessment = assessment_with(&[
            (DIM_CONTENT, 0.2),
            (DIM_TECHNICAL, 0.2),
            ("actionability", 0.3),
            ("depth", 0.3),
        ]);
        let result = TaskResult::new("tiny", TaskType::Analytics);
        let opportunities = d.discover(&result, &assessment).await;
        assert!(opportunities.len() <= 2);
    }

    #[tokio::test]
    async fn test_disabled_categories_are_filtered() {
        let d = EnhancementDiscoverer::new(
            DiscoveryConfig::default(),
            vec![OpportunityCategory::Optimization],
            Arc::new(NullContextStore::new()),
            Arc::new(NullPatternMemory::new()),
        );
        let assessment = assessment_with(&[(DIM_CONTENT, 0.2), (DIM_TECHNICAL, 0.2)]);
        let result = TaskResult::new("tiny", TaskType::Code);
        let opportunities = d.discover(&result, &assessment).await;
        assert!(opportunities
            .iter()
            .all(|o| o.category == OpportunityCategory::Optimization));
    }

    #[tokio::test]
    async fn test_unused_context_yields_knowledge_integration() {
        let snippets = vec![Snippet {
            content: "regional compliance constraints apply".into(),
            relevance: 0.9,
            source: None,
        }];
        let d = EnhancementDiscoverer::new(
            DiscoveryConfig::default(),
            OpportunityCategory::all().to_vec(),
            Arc::new(StaticContextStore::new(snippets)),
            Arc::new(NullPatternMemory::new()),
        );
        let assessment = assessment_with(&[(DIM_CONTENT, 0.9), (DIM_TECHNICAL, 0.9)]);
        let opportunities = d.discover(&long_result(), &assessment).await;
        assert!(opportunities
            .iter()
            .any(|o| o.category == OpportunityCategory::KnowledgeIntegration));
    }

    #[tokio::test]
    async fn test_synergy_raises_combined_gap_score() {
        // Same thin result; once with only a completeness gap, once with a
        // technical gap alongside. The completeness-driven opportunity must
        // score higher in the synergistic case.
        let d = discoverer();
        let result = TaskResult::new("tiny output", TaskType::Code);

        let solo = assessment_with(&[(DIM_CONTENT, 0.9), (DIM_TECHNICAL, 0.9)]);
        let solo_opps = d.discover(&result, &solo).await;
        let solo_expansion = solo_opps
            .iter()
            .find(|o| o.category == OpportunityCategory::ContentExpansion)
            .expect("thin output should yield a content expansion");

        let combined = assessment_with(&[(DIM_CONTENT, 0.9), (DIM_TECHNICAL, 0.3)]);
        let combined_opps = d.discover(&result, &combined).await;
        let combined_expansion = combined_opps
            .iter()
            .find(|o| o.category == OpportunityCategory::ContentExpansion)
            .expect("thin output should still yield a content expansion");

        assert!(
            combined_expansion.composite_score > solo_expansion.composite_score,
            "synergy should raise the combined score ({} vs {})",
            combined_expansion.composite_score,
            solo_expansion.composite_score
        );
    }

    #[test]
    fn test_synergy_factor_pairs() {
        let completeness = Gap {
            kind: GapKind::Completeness,
            severity: 0.5,
            description: "thin".into(),
        };
        let technical = Gap {
            kind: GapKind::Dimension(DIM_TECHNICAL.into()),
            severity: 0.5,
            description: "weak".into(),
        };
        let both = vec![completeness.clone(), technical.clone()];
        assert!(synergy_factor(&completeness, &both) > 1.0);
        assert!(synergy_factor(&technical, &both) > 1.0);
        let alone = vec![completeness.clone()];
        assert!((synergy_factor(&completeness, &alone) - 1.0).abs() < f64::EPSILON);
    }
}
