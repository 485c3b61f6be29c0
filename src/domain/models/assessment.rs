//! Quality assessments produced by the quality scorer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimension present in every rubric regardless of task type.
pub const DIM_CONTENT: &str = "content_quality";
/// Dimension present in every rubric regardless of task type.
pub const DIM_TECHNICAL: &str = "technical_quality";

/// Multi-dimensional quality score for one candidate output.
///
/// The overall score is a weighted aggregate of the per-dimension scores;
/// weights belong to the task-type rubric, not to this struct. Dimensions
/// are kept in a `BTreeMap` so iteration and serialization order are
/// deterministic -- scoring the same input twice must yield byte-identical
/// assessments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Weighted aggregate score, `[0, 1]`.
    pub overall: f64,
    /// Per-dimension scores, `[0, 1]` each. Always contains
    /// [`DIM_CONTENT`] and [`DIM_TECHNICAL`].
    pub dimensions: BTreeMap<String, f64>,
    /// `overall(candidate) − overall(previous)`. `None` on the first
    /// iteration, when no baseline exists.
    pub delta: Option<f64>,
    /// Scorer confidence, `[0, 1]`. Lowered when the scorer had to fall
    /// back to heuristic-only scoring.
    pub confidence: f64,
}

impl QualityAssessment {
    /// Whether this assessment represents a regression beyond `tolerance`.
    ///
    /// With no baseline there is nothing to regress from.
    pub fn is_regression(&self, tolerance: f64) -> bool {
        self.delta.is_some_and(|d| d < -tolerance)
    }

    /// Dimension score, or 0.0 when the rubric did not produce it.
    pub fn dimension(&self, name: &str) -> f64 {
        self.dimensions.get(name).copied().unwrap_or(0.0)
    }

    /// Verify the `[0, 1]` bounds invariant on the overall score, every
    /// dimension, and confidence.
    pub fn is_bounded(&self) -> bool {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        unit(self.overall)
            && unit(self.confidence)
            && self.dimensions.values().all(|v| unit(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(overall: f64, delta: Option<f64>) -> QualityAssessment {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(DIM_CONTENT.to_string(), overall);
        dimensions.insert(DIM_TECHNICAL.to_string(), overall);
        QualityAssessment {
            overall,
            dimensions,
            delta,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_regression_detection() {
        assert!(assessment(0.4, Some(-0.10)).is_regression(0.05));
        assert!(!assessment(0.4, Some(-0.03)).is_regression(0.05));
        assert!(!assessment(0.4, Some(0.10)).is_regression(0.05));
    }

    #[test]
    fn test_no_baseline_is_never_a_regression() {
        assert!(!assessment(0.0, None).is_regression(0.05));
    }

    #[test]
    fn test_exact_tolerance_is_not_a_regression() {
        // The tolerance is exclusive: delta must be strictly below −0.05.
        assert!(!assessment(0.5, Some(-0.05)).is_regression(0.05));
    }

    #[test]
    fn test_bounds_check() {
        assert!(assessment(1.0, None).is_bounded());
        let mut bad = assessment(0.5, None);
        bad.dimensions.insert("depth".into(), 1.2);
        assert!(!bad.is_bounded());
    }

    #[test]
    fn test_serde_roundtrip_preserves_dimensions() {
        let original = assessment(0.72, Some(0.12));
        let json = serde_json::to_string(&original).unwrap();
        let parsed: QualityAssessment = serde_json::from_str(&json).unwrap();
        assert!((parsed.overall - 0.72).abs() < f64::EPSILON);
        assert_eq!(parsed.delta, Some(0.12));
        assert_eq!(parsed.dimensions.len(), 2);
    }
}
