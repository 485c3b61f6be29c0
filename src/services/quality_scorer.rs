//! Quality scorer: multi-dimensional, deterministic assessment of a
//! candidate output against a task-type rubric.
//!
//! Scoring never fails for well-formed string input. Malformed input (code
//! that does not parse structurally) falls back to a heuristic-only path
//! with reduced confidence instead of raising. All analyzers are pure
//! string functions, so scoring the same `(candidate, previous, task type,
//! context)` tuple twice yields identical assessments.
//!
//! # Rubrics
//!
//! Each task type owns a closed rubric of weighted dimensions. Every rubric
//! includes `content_quality` and `technical_quality`; weights sum to 1.0.
//! Adding a task type means adding one rubric entry, never touching the
//! dispatch.
//!
//! | Task type    | Dimensions (weight)                                           |
//! |--------------|---------------------------------------------------------------|
//! | code         | technical_quality (0.60), content_quality (0.40)              |
//! | multimedia   | depth (.25), insight_novelty (.20), accuracy (.20), actionability (.15), content_quality (.10), technical_quality (.10) |
//! | document_qa  | grounding (.30), content_quality (.30), completeness (.25), technical_quality (.15) |
//! | automation   | technical_quality (.50), robustness (.30), content_quality (.20) |
//! | analytics    | insight_depth (.30), technical_quality (.25), actionability (.25), content_quality (.20) |

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::models::{QualityAssessment, TaskType, DIM_CONTENT, DIM_TECHNICAL};
use crate::domain::ports::Snippet;

/// Auxiliary context available to the scorer.
///
/// Both fields are optional in effect: with no reference and no snippets
/// the scorer degrades to intrinsic heuristics only.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// Reference material to check accuracy against, when available.
    pub reference: Option<String>,
    /// Retrieved context snippets, when retrieval is enabled.
    pub snippets: Vec<Snippet>,
}

/// One weighted dimension of a rubric.
struct DimensionSpec {
    name: &'static str,
    weight: f64,
}

const CODE_RUBRIC: &[DimensionSpec] = &[
    DimensionSpec { name: DIM_TECHNICAL, weight: 0.60 },
    DimensionSpec { name: DIM_CONTENT, weight: 0.40 },
];

const MULTIMEDIA_RUBRIC: &[DimensionSpec] = &[
    DimensionSpec { name: "depth", weight: 0.25 },
    DimensionSpec { name: "insight_novelty", weight: 0.20 },
    DimensionSpec { name: "accuracy", weight: 0.20 },
    DimensionSpec { name: "actionability", weight: 0.15 },
    DimensionSpec { name: DIM_CONTENT, weight: 0.10 },
    DimensionSpec { name: DIM_TECHNICAL, weight: 0.10 },
];

const DOCUMENT_QA_RUBRIC: &[DimensionSpec] = &[
    DimensionSpec { name: "grounding", weight: 0.30 },
    DimensionSpec { name: DIM_CONTENT, weight: 0.30 },
    DimensionSpec { name: "completeness", weight: 0.25 },
    DimensionSpec { name: DIM_TECHNICAL, weight: 0.15 },
];

const AUTOMATION_RUBRIC: &[DimensionSpec] = &[
    DimensionSpec { name: DIM_TECHNICAL, weight: 0.50 },
    DimensionSpec { name: "robustness", weight: 0.30 },
    DimensionSpec { name: DIM_CONTENT, weight: 0.20 },
];

const ANALYTICS_RUBRIC: &[DimensionSpec] = &[
    DimensionSpec { name: "insight_depth", weight: 0.30 },
    DimensionSpec { name: DIM_TECHNICAL, weight: 0.25 },
    DimensionSpec { name: "actionability", weight: 0.25 },
    DimensionSpec { name: DIM_CONTENT, weight: 0.20 },
];

fn rubric_for(task_type: TaskType) -> &'static [DimensionSpec] {
    match task_type {
        TaskType::Code => CODE_RUBRIC,
        TaskType::Multimedia => MULTIMEDIA_RUBRIC,
        TaskType::DocumentQa => DOCUMENT_QA_RUBRIC,
        TaskType::Automation => AUTOMATION_RUBRIC,
        TaskType::Analytics => ANALYTICS_RUBRIC,
    }
}

/// Deterministic multi-dimensional quality scorer.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score `candidate` against the rubric for `task_type`, reporting the
    /// improvement delta relative to `previous` when a baseline exists.
    ///
    /// Edge cases:
    /// - empty candidate → overall 0.0 with confidence 1.0
    /// - candidate identical to previous → delta exactly 0.0
    /// - structurally malformed code → heuristic-only path, confidence
    ///   reduced, never an error
    pub fn score(
        &self,
        candidate: &str,
        previous: Option<&str>,
        task_type: TaskType,
        context: &ScoringContext,
    ) -> QualityAssessment {
        let (dimensions, overall, confidence) = self.assess_one(candidate, task_type, context);

        let delta = previous.map(|prev| {
            let (_, prev_overall, _) = self.assess_one(prev, task_type, context);
            overall - prev_overall
        });

        debug!(
            task_type = %task_type,
            overall,
            ?delta,
            confidence,
            "scored candidate"
        );

        QualityAssessment {
            overall,
            dimensions,
            delta,
            confidence,
        }
    }

    /// Score a single output: per-dimension scores, weighted overall, and
    /// scorer confidence.
    fn assess_one(
        &self,
        output: &str,
        task_type: TaskType,
        context: &ScoringContext,
    ) -> (BTreeMap<String, f64>, f64, f64) {
        let rubric = rubric_for(task_type);

        // Empty output: certain it is empty and not worth continuing.
        if output.trim().is_empty() {
            let dimensions = rubric
                .iter()
                .map(|d| (d.name.to_string(), 0.0))
                .collect::<BTreeMap<_, _>>();
            return (dimensions, 0.0, 1.0);
        }

        let malformed = matches!(task_type, TaskType::Code | TaskType::Automation)
            && !is_structurally_balanced(output);

        let mut dimensions = BTreeMap::new();
        for spec in rubric {
            let score = self.dimension_score(spec.name, output, task_type, context, malformed);
            dimensions.insert(spec.name.to_string(), score.clamp(0.0, 1.0));
        }

        let overall = rubric
            .iter()
            .map(|spec| spec.weight * dimensions[spec.name])
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let confidence = if malformed {
            // Structural analysis is unavailable; only the heuristic path
            // contributed, so the score is much less certain.
            0.5
        } else if task_type == TaskType::DocumentQa && context.snippets.is_empty() {
            // Grounding cannot be checked without retrieved context.
            0.7
        } else {
            0.9
        };

        (dimensions, overall, confidence)
    }

    fn dimension_score(
        &self,
        dimension: &str,
        output: &str,
        task_type: TaskType,
        context: &ScoringContext,
        malformed: bool,
    ) -> f64 {
        match dimension {
            DIM_TECHNICAL => match task_type {
                TaskType::Code | TaskType::Automation => {
                    if malformed {
                        // Heuristic-only fallback: indentation regularity is
                        // the only structural signal still meaningful.
                        indentation_regularity(output) * 0.5
                    } else {
                        mean(&[
                            error_handling_score(output),
                            structure_score(output),
                            test_signal_score(output),
                        ])
                    }
                }
                _ => mean(&[clarity_score(output), structure_score(output)]),
            },
            DIM_CONTENT => match task_type {
                TaskType::Code | TaskType::Automation => {
                    mean(&[documentation_score(output), readability_score(output)])
                }
                _ => mean(&[depth_score(output), clarity_score(output)]),
            },
            "depth" | "insight_depth" => depth_score(output),
            "insight_novelty" => novelty_score(output),
            "accuracy" => context
                .reference
                .as_deref()
                .map_or(0.5, |reference| term_overlap(output, reference)),
            "actionability" => actionability_score(output),
            "grounding" => grounding_score(output, &context.snippets),
            "completeness" => completeness_score(output),
            "robustness" => mean(&[error_handling_score(output), completeness_score(output)]),
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Structural analyzers
// ---------------------------------------------------------------------------

/// Whether delimiters balance. Unbalanced output is scored on the
/// heuristic-only path rather than rejected.
fn is_structurally_balanced(output: &str) -> bool {
    let mut paren: i64 = 0;
    let mut brace: i64 = 0;
    let mut bracket: i64 = 0;
    for ch in output.chars() {
        match ch {
            '(' => paren += 1,
            ')' => paren -= 1,
            '{' => brace += 1,
            '}' => brace -= 1,
            '[' => bracket += 1,
            ']' => bracket -= 1,
            _ => {}
        }
        if paren < 0 || brace < 0 || bracket < 0 {
            return false;
        }
    }
    paren == 0 && brace == 0 && bracket == 0
}

/// Presence and density of error-handling constructs.
fn error_handling_score(output: &str) -> f64 {
    const SIGNALS: &[&str] = &[
        "Result<", ".map_err", "?;", "try ", "try:", "except", "catch", "rescue", "if err",
        "match ", "Err(", "raise ", "throw ",
    ];
    const PENALTIES: &[&str] = &[".unwrap()", ".expect(", "panic!("];

    let lines = non_empty_lines(output).max(1);
    let hits: usize = SIGNALS.iter().map(|s| output.matches(s).count()).sum();
    let penalties: usize = PENALTIES.iter().map(|s| output.matches(s).count()).sum();

    let density = hits as f64 / lines as f64;
    let penalty = penalties as f64 / lines as f64;
    ((density * 4.0).min(1.0) - penalty * 2.0).clamp(0.0, 1.0)
}

/// Nesting-depth proxy: deep indentation suggests tangled control flow.
fn structure_score(output: &str) -> f64 {
    let max_indent = output
        .lines()
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .max()
        .unwrap_or(0);
    // Indent of 16 spaces (~4 levels) is fine; beyond 32 is heavily nested.
    if max_indent <= 16 {
        1.0
    } else if max_indent >= 40 {
        0.2
    } else {
        1.0 - (max_indent - 16) as f64 / 30.0
    }
}

/// Presence of tests or assertions.
fn test_signal_score(output: &str) -> f64 {
    const SIGNALS: &[&str] = &["#[test]", "def test_", "it(", "describe(", "assert", "expect("];
    let hits = SIGNALS.iter().filter(|s| output.contains(**s)).count();
    match hits {
        0 => 0.2,
        1 => 0.6,
        _ => 1.0,
    }
}

/// Comment / docstring density, saturating at a modest ratio.
fn documentation_score(output: &str) -> f64 {
    let total = non_empty_lines(output).max(1);
    let doc_lines = output
        .lines()
        .map(str::trim_start)
        .filter(|line| {
            line.starts_with("///")
                || line.starts_with("//!")
                || line.starts_with("//")
                || line.starts_with('#') && !line.starts_with("#[")
                || line.starts_with("\"\"\"")
                || line.starts_with('*')
        })
        .count();
    let ratio = doc_lines as f64 / total as f64;
    // A ~20% comment ratio reads as well documented.
    (ratio / 0.2).min(1.0)
}

/// Line-length discipline as a readability proxy.
fn readability_score(output: &str) -> f64 {
    let total = non_empty_lines(output).max(1);
    let long_lines = output.lines().filter(|line| line.len() > 120).count();
    (1.0 - long_lines as f64 / total as f64).clamp(0.0, 1.0)
}

/// Indentation consistency, usable even on unparseable output.
fn indentation_regularity(output: &str) -> f64 {
    let indents: Vec<usize> = output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .collect();
    if indents.len() < 2 {
        return 0.5;
    }
    let irregular = indents.windows(2).filter(|w| w[1] > w[0] + 8).count();
    (1.0 - irregular as f64 / indents.len() as f64).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Prose analyzers
// ---------------------------------------------------------------------------

/// Substance proxy: word count saturating around 300 words.
fn depth_score(output: &str) -> f64 {
    let words = output.split_whitespace().count();
    (words as f64 / 300.0).min(1.0)
}

/// Average sentence length, ideal between 8 and 28 words.
fn clarity_score(output: &str) -> f64 {
    let sentences = output
        .split(['.', '!', '?', '\n'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let words = output.split_whitespace().count();
    let avg = words as f64 / sentences as f64;
    if (8.0..=28.0).contains(&avg) {
        1.0
    } else if avg < 8.0 {
        (avg / 8.0).clamp(0.1, 1.0)
    } else {
        (28.0 / avg).clamp(0.1, 1.0)
    }
}

/// Unique-word ratio as a novelty proxy.
fn novelty_score(output: &str) -> f64 {
    let words: Vec<String> = output
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: std::collections::BTreeSet<&String> = words.iter().collect();
    (unique.len() as f64 / words.len() as f64).clamp(0.0, 1.0)
}

/// Presence of structured, actionable guidance.
fn actionability_score(output: &str) -> f64 {
    let list_markers = output
        .lines()
        .map(str::trim_start)
        .filter(|line| {
            line.starts_with("- ")
                || line.starts_with("* ")
                || line.starts_with("1.")
                || line.starts_with("2.")
        })
        .count();
    const VERBS: &[&str] = &["recommend", "should", "use ", "apply", "consider", "next step"];
    let verb_hits = VERBS
        .iter()
        .filter(|v| output.to_lowercase().contains(**v))
        .count();
    ((list_markers as f64 * 0.15) + (verb_hits as f64 * 0.2)).min(1.0)
}

/// Fraction of retrieved snippets whose key terms appear in the output.
fn grounding_score(output: &str, snippets: &[Snippet]) -> f64 {
    if snippets.is_empty() {
        // No reference to ground against; neutral score, confidence drops
        // instead.
        return 0.5;
    }
    let lowered = output.to_lowercase();
    let grounded = snippets
        .iter()
        .filter(|snippet| {
            key_terms(&snippet.content)
                .iter()
                .any(|term| lowered.contains(term.as_str()))
        })
        .count();
    grounded as f64 / snippets.len() as f64
}

/// Penalize truncation markers and dangling endings.
fn completeness_score(output: &str) -> f64 {
    let mut score: f64 = 1.0;
    const TRUNCATION: &[&str] = &["TODO", "TBD", "FIXME", "..."];
    for marker in TRUNCATION {
        if output.contains(marker) {
            score -= 0.2;
        }
    }
    let trimmed = output.trim_end();
    if trimmed.ends_with(',') || trimmed.ends_with("and") || trimmed.ends_with(':') {
        score -= 0.3;
    }
    score.clamp(0.0, 1.0)
}

/// Jaccard-style term overlap between two texts.
fn term_overlap(a: &str, b: &str) -> f64 {
    let terms_a = key_terms(a);
    let terms_b = key_terms(b);
    if terms_a.is_empty() || terms_b.is_empty() {
        return 0.5;
    }
    let set_a: std::collections::BTreeSet<&String> = terms_a.iter().collect();
    let set_b: std::collections::BTreeSet<&String> = terms_b.iter().collect();
    let shared = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count().max(1);
    shared as f64 / union as f64
}

/// Lowercased words of 5+ characters: a cheap key-term extraction.
fn key_terms(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() >= 5)
        .collect()
}

fn non_empty_lines(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
