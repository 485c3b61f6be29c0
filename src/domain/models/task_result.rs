//! Task results: the atomic unit of work output.
//!
//! A [`TaskResult`] is produced by the external generation capability and is
//! read-only once created. Each enhancement iteration *supersedes* the
//! previous result with a new value rather than mutating it, so the session
//! history always refers to immutable snapshots.

use serde::{Deserialize, Serialize};

/// Closed set of task types the engine understands.
///
/// Adding a task type means adding one variant here plus one rubric entry in
/// the quality scorer; dispatch logic never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Source code generation or modification.
    Code,
    /// Image/audio/video analysis output.
    Multimedia,
    /// Retrieval-augmented document question answering.
    DocumentQa,
    /// Automation scripting output.
    Automation,
    /// Data analytics narrative or findings.
    Analytics,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Multimedia => "multimedia",
            Self::DocumentQa => "document_qa",
            Self::Automation => "automation",
            Self::Analytics => "analytics",
        }
    }

    /// All known task types, in declaration order.
    pub fn all() -> [TaskType; 5] {
        [
            Self::Code,
            Self::Multimedia,
            Self::DocumentQa,
            Self::Automation,
            Self::Analytics,
        ]
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "multimedia" => Ok(Self::Multimedia),
            "document_qa" => Ok(Self::DocumentQa),
            "automation" => Ok(Self::Automation),
            "analytics" => Ok(Self::Analytics),
            other => Err(format!(
                "unknown task type `{other}` (expected one of: code, multimedia, document_qa, automation, analytics)"
            )),
        }
    }
}

/// Reference to an artifact produced alongside a result (a file written, an
/// image rendered). The engine never dereferences these; they ride along for
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Display name of the artifact.
    pub name: String,
    /// Opaque locator (path, URL, object id) meaningful to the caller.
    pub location: String,
}

/// The atomic unit of work output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the producing step considered itself successful.
    pub success: bool,
    /// Textual or structured payload.
    pub output: String,
    /// Task-type tag selecting the scoring rubric.
    pub task_type: TaskType,
    /// Artifacts generated alongside the payload.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
    /// Ordered descriptions of the steps that produced this result.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Iteration number within the session. Monotonically non-decreasing.
    #[serde(default)]
    pub iteration: u32,
}

impl TaskResult {
    /// Create an initial (iteration 0) result.
    pub fn new(output: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            success: true,
            output: output.into(),
            task_type,
            artifacts: Vec::new(),
            steps: Vec::new(),
            iteration: 0,
        }
    }

    /// Attach an artifact reference.
    pub fn with_artifact(mut self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.artifacts.push(ArtifactRef {
            name: name.into(),
            location: location.into(),
        });
        self
    }

    /// Append a step description.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Produce the successor result for a later iteration.
    ///
    /// Artifacts and steps carry forward; the payload is replaced and a new
    /// step describing the enhancement is appended. `self` is untouched.
    pub fn superseded_by(
        &self,
        output: impl Into<String>,
        step: impl Into<String>,
        iteration: u32,
    ) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step.into());
        Self {
            success: true,
            output: output.into(),
            task_type: self.task_type,
            artifacts: self.artifacts.clone(),
            steps,
            iteration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_at_iteration_zero() {
        let result = TaskResult::new("print('hi')", TaskType::Code);
        assert_eq!(result.iteration, 0);
        assert!(result.success);
        assert!(result.artifacts.is_empty());
    }

    #[test]
    fn test_superseded_by_preserves_original() {
        let original = TaskResult::new("v1", TaskType::Code).with_step("generate");
        let next = original.superseded_by("v2", "add docs", 1);

        assert_eq!(original.output, "v1");
        assert_eq!(original.iteration, 0);
        assert_eq!(next.output, "v2");
        assert_eq!(next.iteration, 1);
        assert_eq!(next.steps, vec!["generate".to_string(), "add docs".to_string()]);
    }

    #[test]
    fn test_task_type_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskType::DocumentQa).unwrap(),
            "\"document_qa\""
        );
        let parsed: TaskType = serde_json::from_str("\"analytics\"").unwrap();
        assert_eq!(parsed, TaskType::Analytics);
    }

    #[test]
    fn test_result_serde_roundtrip() {
        let result = TaskResult::new("body", TaskType::Multimedia)
            .with_artifact("frame", "/tmp/frame.png")
            .with_step("analyze");
        let json = serde_json::to_string(&result).unwrap();
        let parsed: TaskResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.output, "body");
        assert_eq!(parsed.task_type, TaskType::Multimedia);
        assert_eq!(parsed.artifacts.len(), 1);
        assert_eq!(parsed.steps, vec!["analyze".to_string()]);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"success":true,"output":"x","task_type":"code"}"#;
        let parsed: TaskResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.iteration, 0);
        assert!(parsed.steps.is_empty());
    }
}
