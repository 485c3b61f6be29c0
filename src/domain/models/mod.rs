//! Domain models for the continuation engine.

pub mod assessment;
pub mod config;
pub mod events;
pub mod opportunity;
pub mod safety;
pub mod session;
pub mod task_result;

pub use assessment::{QualityAssessment, DIM_CONTENT, DIM_TECHNICAL};
pub use config::{
    ContinuationConfig, DecisionWeights, DiscoveryConfig, LoggingConfig, Mode, SafetyConfig,
    SafetyLevel,
};
pub use events::SessionEvent;
pub use opportunity::{CompositeWeights, EnhancementOpportunity, OpportunityCategory};
pub use safety::{
    BreakerState, ContentFinding, ExecutionDecision, ExecutionSnapshot, FindingSeverity,
    ImmediateAction, ResourceKind, SafetyDecision, TripCause,
};
pub use session::{
    CategoryStats, ConsolidatedResult, ContinuationSession, HistoryEntry, IterationOutcome,
    SessionState, StopReason, Termination,
};
pub use task_result::{ArtifactRef, TaskResult, TaskType};
