//! Service layer: the five core components of the continuation engine plus
//! the session control surface.

pub mod decision_engine;
pub mod discoverer;
pub mod orchestrator;
pub mod quality_scorer;
pub mod safety_gate;
pub mod session_manager;

pub use decision_engine::{Decision, DecisionEngine, SessionView};
pub use discoverer::EnhancementDiscoverer;
pub use orchestrator::ContinuationOrchestrator;
pub use quality_scorer::{QualityScorer, ScoringContext};
pub use safety_gate::{scan_content, CallRateLimiter, SafetyGate};
pub use session_manager::SessionManager;
