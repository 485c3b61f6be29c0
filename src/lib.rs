//! Continuum - Autonomous Continuation Engine
//!
//! Continuum takes an initial AI-generated task result and iteratively
//! improves it: discover enhancement opportunities, select the best one
//! under resource and safety constraints, invoke a generation provider,
//! validate the quality delta, and decide whether to continue -- all behind
//! a circuit-breaker protected safety gate.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): pure models, error taxonomy, and port
//!   traits for the external collaborators (generation, context retrieval,
//!   pattern memory)
//! - **Service Layer** (`services`): the quality scorer, enhancement
//!   discoverer, safety gate, decision engine, continuation orchestrator,
//!   and the session control surface
//! - **Infrastructure Layer** (`infrastructure`): configuration loading,
//!   logging setup, deterministic generator adapters
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use continuum::domain::models::{ContinuationConfig, TaskResult, TaskType};
//! use continuum::domain::ports::{InMemoryPatternMemory, NullContextStore};
//! use continuum::infrastructure::DemoGenerator;
//! use continuum::services::SessionManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = SessionManager::new(
//!         ContinuationConfig::default(),
//!         Arc::new(DemoGenerator::new()),
//!         None,
//!         Arc::new(NullContextStore::new()),
//!         Arc::new(InMemoryPatternMemory::new()),
//!     );
//!     let id = manager.start(TaskResult::new("print('hi')", TaskType::Code)).await;
//!     let result = manager.wait(id).await?;
//!     println!("terminated: {}", result.termination);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{ProviderError, ProviderErrorKind, SessionError};
pub use domain::models::{
    ConsolidatedResult, ContinuationConfig, ContinuationSession, EnhancementOpportunity,
    QualityAssessment, SafetyDecision, SessionEvent, SessionState, TaskResult, TaskType,
    Termination,
};
pub use domain::ports::{ContextStore, Generator, PatternMemory};
pub use infrastructure::{ConfigError, ConfigLoader, DemoGenerator, ScriptedGenerator};
pub use services::{
    CallRateLimiter, ContinuationOrchestrator, DecisionEngine, EnhancementDiscoverer,
    QualityScorer, SafetyGate, SessionManager,
};
