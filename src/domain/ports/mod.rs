//! Port trait definitions (Hexagonal Architecture).
//!
//! These async traits are the contracts between the continuation engine and
//! its out-of-scope collaborators:
//!
//! - [`Generator`]: the external generation capability (hosted or local)
//! - [`ContextStore`]: optional vector-memory retrieval
//! - [`PatternMemory`]: the cross-session learning bank
//!
//! Null implementations are provided for every optional collaborator so the
//! engine operates, degraded, without them.

pub mod context_store;
pub mod generator;
pub mod pattern_memory;

pub use context_store::{ContextStore, NullContextStore, Snippet, StaticContextStore};
pub use generator::{
    GenerationParams, GenerationRequest, Generator, CURRENT_OUTPUT_MARKER,
};
pub use pattern_memory::{
    InMemoryPatternMemory, NullPatternMemory, PatternMemory, SessionPattern,
};
