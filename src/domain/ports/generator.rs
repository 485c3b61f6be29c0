//! Port trait for the external generation capability.
//!
//! The engine treats hosted and local model backends as a single
//! capability: `generate(prompt, parameters) → text`, failing with a
//! [`ProviderError`]. Concrete clients live outside this crate; the
//! orchestrator only decides *when* to call and how to react to failure
//! (one fallback attempt, auth failures fatal).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::ProviderError;
use crate::domain::models::TaskType;

/// Marker separating the instruction preamble from the current payload in
/// enhancement prompts. Adapters that post-process the payload (the demo
/// generator, test doubles) locate it with this marker.
pub const CURRENT_OUTPUT_MARKER: &str = "CURRENT OUTPUT:\n";

/// Parameters for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature, `[0.0, 1.0]`.
    pub temperature: f64,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Task type, so the provider can route to an appropriate model.
    pub task_type: TaskType,
}

impl GenerationParams {
    /// Conservative defaults for enhancement generation.
    pub fn for_task(task_type: TaskType) -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 4096,
            task_type,
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The assembled prompt.
    pub prompt: String,
    /// Generation parameters.
    pub params: GenerationParams,
}

/// Port trait for a generation provider.
///
/// Implementations must be `Send + Sync`; the orchestrator holds providers
/// behind `Arc<dyn Generator>` and awaits at most one call at a time per
/// session (the loop's sole suspension point).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short provider name used in error reports and audit history.
    fn name(&self) -> &str;

    /// Produce text for the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] classifying the failure. Every kind is
    /// retryable against the fallback provider except
    /// [`Auth`](crate::domain::error::ProviderErrorKind::Auth).
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}
