use thiserror::Error;
use uuid::Uuid;

/// Failure kinds reported by a generation provider.
///
/// Every kind is treated identically for retry/fallback purposes except
/// [`Auth`](ProviderErrorKind::Auth), which is non-retryable and surfaces
/// immediately as a session error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The provider did not respond within its deadline.
    Timeout,
    /// Authentication or authorization failed. Never retried.
    Auth,
    /// The provider rejected the call due to rate limiting.
    RateLimited,
    /// The provider is unreachable or returned a server-side failure.
    Unavailable,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a generation provider.
#[derive(Debug, Clone, Error)]
#[error("provider `{provider}` failed ({kind}): {message}")]
pub struct ProviderError {
    /// Name of the provider that failed.
    pub provider: String,
    /// Failure classification.
    pub kind: ProviderErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Whether a fallback attempt is permitted after this failure.
    ///
    /// Auth failures are fatal: retrying with another credentialed call
    /// would only repeat the rejection.
    pub fn is_retryable(&self) -> bool {
        self.kind != ProviderErrorKind::Auth
    }
}

/// Session-level errors surfaced to the caller.
///
/// The continuation loop converts almost every failure into a well-formed
/// terminal result. The only errors that propagate as `Err` are invariant
/// violations (implementation bugs) and control-surface misuse (unknown
/// session id, premature final-result lookup).
#[derive(Debug, Error)]
pub enum SessionError {
    /// An internal invariant was violated. Indicates a bug, not a runtime
    /// condition to recover from.
    #[error("internal inconsistency: {0}")]
    Inconsistency(String),

    /// No session with the given id is registered.
    #[error("session not found: {0}")]
    NotFound(Uuid),

    /// The session exists but has not reached a terminal state yet.
    #[error("session {0} has not reached a terminal state")]
    NotTerminal(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_is_not_retryable() {
        let err = ProviderError::new("hosted", ProviderErrorKind::Auth, "bad key");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_other_kinds_are_retryable() {
        for kind in [
            ProviderErrorKind::Timeout,
            ProviderErrorKind::RateLimited,
            ProviderErrorKind::Unavailable,
        ] {
            let err = ProviderError::new("hosted", kind, "transient");
            assert!(err.is_retryable(), "{kind} should be retryable");
        }
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("local", ProviderErrorKind::Timeout, "no response in 30s");
        let text = err.to_string();
        assert!(text.contains("local"));
        assert!(text.contains("timeout"));
        assert!(text.contains("no response in 30s"));
    }

    #[test]
    fn test_kind_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProviderErrorKind::RateLimited).unwrap(),
            "\"rate_limited\""
        );
    }
}
