//! Progress events emitted by the orchestrator.
//!
//! One event is broadcast after every state transition. Delivery is
//! fire-and-forget over a bounded broadcast channel: losing an event never
//! affects loop correctness, and emission never blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::SessionState;

/// A single progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// The session that transitioned.
    pub session_id: Uuid,
    /// The state just entered.
    pub state: SessionState,
    /// Iteration counter at transition time.
    pub iteration: u32,
    /// Overall quality of the current result, once assessed.
    pub current_quality: Option<f64>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    /// Build an event for the given session state.
    pub fn transition(
        session_id: Uuid,
        state: SessionState,
        iteration: u32,
        current_quality: Option<f64>,
    ) -> Self {
        Self {
            session_id,
            state,
            iteration,
            current_quality,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_roundtrip() {
        let event = SessionEvent::transition(Uuid::new_v4(), SessionState::Assessing, 3, Some(0.7));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, event.session_id);
        assert_eq!(parsed.state, SessionState::Assessing);
        assert_eq!(parsed.iteration, 3);
        assert_eq!(parsed.current_quality, Some(0.7));
    }
}
