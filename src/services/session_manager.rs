//! Session manager: the control surface over concurrent continuation
//! sessions.
//!
//! `start` spawns one tokio task per session; sessions are fully isolated
//! (own state, own safety gate) except for the process-wide generation-call
//! limiter, which is shared deliberately. `request_stop` flips a flag the
//! orchestrator checks at every iteration boundary. After a session reaches
//! a terminal state, a compact pattern record is appended to the injected
//! pattern bank, off the critical path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::error::SessionError;
use crate::domain::models::{
    ConsolidatedResult, ContinuationConfig, ContinuationSession, IterationOutcome, SessionEvent,
    TaskResult,
};
use crate::domain::ports::{ContextStore, Generator, PatternMemory, SessionPattern};
use crate::services::orchestrator::ContinuationOrchestrator;
use crate::services::safety_gate::CallRateLimiter;

/// Per-session bookkeeping.
struct SessionHandle {
    stop_flag: Arc<AtomicBool>,
    session: Arc<RwLock<ContinuationSession>>,
    outcome: Arc<RwLock<Option<Result<ConsolidatedResult, String>>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

/// Control surface over continuation sessions.
pub struct SessionManager {
    config: ContinuationConfig,
    primary: Arc<dyn Generator>,
    fallback: Option<Arc<dyn Generator>>,
    context_store: Arc<dyn ContextStore>,
    patterns: Arc<dyn PatternMemory>,
    limiter: Arc<CallRateLimiter>,
    events: broadcast::Sender<SessionEvent>,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionManager {
    /// Build a manager. All sessions it starts share the configured
    /// defaults, the providers, and one call-rate limiter.
    pub fn new(
        config: ContinuationConfig,
        primary: Arc<dyn Generator>,
        fallback: Option<Arc<dyn Generator>>,
        context_store: Arc<dyn ContextStore>,
        patterns: Arc<dyn PatternMemory>,
    ) -> Self {
        let limiter = Arc::new(CallRateLimiter::new(
            config.effective_safety().max_calls_per_hour,
        ));
        let (events, _) = broadcast::channel(256);
        Self {
            config,
            primary,
            fallback,
            context_store,
            patterns,
            limiter,
            events,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to progress events from every session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start a continuation session over an initial result using the
    /// manager's configured defaults. Returns the session id immediately;
    /// the loop runs in a spawned task.
    pub async fn start(&self, initial: TaskResult) -> Uuid {
        self.start_with_config(initial, self.config.clone()).await
    }

    /// Start a session with a per-session configuration override. The
    /// process-wide call limiter is shared regardless of the override.
    pub async fn start_with_config(
        &self,
        initial: TaskResult,
        config: ContinuationConfig,
    ) -> Uuid {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut orchestrator = ContinuationOrchestrator::new(
            config,
            initial,
            Arc::clone(&self.primary),
            self.fallback.clone(),
            Arc::clone(&self.context_store),
            Arc::clone(&self.patterns),
            Arc::clone(&self.limiter),
            self.events.clone(),
            Arc::clone(&stop_flag),
        );

        let session = orchestrator.session_handle();
        let session_id = session.read().await.id;
        let outcome: Arc<RwLock<Option<Result<ConsolidatedResult, String>>>> =
            Arc::new(RwLock::new(None));

        let task_outcome = Arc::clone(&outcome);
        let patterns = Arc::clone(&self.patterns);
        let join = tokio::spawn(async move {
            match orchestrator.run().await {
                Ok(consolidated) => {
                    append_pattern(&*patterns, &consolidated).await;
                    *task_outcome.write().await = Some(Ok(consolidated));
                }
                Err(error) => {
                    warn!(session_id = %session_id, error = %error, "session failed");
                    *task_outcome.write().await = Some(Err(error.to_string()));
                }
            }
        });

        self.sessions.write().await.insert(
            session_id,
            SessionHandle {
                stop_flag,
                session,
                outcome,
                join: Mutex::new(Some(join)),
            },
        );

        info!(session_id = %session_id, "session started");
        session_id
    }

    /// Request a stop. Takes effect within one iteration boundary: any
    /// in-flight generation call completes, but no new one starts.
    pub async fn request_stop(&self, session_id: Uuid) -> Result<(), SessionError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        handle.stop_flag.store(true, Ordering::SeqCst);
        info!(session_id = %session_id, "stop requested");
        Ok(())
    }

    /// Snapshot of the session's current state.
    pub async fn status(&self, session_id: Uuid) -> Result<ContinuationSession, SessionError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        let snapshot = handle.session.read().await.clone();
        Ok(snapshot)
    }

    /// The consolidated result, once the session is terminal.
    pub async fn final_result(
        &self,
        session_id: Uuid,
    ) -> Result<ConsolidatedResult, SessionError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        let outcome = handle.outcome.read().await;
        match outcome.as_ref() {
            Some(Ok(consolidated)) => Ok(consolidated.clone()),
            Some(Err(message)) => Err(SessionError::Inconsistency(message.clone())),
            None => Err(SessionError::NotTerminal(session_id)),
        }
    }

    /// Wait for a session's task to finish and return its final result.
    pub async fn wait(&self, session_id: Uuid) -> Result<ConsolidatedResult, SessionError> {
        let join = {
            let sessions = self.sessions.read().await;
            let handle = sessions
                .get(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            let join = handle.join.lock().await.take();
            join
        };
        if let Some(join) = join {
            if let Err(error) = join.await {
                return Err(SessionError::Inconsistency(format!(
                    "session task panicked: {error}"
                )));
            }
        }
        self.final_result(session_id).await
    }

    /// Stop every session and wait for their tasks to drain.
    pub async fn shutdown_all(&self) {
        let joins: Vec<JoinHandle<()>> = {
            let sessions = self.sessions.read().await;
            let mut joins = Vec::new();
            for handle in sessions.values() {
                handle.stop_flag.store(true, Ordering::SeqCst);
                if let Some(join) = handle.join.lock().await.take() {
                    joins.push(join);
                }
            }
            joins
        };
        for result in join_all(joins).await {
            if let Err(error) = result {
                warn!(error = %error, "session task failed during shutdown");
            }
        }
    }

    /// Ids of every registered session.
    pub async fn session_ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }
}

/// Append a compact learning record for a completed session. Failures are
/// logged and swallowed: the pattern bank is strictly off the critical
/// path.
async fn append_pattern(patterns: &dyn PatternMemory, consolidated: &ConsolidatedResult) {
    let accepted_categories: Vec<_> = consolidated
        .history
        .iter()
        .filter(|entry| matches!(entry.outcome, IterationOutcome::Applied { .. }))
        .map(|entry| entry.opportunity.category)
        .collect();
    let net_improvement = consolidated
        .history
        .iter()
        .filter_map(|entry| match entry.outcome {
            IterationOutcome::Applied { delta } => Some(delta),
            _ => None,
        })
        .sum();

    let record = SessionPattern {
        task_type: consolidated.result.task_type,
        iterations: consolidated.iterations,
        accepted_categories,
        net_improvement,
        completed_at: Utc::now(),
    };
    if let Err(error) = patterns.append(record).await {
        warn!(error = %error, "failed to append session pattern");
    }
}
