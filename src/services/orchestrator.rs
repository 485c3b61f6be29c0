//! Continuation orchestrator: the top-level state-machine loop.
//!
//! `INIT → ASSESSING → SELECTING → GENERATING → VALIDATING → (loop to
//! ASSESSING) | STOPPED | SAFETY_HALTED | ERROR`
//!
//! The orchestrator exclusively owns its [`ContinuationSession`]; every
//! other component receives read-only projections. One progress event is
//! broadcast after every state transition, fire-and-forget.
//!
//! Failure semantics:
//! - provider failure retries once against the fallback provider; `auth`
//!   failures and dual failures terminate in `Error` (the iteration still
//!   counts toward the ceiling, preventing infinite retry loops)
//! - a candidate whose quality delta regresses beyond the configured
//!   tolerance is discarded, the previous result kept, and the loop
//!   continues -- self-correcting, not fatal
//! - terminal states consolidate the *best* result seen across the
//!   session, not necessarily the last one
//!
//! A caller-requested stop is honored at the top of every loop pass: any
//! in-flight generation completes, no new one starts, and the observable
//! result reflects the last fully validated iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::error::{ProviderError, ProviderErrorKind, SessionError};
use crate::domain::models::{
    ContinuationConfig, ContinuationSession, EnhancementOpportunity, ExecutionSnapshot,
    HistoryEntry, ImmediateAction, IterationOutcome, QualityAssessment, ResourceKind,
    SessionEvent, SessionState, StopReason, TaskResult, Termination, TripCause,
};
use crate::domain::ports::{
    ContextStore, GenerationParams, GenerationRequest, Generator, PatternMemory,
    CURRENT_OUTPUT_MARKER,
};
use crate::services::decision_engine::{DecisionEngine, SessionView};
use crate::services::discoverer::EnhancementDiscoverer;
use crate::services::quality_scorer::{QualityScorer, ScoringContext};
use crate::services::safety_gate::{CallRateLimiter, SafetyGate};

/// Drives one continuation session from an initial result to a terminal
/// state.
pub struct ContinuationOrchestrator {
    config: ContinuationConfig,
    scorer: QualityScorer,
    discoverer: EnhancementDiscoverer,
    engine: DecisionEngine,
    gate: SafetyGate,
    primary: Arc<dyn Generator>,
    fallback: Option<Arc<dyn Generator>>,
    session: Arc<RwLock<ContinuationSession>>,
    events: broadcast::Sender<SessionEvent>,
    stop_flag: Arc<AtomicBool>,
}

impl ContinuationOrchestrator {
    /// Assemble an orchestrator and its session around an initial result.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ContinuationConfig,
        initial: TaskResult,
        primary: Arc<dyn Generator>,
        fallback: Option<Arc<dyn Generator>>,
        context_store: Arc<dyn ContextStore>,
        patterns: Arc<dyn PatternMemory>,
        limiter: Arc<CallRateLimiter>,
        events: broadcast::Sender<SessionEvent>,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        let session = ContinuationSession::new(
            initial,
            config.max_iterations,
            config.max_duration_seconds,
            config.autonomous,
        );
        let gate = SafetyGate::new(
            config.effective_safety(),
            config.safety_level,
            config.max_iterations,
            config.max_duration_seconds,
            limiter,
        );
        let discoverer = EnhancementDiscoverer::new(
            config.discovery.clone(),
            config.enabled_categories.clone(),
            context_store,
            patterns,
        );
        let engine = DecisionEngine::new(config.decision.clone(), config.quality_threshold);

        Self {
            scorer: QualityScorer::new(),
            discoverer,
            engine,
            gate,
            primary,
            fallback,
            session: Arc::new(RwLock::new(session)),
            events,
            stop_flag,
            config,
        }
    }

    /// Shared handle to the session, for status snapshots. The
    /// orchestrator remains the sole writer.
    pub fn session_handle(&self) -> Arc<RwLock<ContinuationSession>> {
        Arc::clone(&self.session)
    }

    /// Run the loop to a terminal state.
    ///
    /// # Errors
    ///
    /// Only [`SessionError::Inconsistency`] propagates as `Err`; every
    /// other failure mode terminates in a well-formed
    /// [`ConsolidatedResult`](crate::domain::models::ConsolidatedResult).
    pub async fn run(
        &mut self,
    ) -> Result<crate::domain::models::ConsolidatedResult, SessionError> {
        let session_id = self.session.read().await.id;
        info!(session_id = %session_id, "continuation session starting");
        self.transition(SessionState::Init).await;

        loop {
            // Cancellation is honored at the top of every pass: no new
            // generation starts once a stop is requested.
            if self.stop_flag.load(Ordering::SeqCst) {
                return self
                    .finish(Termination::Stopped {
                        reason: StopReason::UserRequested,
                    })
                    .await;
            }

            // --- ASSESSING ---
            self.transition(SessionState::Assessing).await;
            let (current, task_type) = {
                let session = self.session.read().await;
                (session.current.clone(), session.current.task_type)
            };
            let baseline =
                self.scorer
                    .score(&current.output, None, task_type, &ScoringContext::default());
            self.check_bounded(&baseline)?;
            {
                let mut session = self.session.write().await;
                session.current_score = Some(baseline.overall);
                let current_clone = session.current.clone();
                session.consider_best(&current_clone, baseline.overall);
            }

            let opportunities = self.discoverer.discover(&current, &baseline).await;

            // --- SELECTING ---
            self.transition(SessionState::Selecting).await;
            let (clearance, pre_trip) = {
                let session = self.session.read().await;
                let pre_trip = self.gate.last_trip().cloned();
                (self.gate.validate_plan(&opportunities, &session), pre_trip)
            };
            if !clearance.allow {
                debug!(reason = %clearance.reason, "plan denied by safety gate");
                let termination = self.classify_denial(&clearance.reason, pre_trip);
                return self.finish(termination).await;
            }

            let decision = {
                let session = self.session.read().await;
                let view = SessionView::of(&session, self.config.mode);
                self.engine.decide(&opportunities, &view, &clearance)
            };
            if !decision.continue_run {
                let reason = self.classify_stop(&opportunities, &decision.reasoning).await;
                return self
                    .finish(Termination::Stopped { reason })
                    .await;
            }
            let opportunity = decision
                .selected
                .ok_or_else(|| {
                    SessionError::Inconsistency(
                        "decision engine continued without a selection".to_string(),
                    )
                })?;

            // --- GENERATING ---
            self.transition(SessionState::Generating).await;
            let iteration_started = Instant::now();
            let candidate = match self.generate(&opportunity, &current).await {
                Ok(candidate) => candidate,
                Err(error) => {
                    // The failed iteration still counts toward the ceiling.
                    let duration_ms = iteration_started.elapsed().as_millis() as u64;
                    self.record(
                        opportunity,
                        None,
                        IterationOutcome::Failed {
                            reason: error.clone(),
                        },
                        None,
                        duration_ms,
                    )
                    .await;
                    self.gate.record_iteration(false, duration_ms, None);
                    return self.finish(Termination::Error { error }).await;
                }
            };

            // --- VALIDATING ---
            self.transition(SessionState::Validating).await;
            let assessment = self.scorer.score(
                &candidate,
                Some(&current.output),
                task_type,
                &ScoringContext::default(),
            );
            self.check_bounded(&assessment)?;
            let duration_ms = iteration_started.elapsed().as_millis() as u64;
            let (iteration_now, elapsed_ms) = {
                let session = self.session.read().await;
                (session.iteration, session.elapsed_ms())
            };

            let monitor = self.gate.monitor(&ExecutionSnapshot {
                output: &candidate,
                iteration: iteration_now,
                elapsed_ms,
            });

            if !monitor.continue_run {
                let reason = monitor.reason.clone();
                self.record(
                    opportunity,
                    Some(assessment),
                    IterationOutcome::SafetyBlocked {
                        reason: reason.clone(),
                    },
                    Some(reason.clone()),
                    duration_ms,
                )
                .await;
                self.gate.record_iteration(false, duration_ms, None);

                let termination = if monitor.immediate_action == Some(ImmediateAction::Halt) {
                    Termination::SafetyHalted { reason }
                } else {
                    Termination::Stopped {
                        reason: StopReason::ResourceExhausted(ResourceKind::Duration),
                    }
                };
                return self.finish(termination).await;
            }

            let safety_note =
                (!monitor.reason.is_empty() && monitor.reason != "clear").then(|| monitor.reason.clone());
            let delta = assessment.delta.unwrap_or(0.0);
            let degraded_scoring = assessment.confidence <= 0.5;

            if assessment.is_regression(self.config.revert_tolerance) {
                // Discard the regressed candidate, keep the previous
                // result, and keep looping.
                debug!(delta, "candidate regressed beyond tolerance, reverting");
                self.record(
                    opportunity,
                    Some(assessment),
                    IterationOutcome::Reverted { delta },
                    safety_note,
                    duration_ms,
                )
                .await;
                self.gate.record_iteration(false, duration_ms, Some(delta));
            } else {
                let step = format!("{}: {}", opportunity.category, opportunity.description);
                let overall = assessment.overall;
                {
                    let mut session = self.session.write().await;
                    let next_iteration = session.iteration + 1;
                    let successor =
                        session.current.superseded_by(candidate.as_str(), step, next_iteration);
                    session.current = successor.clone();
                    session.current_score = Some(overall);
                    session.consider_best(&successor, overall);
                }
                self.record(
                    opportunity,
                    Some(assessment),
                    IterationOutcome::Applied { delta },
                    safety_note,
                    duration_ms,
                )
                .await;
                self.gate
                    .record_iteration(!degraded_scoring, duration_ms, Some(delta));
            }
        }
    }

    /// Invoke the generation capability: primary first, one fallback
    /// attempt on retryable failure.
    async fn generate(
        &mut self,
        opportunity: &EnhancementOpportunity,
        current: &TaskResult,
    ) -> Result<String, String> {
        let request = GenerationRequest {
            prompt: build_enhancement_prompt(opportunity, current),
            params: GenerationParams::for_task(current.task_type),
        };

        let primary = Arc::clone(&self.primary);
        match self.call_provider(&*primary, request.clone()).await {
            Ok(text) => Ok(text),
            Err(error) if !error.is_retryable() => {
                warn!(provider = %error.provider, "non-retryable provider failure");
                Err(error.to_string())
            }
            Err(primary_error) => {
                warn!(
                    provider = %primary_error.provider,
                    kind = %primary_error.kind,
                    "primary provider failed, trying fallback"
                );
                match self.fallback.clone() {
                    Some(fallback) => match self.call_provider(&*fallback, request).await {
                        Ok(text) => Ok(text),
                        Err(fallback_error) => Err(format!(
                            "both providers failed: {primary_error}; {fallback_error}"
                        )),
                    },
                    None => Err(format!(
                        "provider failed with no fallback configured: {primary_error}"
                    )),
                }
            }
        }
    }

    /// One provider call, counted against the shared hourly ceiling and
    /// bounded by the session's remaining wall-clock budget.
    async fn call_provider(
        &mut self,
        provider: &dyn Generator,
        request: GenerationRequest,
    ) -> Result<String, ProviderError> {
        if !self.gate.limiter().try_acquire() {
            return Err(ProviderError::new(
                provider.name(),
                ProviderErrorKind::RateLimited,
                "process-wide generation call ceiling reached",
            ));
        }

        let elapsed = self.session.read().await.elapsed_ms();
        let budget_ms = (self.config.max_duration_seconds * 1000)
            .saturating_sub(elapsed)
            .max(1_000);

        match timeout(Duration::from_millis(budget_ms), provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(
                provider.name(),
                ProviderErrorKind::Timeout,
                format!("no response within the remaining budget ({budget_ms} ms)"),
            )),
        }
    }

    /// Map a plan denial onto the right terminal state: a fresh resource
    /// breach stops the session; everything else is a safety halt.
    fn classify_denial(&self, reason: &str, pre_trip: Option<TripCause>) -> Termination {
        let freshly_tripped = self.gate.last_trip().cloned() != pre_trip;
        match self.gate.last_trip() {
            Some(TripCause::ResourceBreach(kind)) if freshly_tripped => Termination::Stopped {
                reason: StopReason::ResourceExhausted(*kind),
            },
            _ => Termination::SafetyHalted {
                reason: reason.to_string(),
            },
        }
    }

    /// Map a declining decision onto its stop reason.
    async fn classify_stop(
        &self,
        opportunities: &[EnhancementOpportunity],
        reasoning: &str,
    ) -> StopReason {
        if opportunities.is_empty() {
            return StopReason::NoViableOpportunities;
        }
        let session = self.session.read().await;
        if session.iteration >= session.max_iterations {
            return StopReason::ResourceExhausted(ResourceKind::Iterations);
        }
        if session.elapsed_ms() >= session.max_duration_seconds * 1000 {
            return StopReason::ResourceExhausted(ResourceKind::Duration);
        }
        if session
            .current_score
            .is_some_and(|score| score >= self.config.quality_threshold)
        {
            return StopReason::QualityTargetReached;
        }
        StopReason::DecisionDeclined(reasoning.to_string())
    }

    /// Append a history entry and advance the iteration counter,
    /// enforcing the monotonic-counter invariant.
    async fn record(
        &self,
        opportunity: EnhancementOpportunity,
        assessment: Option<QualityAssessment>,
        outcome: IterationOutcome,
        safety_note: Option<String>,
        duration_ms: u64,
    ) {
        let mut session = self.session.write().await;
        let entry = HistoryEntry {
            iteration: session.iteration,
            opportunity,
            assessment,
            outcome,
            safety_note,
            completed_at: Utc::now(),
            duration_ms,
        };
        session.record_iteration(entry);
    }

    async fn transition(&self, state: SessionState) {
        let event = {
            let mut session = self.session.write().await;
            session.state = state;
            SessionEvent::transition(session.id, state, session.iteration, session.current_score)
        };
        // Fire-and-forget: a lagging or absent subscriber never blocks the
        // loop or affects correctness.
        let _ = self.events.send(event);
    }

    async fn finish(
        &self,
        termination: Termination,
    ) -> Result<crate::domain::models::ConsolidatedResult, SessionError> {
        let state = termination.state();
        self.transition(state).await;
        let session = self.session.read().await;
        info!(
            session_id = %session.id,
            state = %state,
            iterations = session.iteration,
            "continuation session terminated: {termination}"
        );
        Ok(session.consolidate(termination))
    }

    fn check_bounded(&self, assessment: &QualityAssessment) -> Result<(), SessionError> {
        if assessment.is_bounded() {
            Ok(())
        } else {
            Err(SessionError::Inconsistency(format!(
                "quality assessment out of bounds: {assessment:?}"
            )))
        }
    }
}

fn build_enhancement_prompt(opportunity: &EnhancementOpportunity, current: &TaskResult) -> String {
    format!(
        "Improve the current {} result.\n\nENHANCEMENT ({}): {}\nSOURCE GAP: {}\n\n{}{}",
        current.task_type,
        opportunity.category,
        opportunity.description,
        opportunity.source_gap,
        CURRENT_OUTPUT_MARKER,
        current.output
    )
}
