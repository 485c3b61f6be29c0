//! End-to-end continuation loop tests against scripted providers.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use common::{
    bare_result, degraded_code, manager_with_fallback, manager_with_script, polished_result,
    BARE_CODE, POLISHED_CODE,
};
use continuum::domain::models::{
    ContinuationConfig, IterationOutcome, SessionState, StopReason, Termination,
};
use continuum::domain::ports::{InMemoryPatternMemory, NullContextStore};
use continuum::infrastructure::ScriptedGenerator;
use continuum::services::CallRateLimiter;
use continuum::{ContinuationOrchestrator, ProviderErrorKind};

#[tokio::test]
async fn test_enhancement_accepted_and_session_stops() {
    // Scenario: a bare result, one scripted enhancement that clearly
    // improves it. The iteration is accepted and the session stops once
    // nothing viable remains.
    let manager = manager_with_script(vec![Ok(POLISHED_CODE.to_string())]);
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    assert_eq!(result.iterations, 1);
    assert_eq!(result.history.len(), 1);
    match &result.history[0].outcome {
        IterationOutcome::Applied { delta } => assert!(*delta > 0.0, "delta should be positive"),
        other => panic!("expected an applied iteration, got {other:?}"),
    }
    assert_eq!(result.result.output, POLISHED_CODE);
    assert!(matches!(
        result.termination,
        Termination::Stopped {
            reason: StopReason::NoViableOpportunities | StopReason::QualityTargetReached
        }
    ));
    let assessment = result.history[0].assessment.as_ref().unwrap();
    assert!(assessment.delta.unwrap() > 0.05);
}

#[tokio::test]
async fn test_excellent_input_stops_without_iterating() {
    // Scenario: the initial result is already excellent; the very first
    // pass finds nothing viable and the session ends with the input
    // unchanged and an empty history.
    let manager = manager_with_script(vec![Ok("never used".to_string())]);
    let id = manager.start(polished_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    assert_eq!(result.iterations, 0);
    assert!(result.history.is_empty());
    assert_eq!(result.result.output, POLISHED_CODE);
    assert!(matches!(result.termination, Termination::Stopped { .. }));
}

#[tokio::test]
async fn test_dual_provider_failure_terminates_in_error() {
    // Scenario: primary and fallback both time out. The session ends in
    // Error, the failed iteration counts, and the consolidated result is
    // the best seen so far -- the original input.
    let manager = manager_with_fallback(
        vec![Err(ProviderErrorKind::Timeout)],
        vec![Err(ProviderErrorKind::Timeout)],
    );
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    assert_eq!(result.iterations, 1, "failed iteration still counts");
    assert_eq!(result.result.output, BARE_CODE);
    match &result.termination {
        Termination::Error { error } => {
            assert!(error.contains("both providers failed"), "got: {error}");
            assert!(error.contains("timeout"), "got: {error}");
        }
        other => panic!("expected Error termination, got {other:?}"),
    }
    assert!(matches!(
        result.history[0].outcome,
        IterationOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn test_auth_failure_skips_fallback() {
    // Auth failures are non-retryable: the fallback provider must never be
    // consulted even though it would succeed.
    let manager = manager_with_fallback(
        vec![Err(ProviderErrorKind::Auth)],
        vec![Ok(POLISHED_CODE.to_string())],
    );
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    match &result.termination {
        Termination::Error { error } => {
            assert!(error.contains("auth"), "got: {error}");
            assert!(
                !error.contains("both providers"),
                "fallback must not be attempted after auth failure: {error}"
            );
        }
        other => panic!("expected Error termination, got {other:?}"),
    }
    assert_eq!(result.result.output, BARE_CODE);
}

#[tokio::test]
async fn test_regressing_candidate_is_reverted() {
    // Scenario: every generated candidate is clearly worse. Each iteration
    // is reverted (current result unchanged, counter still advancing);
    // after two consecutive declines the breaker trips and the session is
    // halted for safety.
    let manager = manager_with_script(vec![Ok(degraded_code())]);
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    assert_eq!(result.result.output, BARE_CODE, "regressions must not stick");
    assert!(result.iterations >= 2);
    for entry in &result.history {
        match &entry.outcome {
            IterationOutcome::Reverted { delta } => {
                assert!(*delta < -0.05, "revert requires delta beyond tolerance");
            }
            other => panic!("expected reverted iterations, got {other:?}"),
        }
    }
    match &result.termination {
        Termination::SafetyHalted { reason } => {
            assert!(reason.contains("circuit breaker"), "got: {reason}");
        }
        other => panic!("expected a safety halt, got {other:?}"),
    }
}

#[tokio::test]
async fn test_iteration_counter_is_monotone_and_bounded() {
    let manager = manager_with_script(vec![Ok(degraded_code())]);
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    let mut previous = None;
    for entry in &result.history {
        if let Some(prev) = previous {
            assert!(entry.iteration > prev, "iterations must increase");
        }
        previous = Some(entry.iteration);
    }
    assert!(result.iterations <= 20);
}

#[tokio::test]
async fn test_preset_stop_flag_stops_before_generating() {
    // A stop request takes effect at the next iteration boundary; with the
    // flag raised before the loop starts, no generation happens at all.
    let (events, _) = broadcast::channel(64);
    let stop_flag = Arc::new(AtomicBool::new(true));
    let mut orchestrator = ContinuationOrchestrator::new(
        ContinuationConfig::default(),
        bare_result(),
        Arc::new(ScriptedGenerator::new(
            "primary",
            vec![Ok(POLISHED_CODE.to_string())],
        )),
        None,
        Arc::new(NullContextStore::new()),
        Arc::new(InMemoryPatternMemory::new()),
        Arc::new(CallRateLimiter::new(150)),
        events,
        stop_flag.clone(),
    );

    let result = orchestrator.run().await.expect("session should consolidate");
    assert_eq!(result.iterations, 0);
    assert!(result.history.is_empty());
    assert!(matches!(
        result.termination,
        Termination::Stopped {
            reason: StopReason::UserRequested
        }
    ));
    assert!(stop_flag.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_events_are_emitted_for_every_transition() {
    let manager = manager_with_script(vec![Ok("never used".to_string())]);
    let mut events = manager.subscribe();
    let id = manager.start(polished_result()).await;
    let _ = manager.wait(id).await.expect("session should consolidate");

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.session_id, id);
        states.push(event.state);
    }
    assert_eq!(states.first(), Some(&SessionState::Init));
    assert!(states.contains(&SessionState::Assessing));
    assert!(states.contains(&SessionState::Selecting));
    assert!(states.last().unwrap().is_terminal());
    assert!(
        !states.contains(&SessionState::Generating),
        "an empty first pass must never reach GENERATING"
    );
}

#[tokio::test]
async fn test_status_and_final_result_surface() {
    let manager = manager_with_script(vec![Ok(POLISHED_CODE.to_string())]);
    let id = manager.start(bare_result()).await;
    let consolidated = manager.wait(id).await.expect("session should consolidate");

    let status = manager.status(id).await.expect("status should resolve");
    assert_eq!(status.id, id);
    assert!(status.state.is_terminal());
    assert_eq!(status.iteration, consolidated.iterations);

    let again = manager
        .final_result(id)
        .await
        .expect("final result should be retrievable repeatedly");
    assert_eq!(again.session_id, consolidated.session_id);
}

#[tokio::test]
async fn test_unknown_session_is_reported() {
    let manager = manager_with_script(vec![Ok("x".to_string())]);
    let missing = uuid::Uuid::new_v4();
    assert!(manager.request_stop(missing).await.is_err());
    assert!(manager.status(missing).await.is_err());
    assert!(manager.final_result(missing).await.is_err());
}

#[tokio::test]
async fn test_consolidated_result_round_trips() {
    // The caller may serialize the history for audit/replay; every field
    // must survive the round trip.
    let manager = manager_with_script(vec![Ok(POLISHED_CODE.to_string())]);
    let id = manager.start(bare_result()).await;
    let result = manager.wait(id).await.expect("session should consolidate");

    let json = serde_json::to_string(&result).expect("serialize");
    let parsed: continuum::ConsolidatedResult = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed.session_id, result.session_id);
    assert_eq!(parsed.iterations, result.iterations);
    assert_eq!(parsed.result.output, result.result.output);
    assert_eq!(parsed.history.len(), result.history.len());
    assert_eq!(parsed.termination, result.termination);
    assert_eq!(
        parsed.history[0].opportunity.category,
        result.history[0].opportunity.category
    );
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    // Two concurrent sessions must not share mutable state: each keeps its
    // own history and terminal result.
    let manager = manager_with_script(vec![Ok(POLISHED_CODE.to_string())]);
    let first = manager.start(bare_result()).await;
    let second = manager.start(polished_result()).await;

    let first_result = manager.wait(first).await.expect("first session");
    let second_result = manager.wait(second).await.expect("second session");

    assert_ne!(first_result.session_id, second_result.session_id);
    assert_eq!(second_result.iterations, 0);
    assert!(first_result.iterations >= 1);
}

#[tokio::test]
async fn test_pattern_bank_receives_session_record() {
    let patterns = Arc::new(InMemoryPatternMemory::new());
    let manager = continuum::SessionManager::new(
        ContinuationConfig::default(),
        Arc::new(ScriptedGenerator::new(
            "primary",
            vec![Ok(POLISHED_CODE.to_string())],
        )),
        None,
        Arc::new(NullContextStore::new()),
        patterns.clone(),
    );
    let id = manager.start(bare_result()).await;
    let _ = manager.wait(id).await.expect("session should consolidate");

    assert_eq!(patterns.len().await, 1, "one record per completed session");
}
