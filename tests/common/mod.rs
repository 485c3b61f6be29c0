//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use continuum::domain::models::{ContinuationConfig, TaskResult, TaskType};
use continuum::domain::ports::{InMemoryPatternMemory, NullContextStore};
use continuum::infrastructure::ScriptedGenerator;
use continuum::services::SessionManager;
use continuum::ProviderErrorKind;

/// Minimal, undocumented code: plenty of enhancement headroom.
pub const BARE_CODE: &str = "fn greet() { println!(\"hi\"); }\n";

/// Well-documented, tested, error-handled code that scores near the top of
/// the rubric and leaves nothing viable to enhance.
pub const POLISHED_CODE: &str = r#"/// Greets the caller on standard output.
///
/// Returns an error when the underlying writer fails, so callers can
/// surface the failure instead of losing it.
fn greet(name: &str) -> Result<String, std::fmt::Error> {
    // Render the greeting into an owned buffer.
    use std::fmt::Write;
    let mut message = String::new();
    match write!(message, "hello, {name}") {
        Ok(()) => Ok(message),
        Err(error) => Err(error),
    }
}

/// Fallback greeting used when no name is available at the call site.
fn greet_anonymous() -> Result<String, std::fmt::Error> {
    // Delegates to greet so formatting stays in one place.
    greet("friend")
}

#[test]
fn test_greet_includes_name() {
    let message = greet("ada").unwrap();
    assert!(message.contains("ada"));
}

#[test]
fn test_greet_anonymous_is_friendly() {
    let message = greet_anonymous().unwrap();
    assert!(message.contains("friend"));
}
"#;

/// A degraded candidate: no documentation, an unwieldy single line, and
/// unwrap chains. Scores well below [`BARE_CODE`].
pub fn degraded_code() -> String {
    format!(
        "let value = source.unwrap().unwrap().unwrap(); {}\n",
        "x".repeat(180)
    )
}

/// An initial code result with enhancement headroom.
pub fn bare_result() -> TaskResult {
    TaskResult::new(BARE_CODE, TaskType::Code)
}

/// An initial code result with nothing left to improve.
pub fn polished_result() -> TaskResult {
    TaskResult::new(POLISHED_CODE, TaskType::Code)
}

/// Manager wired with a scripted primary provider and no fallback.
pub fn manager_with_script(
    script: Vec<Result<String, ProviderErrorKind>>,
) -> SessionManager {
    SessionManager::new(
        ContinuationConfig::default(),
        Arc::new(ScriptedGenerator::new("primary", script)),
        None,
        Arc::new(NullContextStore::new()),
        Arc::new(InMemoryPatternMemory::new()),
    )
}

/// Manager wired with scripted primary and fallback providers.
pub fn manager_with_fallback(
    primary: Vec<Result<String, ProviderErrorKind>>,
    fallback: Vec<Result<String, ProviderErrorKind>>,
) -> SessionManager {
    SessionManager::new(
        ContinuationConfig::default(),
        Arc::new(ScriptedGenerator::new("primary", primary)),
        Some(Arc::new(ScriptedGenerator::new("fallback", fallback))),
        Arc::new(NullContextStore::new()),
        Arc::new(InMemoryPatternMemory::new()),
    )
}
