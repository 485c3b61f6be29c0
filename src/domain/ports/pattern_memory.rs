//! Port trait for the cross-session learning memory.
//!
//! The pattern bank is an injected read/append-only collaborator, never a
//! hidden singleton: the discoverer consults it read-only during discovery,
//! and the session manager appends one record after a session terminates,
//! off the critical path. Appends never overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::models::{OpportunityCategory, TaskType};

/// Result type for pattern memory operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Compact record of one completed session, appended to the pattern bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPattern {
    /// Task type the session worked on.
    pub task_type: TaskType,
    /// Iterations the session ran.
    pub iterations: u32,
    /// Categories whose enhancements were accepted.
    pub accepted_categories: Vec<OpportunityCategory>,
    /// Net quality change from the initial result to the best one.
    pub net_improvement: f64,
    /// When the session completed.
    pub completed_at: DateTime<Utc>,
}

/// Port trait for the cross-session pattern bank.
#[async_trait]
pub trait PatternMemory: Send + Sync {
    /// Categories that historically produced accepted enhancements for
    /// this task type, with their acceptance counts, most frequent first.
    async fn recurring_categories(
        &self,
        task_type: TaskType,
    ) -> Result<Vec<(OpportunityCategory, u32)>>;

    /// Append a completed-session record. Never overwrites prior records.
    async fn append(&self, pattern: SessionPattern) -> Result<()>;
}

/// A no-op pattern memory for callers that opt out of cross-session
/// learning.
#[derive(Debug, Clone, Default)]
pub struct NullPatternMemory;

impl NullPatternMemory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PatternMemory for NullPatternMemory {
    async fn recurring_categories(
        &self,
        _task_type: TaskType,
    ) -> Result<Vec<(OpportunityCategory, u32)>> {
        Ok(Vec::new())
    }

    async fn append(&self, _pattern: SessionPattern) -> Result<()> {
        Ok(())
    }
}

/// In-memory, append-only pattern bank.
///
/// Suitable for single-process deployments and tests. Records are only ever
/// pushed; aggregation happens at read time.
#[derive(Debug, Default)]
pub struct InMemoryPatternMemory {
    records: RwLock<Vec<SessionPattern>>,
}

impl InMemoryPatternMemory {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of records appended so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the bank is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PatternMemory for InMemoryPatternMemory {
    async fn recurring_categories(
        &self,
        task_type: TaskType,
    ) -> Result<Vec<(OpportunityCategory, u32)>> {
        let records = self.records.read().await;
        let mut counts: BTreeMap<OpportunityCategory, u32> = BTreeMap::new();
        for record in records.iter().filter(|r| r.task_type == task_type) {
            for category in &record.accepted_categories {
                *counts.entry(*category).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(OpportunityCategory, u32)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    async fn append(&self, pattern: SessionPattern) -> Result<()> {
        self.records.write().await.push(pattern);
        Ok(())
    }
}
