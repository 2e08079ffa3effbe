//! State transition history tracking.
//!
//! Each machine keeps a bounded record of the transitions it performed, in
//! order. Records are plain serializable values, handy for debugging dumps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use statenest::core::TransitionRecord;
///
/// let record = TransitionRecord::new("Idle", "Patrol", 12);
/// assert_eq!(record.from, "Idle");
/// assert_eq!(record.tick, 12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being transitioned from
    pub from: String,
    /// The state being transitioned to
    pub to: String,
    /// Manager tick during which the transition happened
    pub tick: u64,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>, tick: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            tick,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, bounded history of transitions.
///
/// Once `limit` records are held, recording a new one evicts the oldest.
///
/// # Example
///
/// ```rust
/// use statenest::core::{TransitionHistory, TransitionRecord};
///
/// let mut history = TransitionHistory::new(8);
/// history.record(TransitionRecord::new("Idle", "Patrol", 1));
/// history.record(TransitionRecord::new("Patrol", "Chase", 4));
///
/// assert_eq!(history.path(), vec!["Idle", "Patrol", "Chase"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
    limit: usize,
}

impl TransitionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Record a transition, evicting the oldest one when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> + '_ {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Get the path of states traversed.
    ///
    /// The oldest retained `from` state, then the `to` state of each record.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.records.iter().map(|record| record.to.as_str()));
        path
    }

    /// Time between the oldest and newest retained records.
    ///
    /// `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
