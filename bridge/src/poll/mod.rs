//! Build discovery and completion polling
//!
//! Both loops share [`PollState`]. Each iteration feeds one remote answer into
//! a transition function (`discovery::advance`, `completion::advance`) which
//! either ends the loop or leaves it searching. The transition functions do no
//! I/O and are tested directly.

pub mod completion;
pub mod discovery;

use std::time::Duration;

use serde::Serialize;

/// Polling budgets
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Attempts to see the new build start
    pub discovery_attempts: u32,

    /// Delay between discovery attempts
    pub discovery_interval: Duration,

    /// Attempts to see the build finish
    pub completion_attempts: u32,

    /// Delay between completion attempts
    pub completion_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            discovery_attempts: 30,
            discovery_interval: Duration::from_secs(1),
            completion_attempts: 120,
            completion_interval: Duration::from_secs(5),
        }
    }
}

/// Where a polled build stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    NotStarted,
    InProgress,
    Success,
    Failure,
    TimedOut,
}

/// State of one poll loop, created fresh per invocation
#[derive(Debug, Clone)]
pub struct PollState {
    pub remaining_tries: u32,
    pub interval: Duration,
    pub status: PollStatus,
    attempts: u32,
    answered: u32,
    last_reason: Option<String>,
}

impl PollState {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            remaining_tries: max_attempts,
            interval,
            status: PollStatus::NotStarted,
            attempts: 0,
            answered: 0,
            last_reason: None,
        }
    }

    /// Queries made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Queries that got a well-formed answer
    pub fn answered(&self) -> u32 {
        self.answered
    }

    pub fn last_reason(&self) -> Option<&str> {
        self.last_reason.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_tries == 0
    }

    /// Account for one query
    fn spend(&mut self) {
        self.attempts += 1;
        self.remaining_tries = self.remaining_tries.saturating_sub(1);
    }

    fn note_answer(&mut self, reason: String) {
        self.answered += 1;
        self.last_reason = Some(reason);
    }

    fn note_hiccup(&mut self, reason: String) {
        self.last_reason = Some(reason);
    }
}
