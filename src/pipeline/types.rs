//! Shared types for the triage pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mailbox::{Message, Thread};

// ── Verdict ─────────────────────────────────────────────────────────

/// Classification result for one message. Never stored; the labels on the
/// thread are the durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub requires_response: bool,
}

impl Verdict {
    pub fn new(requires_response: bool) -> Self {
        Self { requires_response }
    }
}

// ── Candidate ───────────────────────────────────────────────────────

/// A selected thread paired with its first message.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub thread: Thread,
    pub message: Message,
}

// ── Outcomes ────────────────────────────────────────────────────────

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    /// Labels applied. `requires_response` mirrors the verdict.
    Labeled { requires_response: bool },
    /// Something failed; the thread keeps no new `Processed` label and is
    /// retried on the next run.
    Failed { error: String },
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Labeled { .. })
    }
}

/// Outcome tagged with the thread it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub thread_id: String,
    pub outcome: ProcessingOutcome,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn selected(&self) -> usize {
        self.outcomes.len()
    }

    pub fn labeled(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn needs_response(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.outcome,
                    ProcessingOutcome::Labeled {
                        requires_response: true
                    }
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.selected() - self.labeled()
    }

    /// Outcome for a given thread, if it was part of this batch.
    pub fn outcome_for(&self, thread_id: &str) -> Option<&ProcessingOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.thread_id == thread_id)
            .map(|o| &o.outcome)
    }
}
