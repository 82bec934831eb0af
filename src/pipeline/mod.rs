//! Inbox triage pipeline.
//!
//! Every run flows through:
//! 1. `CandidateSelector::select()`: bounded search for unread, tagged, unprocessed threads
//! 2. `Classifier::classify()`: one generation call per message → `Verdict`
//! 3. `LabelApplicator::apply()`: additive `ToRespond` / `Processed` labels
//!
//! `TriageRunner` drives the three steps per candidate and isolates failures,
//! so one bad message never stops the rest of the batch.

pub mod classifier;
pub mod labeler;
pub mod runner;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use classifier::Classifier;
pub use labeler::LabelApplicator;
pub use runner::TriageRunner;
pub use selector::CandidateSelector;
pub use types::{BatchReport, Candidate, ItemOutcome, ProcessingOutcome, Verdict};
