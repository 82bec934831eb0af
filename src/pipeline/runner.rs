//! Batch orchestrator: Select → {Classify → Apply} per candidate → End.
//!
//! **Core invariant: one candidate's failure never aborts the batch.**
//! Errors and panics from fetching, classifying or labelling a candidate are
//! caught at the item boundary, logged with the thread id, and recorded in
//! the report. Only a failed selection ends a run early, because then there
//! is nothing to process.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::config::LabelNames;
use crate::error::{ItemError, SelectionError};
use crate::llm::TextGenerator;
use crate::mailbox::{Mailbox, Thread};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::labeler::LabelApplicator;
use crate::pipeline::selector::CandidateSelector;
use crate::pipeline::types::{BatchReport, Candidate, ItemOutcome, ProcessingOutcome, Verdict};

/// Drives one triage batch at a time. Holds no state between runs.
pub struct TriageRunner {
    mailbox: Arc<dyn Mailbox>,
    selector: CandidateSelector,
    classifier: Classifier,
    applicator: LabelApplicator,
}

impl TriageRunner {
    /// Wire the pipeline against one mailbox and one generator.
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        generator: Arc<dyn TextGenerator>,
        labels: LabelNames,
        batch_size: usize,
    ) -> Self {
        Self {
            selector: CandidateSelector::new(Arc::clone(&mailbox), &labels, batch_size),
            classifier: Classifier::new(generator),
            applicator: LabelApplicator::new(Arc::clone(&mailbox), labels),
            mailbox,
        }
    }

    /// Run one batch.
    ///
    /// Candidates are processed strictly one after another. The returned
    /// report lists every selected thread with its outcome; failed threads
    /// keep no `Processed` label and come back on the next run.
    pub async fn run(&self) -> Result<BatchReport, SelectionError> {
        let run_id = Uuid::new_v4();
        self.run_batch(run_id)
            .instrument(info_span!("triage_run", %run_id))
            .await
    }

    async fn run_batch(&self, run_id: Uuid) -> Result<BatchReport, SelectionError> {
        let started_at = Utc::now();

        let threads = self.selector.select().await.inspect_err(|e| {
            error!(error = %e, "Candidate selection failed, nothing processed");
        })?;

        if threads.is_empty() {
            debug!("No candidates to triage");
        } else {
            info!(count = threads.len(), "Triaging candidate batch");
        }

        let mut outcomes = Vec::with_capacity(threads.len());
        for thread in threads {
            let outcome = match AssertUnwindSafe(self.process(&thread))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ItemError::Panicked(panic_message(panic))))
            {
                Ok(verdict) => {
                    info!(
                        thread_id = %thread.id,
                        requires_response = verdict.requires_response,
                        "Candidate triaged"
                    );
                    ProcessingOutcome::Labeled {
                        requires_response: verdict.requires_response,
                    }
                }
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "Failed to triage candidate");
                    // Left without `Processed`, so the next run retries it
                    ProcessingOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            outcomes.push(ItemOutcome {
                thread_id: thread.id,
                outcome,
            });
        }

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        if report.selected() > 0 {
            info!(
                selected = report.selected(),
                labeled = report.labeled(),
                needs_response = report.needs_response(),
                failed = report.failed(),
                "Triage batch complete"
            );
        }
        Ok(report)
    }

    /// Fetch → classify → label for a single thread.
    async fn process(&self, thread: &Thread) -> Result<Verdict, ItemError> {
        let candidate = self.load_candidate(thread).await?;
        let verdict = self.classifier.classify(&candidate.message).await?;
        self.applicator.apply(&candidate.thread, verdict).await?;
        Ok(verdict)
    }

    async fn load_candidate(&self, thread: &Thread) -> Result<Candidate, ItemError> {
        let message = self
            .mailbox
            .first_message(thread)
            .await
            .map_err(ItemError::Fetch)?;

        debug!(
            thread_id = %thread.id,
            message_id = %message.id,
            subject = %message.subject,
            "Loaded candidate"
        );
        Ok(Candidate {
            thread: thread.clone(),
            message,
        })
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
