//! Label applicator: maps a verdict onto additive label writes.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::LabelNames;
use crate::error::LabelError;
use crate::mailbox::{LabelRef, Mailbox, Thread};
use crate::pipeline::types::Verdict;

/// Applies `ToRespond` (when needed) and then `Processed` to a thread.
pub struct LabelApplicator {
    mailbox: Arc<dyn Mailbox>,
    names: LabelNames,
}

impl LabelApplicator {
    pub fn new(mailbox: Arc<dyn Mailbox>, names: LabelNames) -> Self {
        Self { mailbox, names }
    }

    /// Apply the labels a verdict calls for. Never removes a label.
    ///
    /// Both labels are resolved before either is attached, so a lookup or
    /// creation failure leaves the thread untouched. The two attaches are
    /// still separate writes: if `Processed` fails after `ToRespond`
    /// succeeded, the thread is selected again next run and the repeated
    /// `ToRespond` attach is a no-op.
    pub async fn apply(&self, thread: &Thread, verdict: Verdict) -> Result<(), LabelError> {
        let to_respond = if verdict.requires_response {
            Some(self.resolve(&self.names.to_respond).await?)
        } else {
            None
        };
        let processed = self.resolve(&self.names.processed).await?;

        if let Some(label) = &to_respond {
            self.attach(thread, label).await?;
        }
        self.attach(thread, &processed).await?;

        debug!(
            thread_id = %thread.id,
            requires_response = verdict.requires_response,
            "Labels applied"
        );
        Ok(())
    }

    /// Look a label up by name, creating it when absent.
    pub async fn resolve(&self, name: &str) -> Result<LabelRef, LabelError> {
        let existing = self
            .mailbox
            .user_label_by_name(name)
            .await
            .map_err(|source| LabelError::Lookup {
                label: name.to_string(),
                source,
            })?;

        if let Some(label) = existing {
            return Ok(label);
        }

        let created = self
            .mailbox
            .create_label(name)
            .await
            .map_err(|source| LabelError::Create {
                label: name.to_string(),
                source,
            })?;
        info!(label = %created.name, "Created missing label");
        Ok(created)
    }

    async fn attach(&self, thread: &Thread, label: &LabelRef) -> Result<(), LabelError> {
        self.mailbox
            .add_label(thread, label)
            .await
            .map_err(|source| LabelError::Attach {
                label: label.name.clone(),
                thread_id: thread.id.clone(),
                source,
            })
    }
}
