//! Mailbox capability set consumed by the triage pipeline.
//!
//! The pipeline only ever searches threads, reads a thread's first message,
//! and adds labels. Labels are resolved by name and created lazily, so the
//! trait exposes lookup and creation separately and leaves the
//! get-or-create policy to the caller.

pub mod gmail;
pub mod memory;
pub mod query;

pub use gmail::GmailMailbox;
pub use memory::InMemoryMailbox;
pub use query::SearchQuery;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MailboxError;

/// A mailbox conversation, identified by its provider id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Read-only view of the first message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub plain_body: String,
}

/// Handle to a user label. Identity is the name; `id` is whatever the
/// provider needs to attach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: String,
    pub name: String,
}

/// Backend-agnostic mailbox used by the selector and label applicator.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Search threads matching `query`, newest first, skipping `offset`
    /// results and returning at most `limit`.
    async fn search(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Thread>, MailboxError>;

    /// Fetch the first message of a thread.
    async fn first_message(&self, thread: &Thread) -> Result<Message, MailboxError>;

    /// Look up a user label by name. Providers whose label names are
    /// case-insensitive match accordingly.
    async fn user_label_by_name(&self, name: &str) -> Result<Option<LabelRef>, MailboxError>;

    /// Create a user label.
    async fn create_label(&self, name: &str) -> Result<LabelRef, MailboxError>;

    /// Attach a label to a thread. Attaching a label the thread already
    /// carries is a no-op.
    async fn add_label(&self, thread: &Thread, label: &LabelRef) -> Result<(), MailboxError>;
}
