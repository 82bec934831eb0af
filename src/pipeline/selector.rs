//! Candidate selection: bounded search, no side effects.

use std::sync::Arc;

use tracing::debug;

use crate::config::LabelNames;
use crate::error::SelectionError;
use crate::mailbox::{Mailbox, SearchQuery, Thread};

/// Picks at most `batch_size` unread, tagged, unprocessed threads.
pub struct CandidateSelector {
    mailbox: Arc<dyn Mailbox>,
    query: SearchQuery,
    batch_size: usize,
}

impl CandidateSelector {
    pub fn new(mailbox: Arc<dyn Mailbox>, labels: &LabelNames, batch_size: usize) -> Self {
        Self {
            mailbox,
            query: SearchQuery::candidates(&labels.inclusion, &labels.processed),
            batch_size,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Newest-first candidate threads. Provider errors propagate untouched;
    /// there is no retry here.
    pub async fn select(&self) -> Result<Vec<Thread>, SelectionError> {
        let query = self.query.render();
        let mut threads = self.mailbox.search(&query, 0, self.batch_size).await?;

        // A provider that ignores `limit` still cannot widen the batch.
        threads.truncate(self.batch_size);

        debug!(query = %query, count = threads.len(), "Selected candidates");
        Ok(threads)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::MailboxError;
    use crate::mailbox::{InMemoryMailbox, LabelRef, Message};

    #[tokio::test]
    async fn select_is_bounded_by_batch_size() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        for i in 0..8 {
            mailbox.add_thread(&format!("t{i}"), "s", "b", &["Triage"]);
        }

        let selector = CandidateSelector::new(mailbox.clone(), &LabelNames::default(), 5);
        let threads = selector.select().await.unwrap();

        assert_eq!(threads.len(), 5);
        assert_eq!(threads[0].id, "t7");
        assert_eq!(mailbox.mutation_count(), 0);
    }

    #[tokio::test]
    async fn select_skips_processed_read_and_untagged() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.add_thread("fresh", "s", "b", &["Triage"]);
        mailbox.add_thread("done", "s", "b", &["Triage", "Processed"]);
        mailbox.add_thread("untagged", "s", "b", &[]);
        mailbox.add_thread("read", "s", "b", &["Triage"]);
        mailbox.mark_read("read");

        let selector = CandidateSelector::new(mailbox, &LabelNames::default(), 5);
        assert_eq!(selector.select().await.unwrap(), vec![Thread::new("fresh")]);
    }

    #[tokio::test]
    async fn select_propagates_search_failure() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.fail_search("network down");

        let selector = CandidateSelector::new(mailbox, &LabelNames::default(), 5);
        let err = selector.select().await.unwrap_err();
        assert!(err.to_string().contains("network down"));
    }

    /// Provider that ignores the limit it was given.
    struct GreedyMailbox;

    #[async_trait]
    impl Mailbox for GreedyMailbox {
        async fn search(&self, _: &str, _: usize, _: usize) -> Result<Vec<Thread>, MailboxError> {
            Ok((0..20).map(|i| Thread::new(format!("g{i}"))).collect())
        }
        async fn first_message(&self, _: &Thread) -> Result<Message, MailboxError> {
            unimplemented!("not used in selector tests")
        }
        async fn user_label_by_name(&self, _: &str) -> Result<Option<LabelRef>, MailboxError> {
            unimplemented!("not used in selector tests")
        }
        async fn create_label(&self, _: &str) -> Result<LabelRef, MailboxError> {
            unimplemented!("not used in selector tests")
        }
        async fn add_label(&self, _: &Thread, _: &LabelRef) -> Result<(), MailboxError> {
            unimplemented!("not used in selector tests")
        }
    }

    #[tokio::test]
    async fn select_truncates_oversized_provider_results() {
        let selector = CandidateSelector::new(Arc::new(GreedyMailbox), &LabelNames::default(), 3);
        assert_eq!(selector.select().await.unwrap().len(), 3);
    }
}
