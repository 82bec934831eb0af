//! In-memory `Mailbox` with failure injection.
//!
//! Stands in for a real provider in tests and dry runs. Every label creation
//! and every attach that actually changes a thread counts as a mutation, so
//! callers can assert that a run touched nothing.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::query::SearchQuery;
use super::{LabelRef, Mailbox, Message, Thread};
use crate::error::MailboxError;

#[derive(Debug)]
struct StoredThread {
    thread: Thread,
    message: Message,
    received_at: DateTime<Utc>,
    seq: u64,
    unread: bool,
    labels: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    threads: Vec<StoredThread>,
    labels: Vec<LabelRef>,
    next_seq: u64,
    mutations: usize,
    search_failure: Option<String>,
    fetch_failures: HashSet<String>,
    attach_failures: HashSet<String>,
    create_failures: HashSet<String>,
}

impl State {
    fn ensure_label(&mut self, name: &str) -> LabelRef {
        if let Some(existing) = self.labels.iter().find(|l| l.name == name) {
            return existing.clone();
        }
        let label = LabelRef {
            id: format!("Label_{}", self.labels.len() + 1),
            name: name.to_string(),
        };
        self.labels.push(label.clone());
        label
    }

    fn thread_mut(&mut self, id: &str) -> Result<&mut StoredThread, MailboxError> {
        self.threads
            .iter_mut()
            .find(|t| t.thread.id == id)
            .ok_or_else(|| MailboxError::NotFound(format!("thread {id}")))
    }
}

/// Process-local mailbox keyed by thread id.
#[derive(Debug, Default)]
pub struct InMemoryMailbox {
    state: Mutex<State>,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking caller must not take the mailbox down with it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an unread thread received now, newer than every thread added before it.
    pub fn add_thread(&self, id: &str, subject: &str, body: &str, labels: &[&str]) -> Thread {
        self.add_thread_at(id, subject, body, labels, Utc::now())
    }

    /// Add an unread thread with an explicit receive time.
    ///
    /// Labels named here are registered without counting as mutations.
    pub fn add_thread_at(
        &self,
        id: &str,
        subject: &str,
        body: &str,
        labels: &[&str],
        received_at: DateTime<Utc>,
    ) -> Thread {
        let mut state = self.state();
        for name in labels {
            state.ensure_label(name);
        }
        let seq = state.next_seq;
        state.next_seq += 1;

        let thread = Thread::new(id);
        state.threads.push(StoredThread {
            thread: thread.clone(),
            message: Message {
                id: format!("{id}-m1"),
                subject: subject.to_string(),
                plain_body: body.to_string(),
            },
            received_at,
            seq,
            unread: true,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        thread
    }

    /// Mark a thread as read.
    pub fn mark_read(&self, id: &str) {
        if let Ok(thread) = self.state().thread_mut(id) {
            thread.unread = false;
        }
    }

    /// Label names currently on a thread, sorted.
    pub fn labels_of(&self, id: &str) -> Vec<String> {
        self.state()
            .threads
            .iter()
            .find(|t| t.thread.id == id)
            .map(|t| t.labels.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of every registered label, in creation order.
    pub fn label_names(&self) -> Vec<String> {
        self.state().labels.iter().map(|l| l.name.clone()).collect()
    }

    /// Label creations plus attaches that changed a thread.
    pub fn mutation_count(&self) -> usize {
        self.state().mutations
    }

    /// Make every search fail with the given reason.
    pub fn fail_search(&self, reason: &str) {
        self.state().search_failure = Some(reason.to_string());
    }

    /// Make fetching the first message of `thread_id` fail.
    pub fn fail_fetch_for(&self, thread_id: &str) {
        self.state().fetch_failures.insert(thread_id.to_string());
    }

    /// Make attaching the named label fail on every thread.
    pub fn fail_attach_for(&self, label: &str) {
        self.state().attach_failures.insert(label.to_string());
    }

    /// Make creating the named label fail.
    pub fn fail_create_for(&self, label: &str) {
        self.state().create_failures.insert(label.to_string());
    }

    /// Drop all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.search_failure = None;
        state.fetch_failures.clear();
        state.attach_failures.clear();
        state.create_failures.clear();
    }
}

fn injected(reason: impl Into<String>) -> MailboxError {
    MailboxError::Api {
        status: 500,
        body: reason.into(),
    }
}

#[async_trait]
impl Mailbox for InMemoryMailbox {
    async fn search(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Thread>, MailboxError> {
        let parsed = SearchQuery::parse(query)?;
        let state = self.state();
        if let Some(reason) = &state.search_failure {
            return Err(MailboxError::Connection(reason.clone()));
        }

        let mut matching: Vec<&StoredThread> = state
            .threads
            .iter()
            .filter(|t| parsed.matches(t.unread, t.labels.iter().map(String::as_str)))
            .collect();
        matching.sort_by(|a, b| {
            b.received_at
                .cmp(&a.received_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|t| t.thread.clone())
            .collect())
    }

    async fn first_message(&self, thread: &Thread) -> Result<Message, MailboxError> {
        let mut state = self.state();
        if state.fetch_failures.contains(&thread.id) {
            return Err(injected(format!("fetch failed for {}", thread.id)));
        }
        Ok(state.thread_mut(&thread.id)?.message.clone())
    }

    async fn user_label_by_name(&self, name: &str) -> Result<Option<LabelRef>, MailboxError> {
        Ok(self.state().labels.iter().find(|l| l.name == name).cloned())
    }

    async fn create_label(&self, name: &str) -> Result<LabelRef, MailboxError> {
        let mut state = self.state();
        if state.create_failures.contains(name) {
            return Err(injected(format!("create failed for {name}")));
        }
        if state.labels.iter().any(|l| l.name == name) {
            return Err(MailboxError::Api {
                status: 409,
                body: format!("label {name} already exists"),
            });
        }
        state.mutations += 1;
        Ok(state.ensure_label(name))
    }

    async fn add_label(&self, thread: &Thread, label: &LabelRef) -> Result<(), MailboxError> {
        let mut state = self.state();
        if state.attach_failures.contains(&label.name) {
            return Err(injected(format!("attach failed for {}", label.name)));
        }
        let name = state
            .labels
            .iter()
            .find(|l| l.id == label.id)
            .map(|l| l.name.clone())
            .ok_or_else(|| MailboxError::NotFound(format!("label {}", label.id)))?;

        let stored = state.thread_mut(&thread.id)?;
        if stored.labels.insert(name) {
            state.mutations += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn search_orders_newest_first_and_applies_offset() {
        let mailbox = InMemoryMailbox::new();
        let now = Utc::now();
        mailbox.add_thread_at("old", "s", "b", &["Triage"], now - Duration::hours(2));
        mailbox.add_thread_at("new", "s", "b", &["Triage"], now);
        mailbox.add_thread_at("mid", "s", "b", &["Triage"], now - Duration::hours(1));

        let q = "is:unread label:Triage";
        let ids: Vec<String> = mailbox.search(q, 0, 10).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let page: Vec<String> = mailbox.search(q, 1, 1).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(page, vec!["mid"]);
    }

    #[tokio::test]
    async fn search_filters_by_query() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_thread("a", "s", "b", &["Triage"]);
        mailbox.add_thread("b", "s", "b", &["Triage", "Processed"]);
        mailbox.add_thread("c", "s", "b", &[]);
        mailbox.add_thread("d", "s", "b", &["Triage"]);
        mailbox.mark_read("d");

        let found = mailbox
            .search("is:unread label:Triage -label:Processed", 0, 10)
            .await
            .unwrap();
        assert_eq!(found, vec![Thread::new("a")]);
    }

    #[tokio::test]
    async fn search_rejects_unknown_query_terms() {
        let mailbox = InMemoryMailbox::new();
        let err = mailbox.search("older_than:1d", 0, 5).await.unwrap_err();
        assert!(matches!(err, MailboxError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn add_label_is_idempotent() {
        let mailbox = InMemoryMailbox::new();
        let thread = mailbox.add_thread("t1", "s", "b", &[]);
        let label = mailbox.create_label("Processed").await.unwrap();

        mailbox.add_label(&thread, &label).await.unwrap();
        mailbox.add_label(&thread, &label).await.unwrap();

        assert_eq!(mailbox.labels_of("t1"), vec!["Processed"]);
        // one create + one effective attach
        assert_eq!(mailbox.mutation_count(), 2);
    }

    #[tokio::test]
    async fn create_label_rejects_duplicates() {
        let mailbox = InMemoryMailbox::new();
        mailbox.create_label("ToRespond").await.unwrap();
        let err = mailbox.create_label("ToRespond").await.unwrap_err();
        assert!(matches!(err, MailboxError::Api { status: 409, .. }));
        assert_eq!(
            mailbox.user_label_by_name("ToRespond").await.unwrap().map(|l| l.name),
            Some("ToRespond".to_string())
        );
    }

    #[tokio::test]
    async fn injected_failures_surface_and_clear() {
        let mailbox = InMemoryMailbox::new();
        let thread = mailbox.add_thread("t1", "s", "b", &["Triage"]);
        mailbox.fail_search("offline");
        mailbox.fail_fetch_for("t1");

        assert!(matches!(
            mailbox.search("label:Triage", 0, 5).await,
            Err(MailboxError::Connection(_))
        ));
        assert!(mailbox.first_message(&thread).await.is_err());

        mailbox.clear_failures();
        assert_eq!(mailbox.search("label:Triage", 0, 5).await.unwrap().len(), 1);
        assert_eq!(mailbox.first_message(&thread).await.unwrap().subject, "s");
    }
}
