//! Periodic trigger for triage runs.
//!
//! Timer-based loop:
//! 1. `runner.run()`: select, classify, label
//! 2. Log the batch summary (or the selection failure)
//! 3. Wait for the next tick or a shutdown signal
//!
//! Runs never overlap, and shutdown is only observed between batches, so a
//! batch that has started always finishes its label writes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::pipeline::runner::TriageRunner;

/// Spawn a background task that runs a triage batch every `interval`.
///
/// The first batch runs immediately. Returns a `JoinHandle` and a shutdown
/// sender: send `true` (or drop the sender) and await the handle; the loop
/// finishes any batch in flight and exits without waiting for another tick.
pub fn spawn_triage_loop(
    runner: Arc<TriageRunner>,
    interval: Duration,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Triage loop started, running every {}s", interval.as_secs());

        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = runner.run().await {
                // Selection failures end the batch, not the loop
                error!(error = %e, "Triage run failed");
            }
        }

        info!("Triage loop shutting down");
    });

    (handle, shutdown_tx)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::LabelNames;
    use crate::error::ClassificationError;
    use crate::llm::TextGenerator;
    use crate::mailbox::InMemoryMailbox;

    struct AlwaysRespond;

    #[async_trait]
    impl TextGenerator for AlwaysRespond {
        fn name(&self) -> &str {
            "always"
        }
        async fn generate(&self, _: &str) -> Result<String, ClassificationError> {
            Ok(r#"{"requiresResponse": true}"#.into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_until_shutdown() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.add_thread("t1", "s", "b", &["Triage"]);
        let runner = Arc::new(TriageRunner::new(
            mailbox.clone(),
            Arc::new(AlwaysRespond),
            LabelNames::default(),
            5,
        ));

        let (handle, shutdown) = spawn_triage_loop(runner, Duration::from_secs(60));

        // Let the immediate first run complete.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(mailbox.labels_of("t1"), vec!["Processed", "ToRespond", "Triage"]);

        // New mail is picked up on the next tick.
        mailbox.add_thread("t2", "s", "b", &["Triage"]);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(mailbox.labels_of("t2").contains(&"Processed".to_string()));

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    /// Answers only after a delay, so a batch is still in flight when
    /// shutdown is requested.
    struct SlowRespond;

    #[async_trait]
    impl TextGenerator for SlowRespond {
        fn name(&self) -> &str {
            "slow"
        }
        async fn generate(&self, _: &str) -> Result<String, ClassificationError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(r#"{"requiresResponse": true}"#.into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_the_running_batch_finish() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.add_thread("t1", "s", "b", &["Triage"]);
        mailbox.add_thread("t2", "s", "b", &["Triage"]);
        let runner = Arc::new(TriageRunner::new(
            mailbox.clone(),
            Arc::new(SlowRespond),
            LabelNames::default(),
            5,
        ));

        let (handle, shutdown) = spawn_triage_loop(runner, Duration::from_secs(3600));

        // First generation call is still sleeping.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(mailbox.labels_of("t2"), vec!["Triage"]);

        shutdown.send(true).unwrap();
        handle.await.unwrap();

        for id in ["t1", "t2"] {
            assert_eq!(
                mailbox.labels_of(id),
                vec!["Processed", "ToRespond", "Triage"],
                "{id} left half-labelled"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_does_not_wait_for_the_next_tick() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        let runner = Arc::new(TriageRunner::new(
            mailbox,
            Arc::new(AlwaysRespond),
            LabelNames::default(),
            5,
        ));

        let (handle, shutdown) = spawn_triage_loop(runner, Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = tokio::time::Instant::now();
        drop(shutdown);
        handle.await.unwrap();
        assert!(tokio::time::Instant::now() - before < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn selection_failure_does_not_stop_the_loop() {
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox.add_thread("t1", "s", "b", &["Triage"]);
        mailbox.fail_search("offline");
        let runner = Arc::new(TriageRunner::new(
            mailbox.clone(),
            Arc::new(AlwaysRespond),
            LabelNames::default(),
            5,
        ));

        let (handle, shutdown) = spawn_triage_loop(runner, Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(mailbox.labels_of("t1"), vec!["Triage"]);

        mailbox.clear_failures();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(mailbox.labels_of("t1").contains(&"Processed".to_string()));

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }
}
