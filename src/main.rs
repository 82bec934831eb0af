use std::sync::Arc;

use anyhow::Context;

use inbox_triage::config::{GmailConfig, TriageConfig};
use inbox_triage::llm::GeminiClient;
use inbox_triage::mailbox::GmailMailbox;
use inbox_triage::pipeline::TriageRunner;
use inbox_triage::pipeline::scheduler::spawn_triage_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (config, gmail_config) = load_config().context("loading configuration")?;

    eprintln!("📬 Inbox Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.gemini.endpoint);
    eprintln!(
        "   Labels: include '{}', processed '{}', respond '{}'",
        config.labels.inclusion, config.labels.processed, config.labels.to_respond
    );
    eprintln!("   Batch size: {}", config.batch_size);

    let mailbox = Arc::new(GmailMailbox::new(&gmail_config));
    let generator = Arc::new(GeminiClient::new(&config.gemini));
    let runner = Arc::new(TriageRunner::new(
        mailbox,
        generator,
        config.labels.clone(),
        config.batch_size,
    ));

    match config.interval {
        Some(interval) => {
            eprintln!("   Schedule: every {}s (Ctrl-C to stop)\n", interval.as_secs());
            let (handle, shutdown) = spawn_triage_loop(runner, interval);
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            eprintln!("   Stopping after the current batch...");
            let _ = shutdown.send(true);
            handle.await.context("waiting for triage loop")?;
        }
        None => {
            eprintln!("   Schedule: single run\n");
            run_once(&runner).await?;
        }
    }

    Ok(())
}

fn load_config() -> inbox_triage::error::Result<(TriageConfig, GmailConfig)> {
    Ok((TriageConfig::from_env()?, GmailConfig::from_env()?))
}

async fn run_once(runner: &TriageRunner) -> inbox_triage::error::Result<()> {
    let report = runner.run().await?;
    eprintln!(
        "   Done: {} selected, {} labeled ({} need a reply), {} failed",
        report.selected(),
        report.labeled(),
        report.needs_response(),
        report.failed()
    );
    Ok(())
}
