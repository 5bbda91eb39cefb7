use anyhow::{Context, Result};
use pulse_agent::{collect_all, AgentConfig, Reporter, SampleBuffer};
use pulse_common::shutdown;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => AgentConfig::default(),
    };
    config.apply_env()?;

    let reporter = Arc::new(Reporter::new(&config)?);
    let mut collectors = pulse_collector::registry();
    let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

    tracing::info!(
        server = %reporter.url(),
        poll_secs = config.poll_interval().as_secs(),
        report_secs = config.report_interval().as_secs(),
        collectors = collectors.len(),
        signed = !config.key.is_empty(),
        "pulse-agent starting"
    );

    let mut poll_tick = interval(config.poll_interval());
    poll_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let report_every = config.report_interval();
    let mut report_tick = interval_at(Instant::now() + report_every, report_every);
    report_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown::signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                let sampled = collect_all(&mut collectors);
                tracing::debug!(count = sampled.len(), "Collected metrics");
                buffer.lock().await.record(sampled);
            }
            _ = report_tick.tick() => {
                let batch = buffer.lock().await.take();
                let reporter = reporter.clone();
                tokio::spawn(async move {
                    reporter.report(batch).await;
                });
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down, sending final report");
                break;
            }
        }
    }

    let batch = buffer.lock().await.take();
    reporter.report(batch).await;
    tracing::info!("pulse-agent stopped");
    Ok(())
}
