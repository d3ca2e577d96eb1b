use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use stress_probe::{DispatchEngine, EngineConfig, EngineError, RunOutcome};
use tracing::{info, warn};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "http-stress-probe")]
#[command(about = "Concurrent HTTP GET load probe", long_about = None)]
struct Config {
    /// Target URL
    #[arg(long, env = "TARGET_URL")]
    url: String,

    /// Total number of GET requests to issue
    #[arg(short = 'n', long, env = "TOTAL_REQUESTS", default_value = "1000")]
    requests: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "300")]
    timeout: u64,

    /// Runtime worker threads (defaults to the number of cores)
    #[arg(long, env = "WORKER_THREADS")]
    worker_threads: Option<usize>,
}

// =============================================================================
// Run Driver
// =============================================================================

/// Waits for the run, cancelling it if `interrupt` fires first.
///
/// A failed signal listener leaves the run alone.
async fn drive<S>(engine: &DispatchEngine, interrupt: S) -> Result<RunOutcome, EngineError>
where
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        outcome = engine.wait() => outcome,
        signal = interrupt => match signal {
            Ok(()) => {
                warn!("Interrupt received, cancelling run");
                engine.cancel()?;
                engine.wait().await
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl-C, run cannot be interrupted: {}", e);
                engine.wait().await
            }
        },
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let engine_config = EngineConfig::new(&config.url, config.requests)
        .context("Invalid run configuration")?
        .with_request_timeout(Duration::from_secs(config.timeout))
        .context("Invalid request timeout")?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }
    let runtime = builder
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    info!("════════════════════════════════════════════════════════════");
    info!("                  HTTP STRESS PROBE");
    info!("════════════════════════════════════════════════════════════");
    info!("Target: {}", engine_config.url());
    info!("Requests: {}", engine_config.total_requests());
    info!("Request timeout: {}s", config.timeout);
    info!("════════════════════════════════════════════════════════════");

    let engine = DispatchEngine::with_config(
        runtime.handle().clone(),
        engine_config,
        |completed, total| {
            info!(
                "Progress: {}/{} ({:.0}%)",
                completed,
                total,
                completed as f64 * 100.0 / total as f64
            );
        },
    );

    let started = Instant::now();
    engine.start().context("Failed to start run")?;

    let outcome = runtime
        .block_on(drive(&engine, tokio::signal::ctrl_c()))
        .context("Run did not finish cleanly")?;

    let elapsed = started.elapsed();
    let completed = engine.completed();

    info!("════════════════════════════════════════════════════════════");
    info!("Outcome: {:?}", outcome);
    info!("Completed: {}/{}", completed, engine.total());
    info!("Elapsed: {:.2}s", elapsed.as_secs_f64());
    if elapsed.as_secs_f64() > 0.0 {
        info!(
            "Throughput: {:.1} req/s",
            completed as f64 / elapsed.as_secs_f64()
        );
    }
    info!("════════════════════════════════════════════════════════════");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;
    use tokio::runtime::Handle;

    fn engine(total: u64) -> DispatchEngine {
        DispatchEngine::new(Handle::current(), "http://127.0.0.1:1/", total, |_, _| {}).unwrap()
    }

    #[tokio::test]
    async fn signal_listener_failure_lets_run_finish() {
        let engine = engine(3);
        engine.start().unwrap();

        let outcome = drive(&engine, ready(Err(io::Error::other("no signal handler"))))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(engine.completed(), 3);
    }

    #[tokio::test]
    async fn interrupt_cancels_run() {
        let engine = engine(200);
        engine.start().unwrap();

        let outcome = drive(&engine, ready(Ok(()))).await.unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
    }
}
