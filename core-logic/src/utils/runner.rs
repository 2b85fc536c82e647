use crate::metrics::MetricsCollector;
use crate::traits::{Worker, WorkerStats};
use anyhow::Result;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

pub struct WorkerRunner;

impl WorkerRunner {
    /// Spawns every worker as its own task and waits until all of them stop.
    /// Ctrl+C cancels all workers.
    pub async fn run_workers(workers: Vec<Box<dyn Worker>>) -> Result<WorkerStats> {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!(target: "farm_event", "🛑 Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        Self::run_workers_until(workers, token).await
    }

    /// Same as [`WorkerRunner::run_workers`] but driven by an external token.
    pub async fn run_workers_until(
        workers: Vec<Box<dyn Worker>>,
        token: CancellationToken,
    ) -> Result<WorkerStats> {
        let mut set = JoinSet::new();
        let start_time = std::time::Instant::now();
        info!(target: "farm_event", "Starting {} workers...", workers.len());

        for (i, worker) in workers.into_iter().enumerate() {
            let id = i + 1;
            let span = tracing::info_span!("worker", worker_id = format!("{:03}", id));
            let child_token = token.clone();

            set.spawn(
                async move {
                    let label = worker.label();
                    match worker.start(child_token).await {
                        Ok(stats) => Ok(stats),
                        Err(e) => {
                            error!(target: "farm_event", "{} | FAILED, worker stopped: {:#}", label, e);
                            Err(e)
                        }
                    }
                }
                .instrument(span),
            );
        }

        let mut total = WorkerStats::default();
        let mut stopped_with_error = 0u64;

        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(stats)) => total += stats,
                Ok(Err(_)) => {
                    // Already logged in the worker task
                    stopped_with_error += 1;
                }
                Err(e) => {
                    stopped_with_error += 1;
                    error!("A worker task panicked or failed to join: {:?}", e);
                }
            }
        }

        info!(target: "farm_event", "🛑 Shutdown Complete.");
        info!(
            target: "farm_event",
            "Total Time: {:.1}s | Logins: {} | Polls: {} | Relogins: {} | Workers stopped with error: {}",
            start_time.elapsed().as_secs_f64(),
            total.logins,
            total.polls,
            total.relogins,
            stopped_with_error
        );
        info!(target: "farm_event", "Metrics: {}", MetricsCollector::global().to_compact_json());

        Ok(total)
    }
}
