// src/metrics.rs

//! Server performance metrics: the feed trait and the background ticker.
//!
//! The engine only consumes metrics; producing them is the host
//! simulation's problem. A sample may be partial (either field missing) and
//! sampling may fail entirely; both are treated as "no signal this round",
//! never as a job failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::job::JobHandle;
use crate::throttle;

/// One periodic observation of the host simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSample {
    /// Milliseconds per simulation tick; lower means more slack.
    pub mspt: Option<f64>,
    /// Ticks per second the simulation is achieving.
    pub tps: Option<f64>,
}

impl MetricsSample {
    pub fn new(mspt: impl Into<Option<f64>>, tps: impl Into<Option<f64>>) -> Self {
        Self {
            mspt: mspt.into(),
            tps: tps.into(),
        }
    }
}

/// Pull source for metrics samples.
///
/// Production code wraps whatever the server bridge exposes; tests provide
/// scripted implementations.
pub trait MetricsSource: Send + Sync {
    /// Pull one sample. May be slow; may fail. A failure is transient and
    /// only skips that round's throttle evaluation.
    fn sample(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<MetricsSample>> + Send + '_>>;
}

/// Handle for a running metrics ticker.
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the
/// ticker running; it still exits on its own once the job reaches a
/// terminal state, so it cannot outlive the job it watches.
#[derive(Debug)]
pub struct MetricsTickerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl MetricsTickerHandle {
    /// Stop the ticker. Idempotent; the background task winds down at its
    /// next loop turn.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // A closed receiver just means the ticker already exited.
            let _ = stop.send(());
        }
        self.task.abort();
    }
}

impl Drop for MetricsTickerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a standing ticker that samples `source` every `interval` and feeds
/// the result through the throttle controller against `job`.
///
/// This lets a job react to degrading server performance even while no
/// batch is completing (e.g. during a long pause). The loop exits when:
/// - the stop signal fires ([`MetricsTickerHandle::stop`]), or
/// - the job reaches a terminal state.
pub fn spawn_metrics_ticker(
    job: Arc<JobHandle>,
    source: Arc<dyn MetricsSource>,
    interval: Duration,
) -> MetricsTickerHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let job_id = job.id();

    let task = tokio::spawn(async move {
        info!(job = %job_id, interval_ms = interval.as_millis() as u64, "metrics ticker started");
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the ticker observes
        // the configured cadence from the start.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    debug!(job = %job_id, "metrics ticker stop requested");
                    break;
                }
                _ = ticker.tick() => {
                    if job.is_terminal() {
                        debug!(job = %job_id, "job terminal; metrics ticker exiting");
                        break;
                    }
                    match source.sample().await {
                        Ok(sample) => {
                            throttle::apply_sample(&job, &sample);
                        }
                        Err(err) => {
                            debug!(
                                job = %job_id,
                                error = %err,
                                "metrics sample failed; keeping previous throttle"
                            );
                        }
                    }
                }
            }
        }

        info!(job = %job_id, "metrics ticker finished");
    });

    MetricsTickerHandle {
        stop: Some(stop_tx),
        task,
    }
}
