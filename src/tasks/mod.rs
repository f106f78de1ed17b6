//! Post-response background work.
//!
//! Handlers hand a [`Job`] to the [`TaskRunner`] and return immediately. A
//! dispatcher drains a bounded queue and runs at most `workers` jobs at once
//! on the shared runtime. Jobs are one-shot: failures are logged and counted,
//! never retried and never reported back to the request that queued them.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Notify, Semaphore,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::TaskConfig;

pub mod jobs;

pub use jobs::{Job, JobContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// Queued or running.
    pub pending: usize,
    pub running: usize,
    pub succeeded: u64,
    pub failed: u64,
    /// Dropped at enqueue because the queue was full.
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    running: AtomicUsize,
    succeeded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    idle: Notify,
}

impl Counters {
    fn release_pending(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Decrements the gauges even if the job panics. A job that never reached
/// `finish` is counted as failed.
struct RunningGuard {
    counters: Arc<Counters>,
    finished: bool,
}

impl RunningGuard {
    fn new(counters: Arc<Counters>) -> Self {
        counters.running.fetch_add(1, Ordering::SeqCst);
        Self {
            counters,
            finished: false,
        }
    }

    fn finish(mut self, ok: bool) {
        let outcome = if ok {
            &self.counters.succeeded
        } else {
            &self.counters.failed
        };
        outcome.fetch_add(1, Ordering::SeqCst);
        self.finished = true;
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            error!("background job aborted");
        }
        self.counters.running.fetch_sub(1, Ordering::SeqCst);
        self.counters.release_pending();
    }
}

#[derive(Clone)]
pub struct TaskRunner {
    tx: mpsc::Sender<Job>,
    counters: Arc<Counters>,
}

impl TaskRunner {
    /// Spawns the dispatcher; must be called inside a tokio runtime.
    pub fn start(ctx: JobContext, cfg: &TaskConfig) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let counters = Arc::new(Counters::default());
        let permits = Arc::new(Semaphore::new(cfg.workers));

        tokio::spawn(dispatch(rx, ctx, permits, counters.clone()));
        info!(workers = cfg.workers, capacity = cfg.queue_capacity, "task runner started");

        Self { tx, counters }
    }

    /// Queues a job without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, job: Job) -> bool {
        let name = job.name();
        self.counters.pending.fetch_add(1, Ordering::SeqCst);

        match self.tx.try_send(job) {
            Ok(()) => {
                debug!(job = name, "job queued");
                true
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::SeqCst);
                self.counters.release_pending();
                match e {
                    TrySendError::Full(_) => warn!(job = name, "task queue full; job dropped"),
                    TrySendError::Closed(_) => error!(job = name, "task runner stopped; job dropped"),
                }
                false
            }
        }
    }

    pub fn stats(&self) -> TaskStats {
        let c = &self.counters;
        TaskStats {
            pending: c.pending.load(Ordering::SeqCst),
            running: c.running.load(Ordering::SeqCst),
            succeeded: c.succeeded.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
            rejected: c.rejected.load(Ordering::SeqCst),
        }
    }

    /// Resolves once nothing is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            if self.counters.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<Job>,
    ctx: JobContext,
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
) {
    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            counters.release_pending();
            break;
        };
        let ctx = ctx.clone();
        let counters = counters.clone();
        let name = job.name();

        tokio::spawn(
            async move {
                let _permit = permit;
                let guard = RunningGuard::new(counters);

                match job.run(&ctx).await {
                    Ok(()) => {
                        guard.finish(true);
                        info!("background job done");
                    }
                    Err(e) => {
                        guard.finish(false);
                        let cause = format!("{e:#}");
                        error!(error = %cause, "background job failed");
                    }
                }
            }
            .instrument(info_span!("job", job = name)),
        );
    }
    debug!("task queue closed");
}
