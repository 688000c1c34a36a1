//! In-process periodic job runner.
//!
//! Each registered job ticks on its own interval (first tick immediately).
//! Every tick hands one invocation to the blocking pool without waiting for
//! the previous one, so slow runs can overlap. Failures are logged and
//! never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

/// A unit of periodic work. `run` is synchronous and may block.
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn run(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PeriodicJob {
    pub job: Arc<dyn Job>,
    pub every: Duration,
}

#[derive(Default)]
pub struct Scheduler {
    entries: Vec<PeriodicJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every(mut self, every: Duration, job: impl Job) -> Self {
        self.add(every, Arc::new(job));
        self
    }

    pub fn add(&mut self, every: Duration, job: Arc<dyn Job>) {
        self.entries.push(PeriodicJob { job, every });
    }

    pub fn entries(&self) -> &[PeriodicJob] {
        &self.entries
    }

    /// Tick every entry until `shutdown` resolves. Invocations already
    /// running at shutdown are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tickers = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            tracing::info!(
                job = entry.job.name(),
                every_secs = entry.every.as_secs_f64(),
                "Registered periodic job"
            );
            tickers.push(tokio::spawn(tick_forever(entry)));
        }

        shutdown.await;
        tracing::info!("Scheduler shutting down");

        for ticker in tickers {
            ticker.abort();
        }
    }
}

async fn tick_forever(entry: PeriodicJob) {
    let mut interval = tokio::time::interval(entry.every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let job = entry.job.clone();
        tokio::task::spawn_blocking(move || execute(job.as_ref()));
    }
}

/// Run one invocation, logging its outcome. Returns whether it succeeded.
pub fn execute(job: &dyn Job) -> bool {
    let started = Instant::now();
    tracing::debug!(job = job.name(), "Job started");
    match job.run() {
        Ok(()) => {
            tracing::info!(
                job = job.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job succeeded"
            );
            true
        }
        Err(e) => {
            tracing::error!(job = job.name(), "Job failed: {:#}", e);
            false
        }
    }
}
