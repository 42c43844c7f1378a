//! Periodic job loops.
//!
//! Each job gets its own thread with a current-thread Tokio runtime and an
//! interval timer. The first, immediate tick is skipped so a restart does not
//! fire every job at once. Loops wake on their timer, on a manual trigger for
//! their job, or on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

use super::runner::{Firing, Job, JobRunner};
use super::tasks::{AggregationJob, ExtractionJob, PreprocessJob, PurgeJob};
use crate::config::Config;
use crate::pipeline::KeywordExtractor;
use crate::trend::TrendAggregator;

#[derive(Debug, Clone)]
enum Wake {
    Run(String),
    Shutdown,
}

struct Entry {
    job: Arc<dyn Job>,
    interval: Duration,
}

pub struct Scheduler {
    runner: JobRunner,
    entries: Vec<Entry>,
    shutdown: Arc<AtomicBool>,
    wake: broadcast::Sender<Wake>,
}

impl Scheduler {
    pub fn new(runner: JobRunner) -> Self {
        let (wake, _) = broadcast::channel(16);
        Self {
            runner,
            entries: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake,
        }
    }

    /// The four standard jobs with the configured intervals and windows.
    pub fn from_config(
        runner: JobRunner,
        config: &Config,
        extractor: Arc<KeywordExtractor>,
        aggregator: Arc<TrendAggregator>,
    ) -> Self {
        let schedule = &config.scheduler;
        Self::new(runner)
            .with_job(
                Arc::new(PreprocessJob::new(
                    Arc::clone(&extractor),
                    config.pipeline.preprocess_batch_size,
                )),
                Duration::from_secs(schedule.preprocess_interval_secs),
            )
            .with_job(
                Arc::new(ExtractionJob::scheduled(
                    extractor,
                    config.pipeline.lookback_hours,
                    config.pipeline.lookahead_hours,
                )),
                Duration::from_secs(schedule.extraction_interval_secs),
            )
            .with_job(
                Arc::new(AggregationJob::scheduled(
                    Arc::clone(&aggregator),
                    config.trend.window_hours,
                )),
                Duration::from_secs(schedule.aggregation_interval_secs),
            )
            .with_job(
                Arc::new(PurgeJob::scheduled(aggregator)),
                Duration::from_secs(schedule.purge_interval_secs),
            )
    }

    pub fn with_job(mut self, job: Arc<dyn Job>, interval: Duration) -> Self {
        self.entries.push(Entry { job, interval });
        self
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.job.name()).collect()
    }

    /// Starts one background thread per job.
    pub fn start(&self) -> std::io::Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let job = Arc::clone(&entry.job);
            let runner = self.runner.clone();
            let shutdown = Arc::clone(&self.shutdown);
            let wake_rx = self.wake.subscribe();
            let period = entry.interval;

            log::info!("Scheduling '{}' every {:?}", job.name(), period);
            let handle = std::thread::Builder::new()
                .name(format!("job-{}", job.name()))
                .spawn(move || run_loop(job, runner, period, shutdown, wake_rx))?;
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Fires a job's loop right away. Returns `false` if no loop is listening.
    pub fn trigger(&self, job: &str) -> bool {
        self.wake.send(Wake::Run(job.to_string())).is_ok()
    }

    /// Signals every loop to stop. A run in progress finishes first.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.wake.send(Wake::Shutdown);
    }
}

fn run_loop(
    job: Arc<dyn Job>,
    runner: JobRunner,
    period: Duration,
    shutdown: Arc<AtomicBool>,
    mut wake_rx: broadcast::Receiver<Wake>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to start runtime for '{}': {}", job.name(), e);
            return;
        }
    };

    rt.block_on(async {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // skip immediate first tick

        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {},
                msg = wake_rx.recv() => match msg {
                    Ok(Wake::Run(name)) if name == job.name() => {
                        log::info!("Manual trigger for '{}'", name);
                    }
                    Ok(Wake::Run(_)) | Err(RecvError::Lagged(_)) => continue,
                    Ok(Wake::Shutdown) | Err(RecvError::Closed) => break,
                },
            }

            if shutdown.load(Ordering::Acquire) {
                break;
            }

            // A separate task, so a panicking body is reported as a join
            // error instead of unwinding through this loop.
            let firing = {
                let runner = runner.clone();
                let job = Arc::clone(&job);
                tokio::spawn(async move { runner.fire(job.as_ref()).await })
            };
            match firing.await {
                Ok(Ok(Firing::Finished(run_id))) => {
                    log::debug!("'{}' finished run {}", job.name(), run_id)
                }
                Ok(Ok(Firing::Paused)) | Ok(Ok(Firing::Busy)) => {}
                Ok(Err(e)) => log::error!("Scheduled job '{}' failed: {}", job.name(), e),
                Err(e) if e.is_panic() => log::error!("Scheduled job '{}' panicked", job.name()),
                Err(e) => log::error!("Scheduled job '{}' was cancelled: {}", job.name(), e),
            }
        }
    });
    log::info!("Stopped '{}' loop", job.name());
}
