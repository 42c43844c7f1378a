//! One firing of a job: gate check, lease, run log bracket.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};

use super::gate::JobGate;
use super::lease::LeaseManager;
use super::run_log::{RunId, RunLogger};
use crate::db::Database;
use crate::error::{NewstrendError, Result};

/// A unit of work the scheduler or the admin surface can run.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// The lease this job runs under. Jobs touching the same data share a
    /// key so they never overlap.
    fn lease_key(&self) -> &str {
        self.name()
    }

    /// Parameters recorded with the run.
    fn params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Runs the body and returns the note stored on success.
    async fn execute(&self) -> Result<String>;
}

/// What happened when a job was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// The gate was closed; no run was recorded.
    Paused,
    /// Another holder owns the lease; no run was recorded.
    Busy,
    Finished(RunId),
}

#[derive(Clone)]
pub struct JobRunner {
    gate: JobGate,
    runs: RunLogger,
    leases: Arc<LeaseManager>,
}

impl JobRunner {
    pub fn new(db: Database, lease_ttl: chrono::Duration) -> Self {
        Self::with_leases(db.clone(), LeaseManager::new(db, lease_ttl))
    }

    pub fn with_leases(db: Database, leases: LeaseManager) -> Self {
        Self {
            gate: JobGate::new(db.clone()),
            runs: RunLogger::new(db),
            leases: Arc::new(leases),
        }
    }

    pub fn gate(&self) -> &JobGate {
        &self.gate
    }

    pub fn runs(&self) -> &RunLogger {
        &self.runs
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Scheduled firing: skipped while the job is paused.
    ///
    /// A failing body is recorded as FAILED and returned as
    /// [`NewstrendError::Job`].
    pub async fn fire(&self, job: &dyn Job) -> Result<Firing> {
        if self.gate.is_paused(job.name())? {
            info!("Job '{}' is paused, skipping", job.name());
            return Ok(Firing::Paused);
        }
        self.run_leased(job).await
    }

    /// Manual firing: ignores the pause gate but still takes the lease.
    pub async fn fire_ungated(&self, job: &dyn Job) -> Result<Firing> {
        self.run_leased(job).await
    }

    async fn run_leased(&self, job: &dyn Job) -> Result<Firing> {
        let Some(_lease) = self.leases.acquire(job.lease_key())? else {
            info!(
                "Job '{}' skipped, lease '{}' is held elsewhere",
                job.name(),
                job.lease_key()
            );
            return Ok(Firing::Busy);
        };
        self.bracket(job).await
    }

    async fn bracket(&self, job: &dyn Job) -> Result<Firing> {
        let guard = self.runs.begin(job.name(), &job.params())?;
        let run_id = guard.run_id();

        match job.execute().await {
            Ok(note) => {
                guard.succeed(&note)?;
                info!("Job '{}' run {} succeeded: {}", job.name(), run_id, note);
                Ok(Firing::Finished(run_id))
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(log_err) = guard.fail(&message) {
                    warn!("Failed to record failure of run {}: {}", run_id, log_err);
                }
                Err(NewstrendError::Job {
                    job: job.name().to_string(),
                    run_id: run_id.0,
                    message,
                })
            }
        }
    }
}
