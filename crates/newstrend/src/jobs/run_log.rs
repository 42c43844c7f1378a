//! Audit trail of job executions.
//!
//! Every run starts as RUNNING and moves to SUCCESS or FAILED exactly once.
//! [`JobRunGuard`] makes that hold even when the body returns early or
//! panics: a guard dropped without a result marks its run FAILED.

use std::fmt;

use chrono::Utc;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::{self, JobRunRow, RunStatus};
use crate::db::Database;
use crate::error::Result;
use crate::sanitize::truncate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct RunLogger {
    db: Database,
}

impl RunLogger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records a RUNNING row. `Value::Null` params are stored as NULL.
    pub fn start(&self, job: &str, params: &serde_json::Value) -> Result<RunId> {
        let params_json = if params.is_null() {
            None
        } else {
            Some(params.to_string())
        };
        let id = job_repo::start_run(&self.db, job, params_json.as_deref(), Utc::now())?;
        Ok(RunId(id))
    }

    /// Marks a run SUCCESS. Returns `false` if it was already terminal.
    pub fn success(&self, run: RunId, note: &str) -> Result<bool> {
        self.finish(run, RunStatus::Success, note)
    }

    /// Marks a run FAILED. Returns `false` if it was already terminal.
    pub fn fail(&self, run: RunId, note: &str) -> Result<bool> {
        self.finish(run, RunStatus::Failed, note)
    }

    fn finish(&self, run: RunId, status: RunStatus, note: &str) -> Result<bool> {
        let note = truncate(note);
        let changed = job_repo::finish_run(&self.db, run.0, status, Some(&note), Utc::now())?;
        if !changed {
            warn!("Run {} was already finished, ignoring {}", run, status);
        }
        Ok(changed)
    }

    pub fn find(&self, run: RunId) -> Result<Option<JobRunRow>> {
        Ok(job_repo::find_run(&self.db, run.0)?)
    }

    /// Most recent runs of a job, newest first.
    pub fn recent(&self, job: &str, limit: u32) -> Result<Vec<JobRunRow>> {
        Ok(job_repo::recent_runs(&self.db, job, limit)?)
    }

    /// Starts a run and returns a guard that finishes it.
    pub fn begin(&self, job: &str, params: &serde_json::Value) -> Result<JobRunGuard> {
        let run_id = self.start(job, params)?;
        Ok(JobRunGuard {
            logger: self.clone(),
            run_id,
            job: job.to_string(),
            finished: false,
        })
    }
}

/// Brackets one run. Consume it with [`succeed`](Self::succeed) or
/// [`fail`](Self::fail).
pub struct JobRunGuard {
    logger: RunLogger,
    run_id: RunId,
    job: String,
    finished: bool,
}

impl JobRunGuard {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn succeed(mut self, note: &str) -> Result<bool> {
        self.finished = true;
        self.logger.success(self.run_id, note)
    }

    pub fn fail(mut self, note: &str) -> Result<bool> {
        self.finished = true;
        self.logger.fail(self.run_id, note)
    }
}

impl Drop for JobRunGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.logger.fail(self.run_id, "Run ended without a result") {
            error!("Failed to close run {} of '{}': {}", self.run_id, self.job, e);
        }
    }
}
