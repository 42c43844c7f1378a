//! Persistent pause switch per job.
//!
//! The gate is advisory: it is consulted by the scheduler before a body runs
//! and never interrupts a run that has already started. Overlap between two
//! runs of the same job is the lease's concern, not the gate's.

use chrono::{DateTime, Utc};
use log::info;

use crate::db::job_repo;
use crate::db::Database;
use crate::error::Result;

#[derive(Clone)]
pub struct JobGate {
    db: Database,
}

impl JobGate {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn is_paused(&self, job: &str) -> Result<bool> {
        Ok(job_repo::is_paused(&self.db, job)?)
    }

    /// Pauses a job. Returns `false` if it was already paused.
    pub fn pause(&self, job: &str) -> Result<bool> {
        let changed = job_repo::pause(&self.db, job, Utc::now())?;
        if changed {
            info!("Paused job '{}'", job);
        }
        Ok(changed)
    }

    /// Resumes a job. Returns `false` if it was not paused.
    pub fn resume(&self, job: &str) -> Result<bool> {
        let changed = job_repo::resume(&self.db, job)?;
        if changed {
            info!("Resumed job '{}'", job);
        }
        Ok(changed)
    }

    pub fn paused_since(&self, job: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(job_repo::paused_since(&self.db, job)?)
    }
}
