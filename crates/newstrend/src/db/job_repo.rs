//! Job control tables: pause locks, run log and execution leases.
//!
//! `job_locks` is an operator-facing pause flag. `job_leases` is a short-lived
//! mutual-exclusion claim taken around a job body. The two never interact.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{optional_timestamp_column, timestamp_column, to_db_timestamp, Database, DatabaseError};

/// Lifecycle state of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// A row of `job_runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRunRow {
    pub run_id: i64,
    pub job_name: String,
    pub params_json: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub note: Option<String>,
}

impl JobRunRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let status = status.parse::<RunStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;
        Ok(Self {
            run_id: row.get("run_id")?,
            job_name: row.get("job_name")?,
            params_json: row.get("params_json")?,
            started_at: timestamp_column(row, 3)?,
            finished_at: optional_timestamp_column(row, 4)?,
            status,
            note: row.get("note")?,
        })
    }
}

const RUN_COLUMNS: &str =
    "run_id, job_name, params_json, started_at, finished_at, status, note";

// ---------------------------------------------------------------------------
// Pause locks
// ---------------------------------------------------------------------------

/// Whether a pause lock exists for the job.
pub fn is_paused(db: &Database, job_name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM job_locks WHERE job_name = ?1)",
            params![job_name],
            |r| r.get(0),
        )?;
        Ok(exists)
    })
}

/// Inserts a pause lock. Pausing an already-paused job is a no-op; returns
/// whether a new lock was written.
pub fn pause(db: &Database, job_name: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT INTO job_locks (job_name, locked_at) VALUES (?1, ?2)
             ON CONFLICT(job_name) DO NOTHING",
            params![job_name, to_db_timestamp(now)],
        )?;
        Ok(inserted > 0)
    })
}

/// Removes the pause lock. Returns whether a lock was removed.
pub fn resume(db: &Database, job_name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM job_locks WHERE job_name = ?1", params![job_name])?;
        Ok(deleted > 0)
    })
}

/// When the job was paused, if it is.
pub fn paused_since(db: &Database, job_name: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    db.with_conn(|conn| {
        let ts = conn
            .query_row(
                "SELECT locked_at FROM job_locks WHERE job_name = ?1",
                params![job_name],
                |row| timestamp_column(row, 0),
            )
            .optional()?;
        Ok(ts)
    })
}

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

/// Inserts a RUNNING row and returns its id.
pub fn start_run(
    db: &Database,
    job_name: &str,
    params_json: Option<&str>,
    started_at: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO job_runs (job_name, params_json, started_at, status)
             VALUES (?1, ?2, ?3, 'RUNNING')",
            params![job_name, params_json, to_db_timestamp(started_at)],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Moves a RUNNING row to a terminal status. Rows already terminal are left
/// untouched; returns whether this call performed the transition.
pub fn finish_run(
    db: &Database,
    run_id: i64,
    status: RunStatus,
    note: Option<&str>,
    finished_at: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE job_runs SET status = ?2, note = ?3, finished_at = ?4
             WHERE run_id = ?1 AND status = 'RUNNING'",
            params![run_id, status.as_str(), note, to_db_timestamp(finished_at)],
        )?;
        Ok(updated > 0)
    })
}

/// Finds a run by id.
pub fn find_run(db: &Database, run_id: i64) -> Result<Option<JobRunRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM job_runs WHERE run_id = ?1"),
                params![run_id],
                JobRunRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists the most recent runs of a job, newest first.
pub fn recent_runs(
    db: &Database,
    job_name: &str,
    limit: u32,
) -> Result<Vec<JobRunRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM job_runs WHERE job_name = ?1
             ORDER BY run_id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![job_name, limit], JobRunRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

// ---------------------------------------------------------------------------
// Leases
// ---------------------------------------------------------------------------

/// Claims the lease for `job_name` until `now + ttl`.
///
/// A live lease held by anyone, including `holder`, blocks the claim; an
/// expired one is taken over. Returns whether the claim succeeded.
pub fn try_acquire_lease(
    db: &Database,
    job_name: &str,
    holder: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT INTO job_leases (job_name, holder, acquired_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(job_name) DO UPDATE SET
               holder = excluded.holder,
               acquired_at = excluded.acquired_at,
               expires_at = excluded.expires_at
             WHERE job_leases.expires_at <= excluded.acquired_at",
            params![
                job_name,
                holder,
                to_db_timestamp(now),
                to_db_timestamp(now + ttl)
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Releases a lease if `holder` still owns it. Returns whether it was released.
pub fn release_lease(db: &Database, job_name: &str, holder: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM job_leases WHERE job_name = ?1 AND holder = ?2",
            params![job_name, holder],
        )?;
        Ok(deleted > 0)
    })
}

/// Current holder of a lease that has not expired at `now`.
pub fn lease_holder(
    db: &Database,
    job_name: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let holder = conn
            .query_row(
                "SELECT holder FROM job_leases WHERE job_name = ?1 AND expires_at > ?2",
                params![job_name, to_db_timestamp(now)],
                |r| r.get(0),
            )
            .optional()?;
        Ok(holder)
    })
}
