//! Short-lived exclusive claims on a job name.

use chrono::{Duration, Utc};
use log::{debug, warn};

use crate::db::job_repo;
use crate::db::Database;
use crate::error::Result;

const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Converts configured seconds into a lease lifetime, capped at a century so
/// `now + ttl` stays representable.
pub fn ttl_from_secs(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX).min(MAX_TTL_SECS))
}

pub struct LeaseManager {
    db: Database,
    holder: String,
    ttl: Duration,
}

impl LeaseManager {
    /// A manager with a fresh random holder identity for this process.
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self::with_holder(db, format!("newstrend-{}", uuid::Uuid::new_v4()), ttl)
    }

    pub fn with_holder(db: Database, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            db,
            holder: holder.into(),
            ttl,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Claims the lease for `job`. Fails while any unexpired lease exists,
    /// including one held by this manager.
    pub fn try_acquire(&self, job: &str) -> Result<bool> {
        let acquired = job_repo::try_acquire_lease(&self.db, job, &self.holder, Utc::now(), self.ttl)?;
        if !acquired {
            debug!("Lease for '{}' is held elsewhere", job);
        }
        Ok(acquired)
    }

    /// Claims the lease for `job` and returns a guard that releases it when
    /// dropped, including while unwinding from a panicking job body.
    pub fn acquire(&self, job: &str) -> Result<Option<LeaseGuard<'_>>> {
        if !self.try_acquire(job)? {
            return Ok(None);
        }
        Ok(Some(LeaseGuard {
            leases: self,
            job: job.to_string(),
        }))
    }

    pub fn release(&self, job: &str) -> Result<bool> {
        let released = job_repo::release_lease(&self.db, job, &self.holder)?;
        if !released {
            warn!("Lease for '{}' was no longer held by {}", job, self.holder);
        }
        Ok(released)
    }

    pub fn current_holder(&self, job: &str) -> Result<Option<String>> {
        Ok(job_repo::lease_holder(&self.db, job, Utc::now())?)
    }
}

/// A held lease, released on drop.
pub struct LeaseGuard<'a> {
    leases: &'a LeaseManager,
    job: String,
}

impl LeaseGuard<'_> {
    pub fn job(&self) -> &str {
        &self.job
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.leases.release(&self.job) {
            warn!("Failed to release lease for '{}': {}", self.job, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_holder_is_blocked_until_release() {
        let db = Database::open_in_memory().unwrap();
        let a = LeaseManager::with_holder(db.clone(), "a", Duration::minutes(30));
        let b = LeaseManager::with_holder(db, "b", Duration::minutes(30));

        assert!(a.try_acquire("analyze_keywords").unwrap());
        assert!(!b.try_acquire("analyze_keywords").unwrap());
        assert!(!a.try_acquire("analyze_keywords").unwrap());
        assert_eq!(b.current_holder("analyze_keywords").unwrap().as_deref(), Some("a"));

        assert!(!b.release("analyze_keywords").unwrap());
        assert!(a.release("analyze_keywords").unwrap());
        assert!(b.try_acquire("analyze_keywords").unwrap());
    }

    #[test]
    fn test_expired_lease_is_taken_over() {
        let db = Database::open_in_memory().unwrap();
        let stale = LeaseManager::with_holder(db.clone(), "stale", Duration::zero());
        let fresh = LeaseManager::with_holder(db, "fresh", Duration::minutes(5));

        assert!(stale.try_acquire("purge_trend_snapshot").unwrap());
        assert!(fresh.try_acquire("purge_trend_snapshot").unwrap());
        assert_eq!(
            fresh.current_holder("purge_trend_snapshot").unwrap().as_deref(),
            Some("fresh")
        );
    }

    #[test]
    fn test_ttl_is_capped() {
        assert_eq!(ttl_from_secs(90), Duration::seconds(90));
        assert_eq!(ttl_from_secs(u64::MAX), Duration::seconds(MAX_TTL_SECS));
    }

    #[test]
    fn test_generated_holders_differ() {
        let db = Database::open_in_memory().unwrap();
        let a = LeaseManager::new(db.clone(), Duration::minutes(1));
        let b = LeaseManager::new(db, Duration::minutes(1));
        assert_ne!(a.holder(), b.holder());
        assert!(a.holder().starts_with("newstrend-"));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let db = Database::open_in_memory().unwrap();
        let leases = LeaseManager::with_holder(db.clone(), "a", Duration::minutes(30));
        let other = LeaseManager::with_holder(db, "b", Duration::minutes(30));

        {
            let guard = leases.acquire("aggregate_trend_24h").unwrap().unwrap();
            assert_eq!(guard.job(), "aggregate_trend_24h");
            assert!(other.acquire("aggregate_trend_24h").unwrap().is_none());
        }
        assert!(leases.current_holder("aggregate_trend_24h").unwrap().is_none());
        assert!(other.acquire("aggregate_trend_24h").unwrap().is_some());
    }
}
