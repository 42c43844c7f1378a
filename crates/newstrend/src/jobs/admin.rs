//! Operator surface: manual runs, pause control and status.
//!
//! Manual runs bypass the pause gate (pausing only silences the scheduler)
//! but are logged in the run table under their own job names, so the
//! returned [`RunId`] can be looked up with [`AdminService::run`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::names;
use super::run_log::RunId;
use super::runner::{Firing, Job, JobRunner};
use super::tasks::{AggregationJob, ExtractionJob, PurgeJob};
use crate::db::job_repo::JobRunRow;
use crate::error::{NewstrendError, Result};
use crate::pipeline::KeywordExtractor;
use crate::trend::TrendAggregator;
use crate::window::TimeWindow;

/// Pause state and latest run of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job: String,
    pub paused: bool,
    pub paused_since: Option<DateTime<Utc>>,
    pub last_run: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl From<JobRunRow> for RunSummary {
    fn from(row: JobRunRow) -> Self {
        Self {
            run_id: RunId(row.run_id),
            status: row.status.to_string(),
            started_at: row.started_at,
            finished_at: row.finished_at,
            note: row.note,
        }
    }
}

pub struct AdminService {
    runner: JobRunner,
    extractor: Arc<KeywordExtractor>,
    aggregator: Arc<TrendAggregator>,
}

impl AdminService {
    pub fn new(
        runner: JobRunner,
        extractor: Arc<KeywordExtractor>,
        aggregator: Arc<TrendAggregator>,
    ) -> Self {
        Self {
            runner,
            extractor,
            aggregator,
        }
    }

    /// Extracts keywords for `[from, to)`. With `force`, scores and
    /// processed content in the range are cleared first.
    pub async fn run_extraction(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        force: bool,
    ) -> Result<RunId> {
        let window = TimeWindow::new(from, to)?;
        let job = ExtractionJob::manual(Arc::clone(&self.extractor), window, force);
        self.run_manual(&job).await
    }

    /// Builds snapshots for `[from, to)`, optionally replacing existing ones.
    pub async fn run_aggregation(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        wipe_existing: bool,
    ) -> Result<RunId> {
        let window = TimeWindow::new(from, to)?;
        let job = AggregationJob::manual(Arc::clone(&self.aggregator), window, wipe_existing);
        self.run_manual(&job).await
    }

    /// Deletes snapshots older than `keep_hours` (non-positive means the
    /// configured retention).
    pub async fn purge_snapshots(&self, keep_hours: i64) -> Result<RunId> {
        let job = PurgeJob::manual(Arc::clone(&self.aggregator), keep_hours);
        self.run_manual(&job).await
    }

    /// A body failure still yields the run id; its row carries the error.
    async fn run_manual(&self, job: &dyn Job) -> Result<RunId> {
        match self.runner.fire_ungated(job).await {
            Ok(Firing::Finished(run_id)) => Ok(run_id),
            Ok(Firing::Busy) | Ok(Firing::Paused) => Err(NewstrendError::JobBusy {
                job: job.name().to_string(),
            }),
            Err(NewstrendError::Job { run_id, message, .. }) => {
                log::warn!("Manual run {} of '{}' failed: {}", run_id, job.name(), message);
                Ok(RunId(run_id))
            }
            Err(e) => Err(e),
        }
    }

    pub fn pause(&self, job: &str) -> Result<JobStatus> {
        warn_if_unknown(job);
        self.runner.gate().pause(job)?;
        self.status(job)
    }

    pub fn resume(&self, job: &str) -> Result<JobStatus> {
        warn_if_unknown(job);
        self.runner.gate().resume(job)?;
        self.status(job)
    }

    pub fn status(&self, job: &str) -> Result<JobStatus> {
        let gate = self.runner.gate();
        let paused_since = gate.paused_since(job)?;
        let last_run = self
            .runner
            .runs()
            .recent(job, 1)?
            .into_iter()
            .next()
            .map(RunSummary::from);
        Ok(JobStatus {
            job: job.to_string(),
            paused: paused_since.is_some(),
            paused_since,
            last_run,
        })
    }

    /// Status of every scheduled job.
    pub fn status_all(&self) -> Result<Vec<JobStatus>> {
        names::SCHEDULED_JOBS
            .iter()
            .map(|job| self.status(job))
            .collect()
    }

    pub fn run(&self, run_id: RunId) -> Result<Option<RunSummary>> {
        Ok(self.runner.runs().find(run_id)?.map(RunSummary::from))
    }
}

fn warn_if_unknown(job: &str) {
    if !names::is_scheduled(job) {
        log::warn!("'{}' is not a scheduled job; the gate has no effect on it", job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzeRequest, AnalyzeResponse, AnalyzerError, KeywordAnalyzer, KeywordScore};
    use crate::db::article_repo::{self, NewArticle};
    use crate::db::{keyword_repo, trend_repo, Database};
    use crate::nlp::TermExtractor;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    struct FixedAnalyzer;

    #[async_trait]
    impl KeywordAnalyzer for FixedAnalyzer {
        async fn analyze(
            &self,
            _request: &AnalyzeRequest,
        ) -> std::result::Result<Option<AnalyzeResponse>, AnalyzerError> {
            Ok(Some(AnalyzeResponse {
                keywords: Some(vec![KeywordScore {
                    word: Some("반도체".to_string()),
                    score: 0.4,
                }]),
                ..Default::default()
            }))
        }
    }

    fn day() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        (start, start + Duration::hours(24))
    }

    fn service(db: &Database) -> AdminService {
        let extractor = Arc::new(KeywordExtractor::new(
            db.clone(),
            Arc::new(FixedAnalyzer),
            TermExtractor::local_default(),
        ));
        let aggregator = Arc::new(TrendAggregator::new(db.clone()));
        AdminService::new(
            JobRunner::new(db.clone(), chrono::Duration::minutes(30)),
            extractor,
            aggregator,
        )
    }

    fn add_article(db: &Database, hour: i64) {
        let (start, _) = day();
        article_repo::insert(
            db,
            &NewArticle {
                title: format!("기사 {}", hour),
                content: Some("반도체 본문".to_string()),
                category_code: Some("101".to_string()),
                published_at: Some(start + Duration::hours(hour)),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_manual_runs_are_logged() {
        let db = Database::open_in_memory().unwrap();
        add_article(&db, 1);
        add_article(&db, 2);
        let admin = service(&db);
        let (from, to) = day();

        let run = admin.run_extraction(from, to, false).await.unwrap();
        let summary = admin.run(run).unwrap().unwrap();
        assert_eq!(summary.status, "SUCCESS");
        assert_eq!(
            summary.note.as_deref(),
            Some("Saved: 2 (articles 2, processed 2, skipped 0, failed 0)")
        );

        admin.run_aggregation(from, to, false).await.unwrap();
        let rows = trend_repo::list_for_window(&db, from, to).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doc_count, 2);
        assert!((rows[0].score_sum - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_forced_extraction_reprocesses() {
        let db = Database::open_in_memory().unwrap();
        add_article(&db, 1);
        let admin = service(&db);
        let (from, to) = day();

        admin.run_extraction(from, to, false).await.unwrap();
        let run = admin.run_extraction(from, to, true).await.unwrap();

        let note = admin.run(run).unwrap().unwrap().note.unwrap();
        assert!(note.starts_with("cleared 1 scores, 1 processed; Saved: 1"));
        assert_eq!(keyword_repo::count_scores(&db).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_window_is_rejected_without_a_run() {
        let db = Database::open_in_memory().unwrap();
        let admin = service(&db);
        let (from, to) = day();

        assert!(admin.run_aggregation(to, from, false).await.is_err());
        assert!(admin.status(names::BUILD_TREND_SNAPSHOT).unwrap().last_run.is_none());
    }

    #[tokio::test]
    async fn test_purge_returns_run() {
        let db = Database::open_in_memory().unwrap();
        let admin = service(&db);
        let run = admin.purge_snapshots(48).await.unwrap();
        let summary = admin.run(run).unwrap().unwrap();
        assert_eq!(summary.note.as_deref(), Some("Deleted: 0"));
    }

    #[tokio::test]
    async fn test_purge_with_unrepresentable_age_fails_its_run() {
        let db = Database::open_in_memory().unwrap();
        let admin = service(&db);

        let run = admin.purge_snapshots(10_000_000_000).await.unwrap();
        let summary = admin.run(run).unwrap().unwrap();
        assert_eq!(summary.status, "FAILED");
        assert!(summary.note.unwrap().contains("out of range"));
        // The lease went back, so the next purge runs normally.
        assert!(admin.purge_snapshots(48).await.is_ok());
    }

    #[tokio::test]
    async fn test_rerun_is_busy_while_scheduled_extraction_holds_the_lease() {
        let db = Database::open_in_memory().unwrap();
        add_article(&db, 1);
        let admin = service(&db);
        let (from, to) = day();
        admin.run_extraction(from, to, false).await.unwrap();

        let scheduled = crate::jobs::LeaseManager::with_holder(
            db.clone(),
            "scheduled-extraction",
            Duration::minutes(30),
        );
        let held = scheduled.acquire(names::ANALYZE_KEYWORDS).unwrap().unwrap();

        let err = admin.run_extraction(from, to, true).await.unwrap_err();
        assert!(matches!(err, NewstrendError::JobBusy { .. }));
        assert_eq!(keyword_repo::count_scores(&db).unwrap(), 1);
        let last = admin.status(names::RERUN_KEYWORDS).unwrap().last_run.unwrap();
        assert_eq!(
            last.note.as_deref(),
            Some("Saved: 1 (articles 1, processed 1, skipped 0, failed 0)")
        );

        drop(held);
        assert!(admin.run_extraction(from, to, true).await.is_ok());
    }

    #[test]
    fn test_pause_resume_status() {
        let db = Database::open_in_memory().unwrap();
        let admin = service(&db);

        let status = admin.pause(names::ANALYZE_KEYWORDS).unwrap();
        assert!(status.paused);
        assert!(status.paused_since.is_some());
        assert!(status.last_run.is_none());

        let status = admin.resume(names::ANALYZE_KEYWORDS).unwrap();
        assert!(!status.paused);

        let all = admin.status_all().unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|s| !s.paused));
    }
}
