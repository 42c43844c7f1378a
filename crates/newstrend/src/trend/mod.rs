//! Category trend aggregation.
//!
//! Folds keyword scores of articles in a window into one immutable snapshot
//! row per (category, keyword, window).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::db::trend_repo::{self, TrendQuery};
use crate::db::Database;
use crate::error::Result;
use crate::window::TimeWindow;

pub const DEFAULT_RETENTION_HOURS: i64 = 48;

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub categories: usize,
    pub aggregated_rows: usize,
    pub inserted: usize,
    pub wiped: u64,
}

impl AggregationReport {
    pub fn note(&self) -> String {
        format!(
            "Saved: {} (categories {}, aggregated {}, wiped {})",
            self.inserted, self.categories, self.aggregated_rows, self.wiped
        )
    }
}

pub struct TrendAggregator {
    db: Database,
    query: TrendQuery,
    retention_hours: i64,
}

impl TrendAggregator {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            query: TrendQuery::new(),
            retention_hours: DEFAULT_RETENTION_HOURS,
        }
    }

    pub fn with_retention_hours(mut self, hours: i64) -> Self {
        self.retention_hours = hours;
        self
    }

    pub fn retention_hours(&self) -> i64 {
        self.retention_hours
    }

    /// Aggregates `[start, end)` per category, keeping existing snapshots.
    pub fn aggregate(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<AggregationReport> {
        self.aggregate_with(start, end, false)
    }

    /// Aggregates `[start, end)`. With `wipe_existing`, snapshots with the
    /// same window bounds are deleted first so this run replaces them.
    pub fn aggregate_with(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        wipe_existing: bool,
    ) -> Result<AggregationReport> {
        let window = TimeWindow::new(start, end)?;
        let span = info_span!("aggregation", window = %window, wipe_existing);
        let _guard = span.enter();

        if window.is_empty() {
            info!("Window {} is empty, nothing to aggregate", window);
            return Ok(AggregationReport {
                window_start: start,
                window_end: end,
                categories: 0,
                aggregated_rows: 0,
                inserted: 0,
                wiped: 0,
            });
        }

        let wiped = if wipe_existing {
            trend_repo::delete_window(&self.db, start, end)?
        } else {
            0
        };

        let generated_at = Utc::now();
        let categories = trend_repo::categories_in_window(&self.db, start, end)?;
        let mut report = AggregationReport {
            window_start: start,
            window_end: end,
            categories: categories.len(),
            aggregated_rows: 0,
            inserted: 0,
            wiped,
        };

        for category in &categories {
            let rows = self.query.execute(&self.db, category, start, end)?;
            let inserted =
                trend_repo::insert_snapshots(&self.db, category, start, end, &rows, generated_at)?;
            debug!(
                "category={} aggregated {} keywords, inserted {}",
                category,
                rows.len(),
                inserted
            );
            report.aggregated_rows += rows.len();
            report.inserted += inserted;
        }

        info!("Aggregation finished: {}", report.note());
        Ok(report)
    }

    /// Deletes snapshots generated more than `older_than_hours` ago. A
    /// non-positive value falls back to the configured retention.
    pub fn purge(&self, older_than_hours: i64) -> Result<u64> {
        let hours = if older_than_hours > 0 {
            older_than_hours
        } else {
            self.retention_hours
        };
        let cutoff = TimeWindow::trailing(Utc::now(), hours)?.start;
        let deleted = trend_repo::purge_generated_before(&self.db, cutoff)?;
        info!("Purged {} snapshots older than {}h", deleted, hours);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::article_repo::{self, NewArticle};
    use crate::db::keyword_repo;
    use crate::error::NewstrendError;
    use crate::score::Score;
    use chrono::{Duration, TimeZone};

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn scored_article(db: &Database, category: &str, hour: i64, scores: &[(&str, f64)]) -> i64 {
        let id = article_repo::insert(
            db,
            &NewArticle {
                title: format!("article at {}", hour),
                content: Some("본문".to_string()),
                category_code: Some(category.to_string()),
                published_at: Some(day_start() + Duration::hours(hour)),
                ..Default::default()
            },
        )
        .unwrap();
        let pc = keyword_repo::find_or_create_processed_content(db, id, "", day_start()).unwrap();
        let scores: Vec<(String, Score)> = scores
            .iter()
            .map(|(w, s)| (w.to_string(), Score::from_f64(*s).unwrap()))
            .collect();
        keyword_repo::store_keyword_scores(db, pc, &scores, day_start()).unwrap();
        id
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (day_start(), day_start() + Duration::hours(24))
    }

    #[test]
    fn test_aggregate_per_category() {
        let db = Database::open_in_memory().unwrap();
        scored_article(&db, "101", 1, &[("반도체", 0.5), ("수출", 0.2)]);
        scored_article(&db, "101", 2, &[("반도체", 0.3)]);
        scored_article(&db, "102", 3, &[("반도체", 0.9)]);
        let aggregator = TrendAggregator::new(db.clone());

        let (start, end) = window();
        let report = aggregator.aggregate(start, end).unwrap();
        assert_eq!(report.categories, 2);
        assert_eq!(report.inserted, 3);

        let rows = trend_repo::list_for_window(&db, start, end).unwrap();
        let top = &rows[0];
        assert_eq!((top.category_code.as_str(), top.keyword.as_str()), ("101", "반도체"));
        assert_eq!(top.doc_count, 2);
        assert!((top.score_sum - 0.8).abs() < 1e-9);
        assert!((top.score_avg - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_rerun_keeps_existing_snapshots() {
        let db = Database::open_in_memory().unwrap();
        scored_article(&db, "101", 1, &[("반도체", 0.5)]);
        let aggregator = TrendAggregator::new(db.clone());
        let (start, end) = window();

        aggregator.aggregate(start, end).unwrap();
        scored_article(&db, "101", 2, &[("반도체", 0.3)]);
        let second = aggregator.aggregate(start, end).unwrap();

        assert_eq!(second.inserted, 0);
        let rows = trend_repo::list_for_window(&db, start, end).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doc_count, 1);
    }

    #[test]
    fn test_wipe_replaces_window() {
        let db = Database::open_in_memory().unwrap();
        scored_article(&db, "101", 1, &[("반도체", 0.5)]);
        let aggregator = TrendAggregator::new(db.clone());
        let (start, end) = window();

        aggregator.aggregate(start, end).unwrap();
        scored_article(&db, "101", 2, &[("반도체", 0.3)]);
        let report = aggregator.aggregate_with(start, end, true).unwrap();

        assert_eq!(report.wiped, 1);
        assert_eq!(report.inserted, 1);
        let rows = trend_repo::list_for_window(&db, start, end).unwrap();
        assert_eq!(rows[0].doc_count, 2);
    }

    #[test]
    fn test_empty_window_inserts_nothing() {
        let db = Database::open_in_memory().unwrap();
        scored_article(&db, "101", 30, &[("반도체", 0.5)]);
        let (start, end) = window();

        let report = TrendAggregator::new(db.clone()).aggregate(start, end).unwrap();
        assert_eq!(report.categories, 0);
        assert_eq!(trend_repo::count_snapshots(&db).unwrap(), 0);
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let (start, end) = window();
        assert!(TrendAggregator::new(db).aggregate(end, start).is_err());
    }

    #[test]
    fn test_purge_uses_retention_for_non_positive_hours() {
        let db = Database::open_in_memory().unwrap();
        scored_article(&db, "101", 1, &[("반도체", 0.5)]);
        let (start, end) = window();
        let old = Utc::now() - Duration::hours(72);
        let rows = TrendQuery::new().execute(&db, "101", start, end).unwrap();
        trend_repo::insert_snapshots(&db, "101", start, end, &rows, old).unwrap();

        let aggregator = TrendAggregator::new(db.clone()).with_retention_hours(48);
        assert_eq!(aggregator.purge(100).unwrap(), 0);
        assert_eq!(aggregator.purge(0).unwrap(), 1);
        assert_eq!(trend_repo::count_snapshots(&db).unwrap(), 0);
    }

    #[test]
    fn test_purge_rejects_unrepresentable_ages() {
        let db = Database::open_in_memory().unwrap();
        let aggregator = TrendAggregator::new(db).with_retention_hours(i64::MAX);

        let err = aggregator.purge(10_000_000_000).unwrap_err();
        assert!(matches!(err, NewstrendError::HoursOutOfRange { .. }));
        // The fallback retention goes through the same bound.
        assert!(aggregator.purge(0).is_err());
    }
}
