//! The concrete jobs: preprocessing, keyword extraction, trend aggregation
//! and snapshot purge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::names;
use super::runner::Job;
use crate::error::Result;
use crate::pipeline::KeywordExtractor;
use crate::trend::TrendAggregator;
use crate::window::TimeWindow;

/// How a job picks its window at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpec {
    /// `[now - lookback, now + lookahead)`.
    Around {
        lookback_hours: i64,
        lookahead_hours: i64,
    },
    /// `[now - hours, now)`.
    Trailing { hours: i64 },
    Fixed(TimeWindow),
}

impl WindowSpec {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        match *self {
            Self::Around {
                lookback_hours,
                lookahead_hours,
            } => TimeWindow::around(now, lookback_hours, lookahead_hours),
            Self::Trailing { hours } => TimeWindow::trailing(now, hours),
            Self::Fixed(window) => Ok(window),
        }
    }
}

pub struct PreprocessJob {
    extractor: Arc<KeywordExtractor>,
    batch_size: u32,
}

impl PreprocessJob {
    pub fn new(extractor: Arc<KeywordExtractor>, batch_size: u32) -> Self {
        Self {
            extractor,
            batch_size,
        }
    }
}

#[async_trait]
impl Job for PreprocessJob {
    fn name(&self) -> &str {
        names::PROCESS_NEW_ARTICLES
    }

    fn params(&self) -> serde_json::Value {
        json!({ "batch_size": self.batch_size })
    }

    async fn execute(&self) -> Result<String> {
        let report = self.extractor.process_new_articles(self.batch_size).await?;
        Ok(report.note())
    }
}

pub struct ExtractionJob {
    name: &'static str,
    extractor: Arc<KeywordExtractor>,
    window: WindowSpec,
    force: bool,
}

impl ExtractionJob {
    /// The scheduled job over a window around the firing time.
    pub fn scheduled(extractor: Arc<KeywordExtractor>, lookback_hours: i64, lookahead_hours: i64) -> Self {
        Self {
            name: names::ANALYZE_KEYWORDS,
            extractor,
            window: WindowSpec::Around {
                lookback_hours,
                lookahead_hours,
            },
            force: false,
        }
    }

    /// A manual re-run over a fixed window. With `force`, existing scores in
    /// the window are cleared first.
    pub fn manual(extractor: Arc<KeywordExtractor>, window: TimeWindow, force: bool) -> Self {
        Self {
            name: names::RERUN_KEYWORDS,
            extractor,
            window: WindowSpec::Fixed(window),
            force,
        }
    }
}

#[async_trait]
impl Job for ExtractionJob {
    fn name(&self) -> &str {
        self.name
    }

    /// Manual re-runs share the scheduled job's lease, so a forced clear never
    /// races a scheduled batch.
    fn lease_key(&self) -> &str {
        names::ANALYZE_KEYWORDS
    }

    fn params(&self) -> serde_json::Value {
        json!({ "window": self.window, "force": self.force })
    }

    async fn execute(&self) -> Result<String> {
        let window = self.window.resolve(Utc::now())?;
        let mut note = String::new();
        if self.force {
            let cleared = self.extractor.clear_range(window.start, window.end)?;
            note = format!("cleared {} scores, {} processed; ", cleared.scores, cleared.processed);
        }
        let report = self
            .extractor
            .compute_and_store_keywords(window.start, window.end)
            .await?;
        note.push_str(&report.note());
        Ok(note)
    }
}

pub struct AggregationJob {
    name: &'static str,
    aggregator: Arc<TrendAggregator>,
    window: WindowSpec,
    wipe_existing: bool,
}

impl AggregationJob {
    /// The scheduled job over the trailing `window_hours`.
    pub fn scheduled(aggregator: Arc<TrendAggregator>, window_hours: i64) -> Self {
        Self {
            name: names::AGGREGATE_TREND_24H,
            aggregator,
            window: WindowSpec::Trailing {
                hours: window_hours,
            },
            wipe_existing: false,
        }
    }

    pub fn manual(aggregator: Arc<TrendAggregator>, window: TimeWindow, wipe_existing: bool) -> Self {
        Self {
            name: names::BUILD_TREND_SNAPSHOT,
            aggregator,
            window: WindowSpec::Fixed(window),
            wipe_existing,
        }
    }
}

#[async_trait]
impl Job for AggregationJob {
    fn name(&self) -> &str {
        self.name
    }

    fn lease_key(&self) -> &str {
        names::AGGREGATE_TREND_24H
    }

    fn params(&self) -> serde_json::Value {
        json!({ "window": self.window, "wipe_existing": self.wipe_existing })
    }

    async fn execute(&self) -> Result<String> {
        let window = self.window.resolve(Utc::now())?;
        let report = self
            .aggregator
            .aggregate_with(window.start, window.end, self.wipe_existing)?;
        Ok(report.note())
    }
}

pub struct PurgeJob {
    name: &'static str,
    aggregator: Arc<TrendAggregator>,
    older_than_hours: i64,
}

impl PurgeJob {
    /// The scheduled purge, using the aggregator's retention.
    pub fn scheduled(aggregator: Arc<TrendAggregator>) -> Self {
        Self {
            name: names::PURGE_TREND_SNAPSHOT,
            aggregator,
            older_than_hours: 0,
        }
    }

    pub fn manual(aggregator: Arc<TrendAggregator>, keep_hours: i64) -> Self {
        Self {
            name: names::CLEANUP_SNAPSHOTS,
            aggregator,
            older_than_hours: keep_hours,
        }
    }
}

#[async_trait]
impl Job for PurgeJob {
    fn name(&self) -> &str {
        self.name
    }

    fn lease_key(&self) -> &str {
        names::PURGE_TREND_SNAPSHOT
    }

    fn params(&self) -> serde_json::Value {
        let hours = if self.older_than_hours > 0 {
            self.older_than_hours
        } else {
            self.aggregator.retention_hours()
        };
        json!({ "older_than_hours": hours })
    }

    async fn execute(&self) -> Result<String> {
        let deleted = self.aggregator.purge(self.older_than_hours)?;
        Ok(format!("Deleted: {}", deleted))
    }
}
