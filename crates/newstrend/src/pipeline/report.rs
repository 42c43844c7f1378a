use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why an article was passed over without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither the article nor the raw content store has a body.
    NoContent,
    /// The analyzer answered without any keywords.
    EmptyAnalysis,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContent => f.write_str("no content"),
            Self::EmptyAnalysis => f.write_str("empty analysis"),
        }
    }
}

/// Result of processing one article.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    Stored { rows: usize },
    Skipped(SkipReason),
    Failed(String),
}

/// Summary of one extraction batch.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub articles_seen: usize,
    pub processed: usize,
    pub rows_upserted: usize,
    pub skipped: Vec<(i64, SkipReason)>,
    pub failed: Vec<(i64, String)>,
}

impl ExtractionReport {
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self {
            window_start,
            window_end,
            articles_seen: 0,
            processed: 0,
            rows_upserted: 0,
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Folds one article's outcome into the report.
    pub fn record(mut self, article_id: i64, outcome: ArticleOutcome) -> Self {
        self.articles_seen += 1;
        match outcome {
            ArticleOutcome::Stored { rows } => {
                self.processed += 1;
                self.rows_upserted += rows;
            }
            ArticleOutcome::Skipped(reason) => self.skipped.push((article_id, reason)),
            ArticleOutcome::Failed(message) => self.failed.push((article_id, message)),
        }
        self
    }

    /// One-line note for the run log.
    pub fn note(&self) -> String {
        format!(
            "Saved: {} (articles {}, processed {}, skipped {}, failed {})",
            self.rows_upserted,
            self.articles_seen,
            self.processed,
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Summary of one preprocessing batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreprocessReport {
    pub articles_seen: usize,
    pub created: usize,
    pub empty_text: usize,
}

impl PreprocessReport {
    pub fn note(&self) -> String {
        format!(
            "Saved: {} (articles {}, empty text {})",
            self.created, self.articles_seen, self.empty_text
        )
    }
}
