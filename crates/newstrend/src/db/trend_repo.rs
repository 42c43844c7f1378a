//! Trend snapshot repository.
//!
//! Aggregation reads scores joined through processed content to articles; the
//! window predicate uses `COALESCE(published_at, content_crawled_at)` so
//! articles without a publication time still count by crawl time.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{timestamp_column, to_db_timestamp, Database, DatabaseError};
use crate::score::micros_to_f64;

const EFFECTIVE_TIME: &str = "COALESCE(a.published_at, a.content_crawled_at)";

const SCORE_JOIN: &str = "FROM extracted_keyword_scores ek
     JOIN processed_content pc ON pc.processed_content_id = ek.processed_content_id
     JOIN articles a ON a.article_id = pc.article_id";

/// Per-keyword aggregate for one category and window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub keyword_id: i64,
    pub doc_count: i64,
    pub score_sum: f64,
    pub score_avg: f64,
}

/// The per-category aggregation statement.
///
/// The SQL text is assembled once; each execution binds the category and the
/// window bounds.
#[derive(Debug, Clone)]
pub struct TrendQuery {
    sql: String,
}

impl Default for TrendQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendQuery {
    pub fn new() -> Self {
        let sql = format!(
            "SELECT ek.keyword_id,
                    COUNT(DISTINCT ek.processed_content_id) AS doc_count,
                    SUM(ek.score_micros) AS score_sum,
                    AVG(ek.score_micros) AS score_avg
             {SCORE_JOIN}
             WHERE TRIM(a.category_code) = ?1
               AND {EFFECTIVE_TIME} >= ?2 AND {EFFECTIVE_TIME} < ?3
             GROUP BY ek.keyword_id
             HAVING doc_count > 0
             ORDER BY score_sum DESC, ek.keyword_id"
        );
        Self { sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the aggregation for one category over `[start, end)`.
    pub fn execute(
        &self,
        db: &Database,
        category_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrendRow>, DatabaseError> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&self.sql)?;
            let rows = stmt
                .query_map(
                    params![category_code, to_db_timestamp(start), to_db_timestamp(end)],
                    |row| {
                        let sum: f64 = row.get(2)?;
                        let avg: f64 = row.get(3)?;
                        Ok(TrendRow {
                            keyword_id: row.get(0)?,
                            doc_count: row.get(1)?,
                            score_sum: micros_to_f64(sum),
                            score_avg: micros_to_f64(avg),
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// A stored snapshot row with its keyword surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub snapshot_id: i64,
    pub category_code: String,
    pub keyword_id: i64,
    pub keyword: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub doc_count: i64,
    pub score_sum: f64,
    pub score_avg: f64,
    pub generated_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            snapshot_id: row.get(0)?,
            category_code: row.get(1)?,
            keyword_id: row.get(2)?,
            keyword: row.get(3)?,
            window_start: timestamp_column(row, 4)?,
            window_end: timestamp_column(row, 5)?,
            doc_count: row.get(6)?,
            score_sum: row.get(7)?,
            score_avg: row.get(8)?,
            generated_at: timestamp_column(row, 9)?,
        })
    }
}

/// Distinct trimmed, non-blank category codes that have at least one score
/// row in `[start, end)`.
pub fn categories_in_window(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<String>, DatabaseError> {
    let sql = format!(
        "SELECT DISTINCT TRIM(a.category_code) AS code
         {SCORE_JOIN}
         WHERE a.category_code IS NOT NULL AND TRIM(a.category_code) <> ''
           AND {EFFECTIVE_TIME} >= ?1 AND {EFFECTIVE_TIME} < ?2
         ORDER BY code"
    );
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let codes = stmt
            .query_map(params![to_db_timestamp(start), to_db_timestamp(end)], |r| {
                r.get(0)
            })?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(codes)
    })
}

/// Inserts one snapshot per aggregate row inside a single transaction.
///
/// Rows that collide with an existing snapshot for the same category,
/// keyword and window are left untouched. Returns the number inserted.
pub fn insert_snapshots(
    db: &Database,
    category_code: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rows: &[TrendRow],
    generated_at: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let (start, end) = (to_db_timestamp(start), to_db_timestamp(end));
    let generated_at = to_db_timestamp(generated_at);
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trend_snapshots
                     (category_code, keyword_id, window_start, window_end,
                      doc_count, score_sum, score_avg, generated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(category_code, keyword_id, window_start, window_end) DO NOTHING",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    category_code,
                    row.keyword_id,
                    start,
                    end,
                    row.doc_count,
                    row.score_sum,
                    row.score_avg,
                    generated_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    })
}

/// Deletes snapshots whose window bounds are exactly `[start, end)`.
pub fn delete_window(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM trend_snapshots WHERE window_start = ?1 AND window_end = ?2",
            params![to_db_timestamp(start), to_db_timestamp(end)],
        )?;
        Ok(deleted as u64)
    })
}

/// Deletes snapshots generated strictly before `cutoff`.
pub fn purge_generated_before(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM trend_snapshots WHERE generated_at < ?1",
            params![to_db_timestamp(cutoff)],
        )?;
        Ok(deleted as u64)
    })
}

/// Lists the snapshots of one window, grouped by category, strongest first.
pub fn list_for_window(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<SnapshotRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT s.snapshot_id, s.category_code, s.keyword_id, k.keyword_name,
                    s.window_start, s.window_end, s.doc_count, s.score_sum, s.score_avg,
                    s.generated_at
             FROM trend_snapshots s
             JOIN keywords k ON k.keyword_id = s.keyword_id
             WHERE s.window_start = ?1 AND s.window_end = ?2
             ORDER BY s.category_code, s.score_sum DESC, s.keyword_id",
        )?;
        let rows = stmt
            .query_map(
                params![to_db_timestamp(start), to_db_timestamp(end)],
                SnapshotRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts all stored snapshots.
pub fn count_snapshots(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM trend_snapshots", [], |r| r.get(0))?;
        Ok(count)
    })
}
