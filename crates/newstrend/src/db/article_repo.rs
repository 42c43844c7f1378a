//! Article repository: the pipeline's view of the crawler-owned `articles` table.
//!
//! Reads are limited to what extraction needs; the only writes back onto an
//! article are the denormalized `top_words` and `summary` fields. `insert`
//! and `insert_raw_html` exist for ingestion tooling and tests.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{optional_timestamp_column, to_db_timestamp, Database, DatabaseError};

/// A full article row.
#[derive(Debug, Clone)]
pub struct ArticleRow {
    pub article_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub category_code: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content_crawled_at: Option<DateTime<Utc>>,
    pub top_words: Option<String>,
    pub summary: Option<String>,
}

impl ArticleRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            article_id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            category_code: row.get(3)?,
            published_at: optional_timestamp_column(row, 4)?,
            content_crawled_at: optional_timestamp_column(row, 5)?,
            top_words: row.get(6)?,
            summary: row.get(7)?,
        })
    }
}

/// Fields supplied when an article is ingested.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub article_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub category_code: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content_crawled_at: Option<DateTime<Utc>>,
}

/// An article selected for keyword extraction.
#[derive(Debug, Clone)]
pub struct PendingArticle {
    pub article_id: i64,
    pub title: String,
    pub content: Option<String>,
}

/// Inserts an article and returns its id.
pub fn insert(db: &Database, article: &NewArticle) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO articles (article_id, title, content, category_code, published_at,
             content_crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                article.article_id,
                article.title,
                article.content,
                article.category_code,
                article.published_at.map(to_db_timestamp),
                article.content_crawled_at.map(to_db_timestamp),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Stores a raw HTML body for an article in the secondary content store.
pub fn insert_raw_html(
    db: &Database,
    article_id: i64,
    html: &str,
    fetched_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO article_raw_content (article_id, raw_html_content, fetched_at)
             VALUES (?1, ?2, ?3)",
            params![article_id, html, to_db_timestamp(fetched_at)],
        )?;
        Ok(())
    })
}

/// Finds an article by its ID.
pub fn find_by_id(db: &Database, article_id: i64) -> Result<Option<ArticleRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT article_id, title, content, category_code, published_at,
                 content_crawled_at, top_words, summary
                 FROM articles WHERE article_id = ?1",
                params![article_id],
                ArticleRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Selects articles published in `[start, end)` that have no keyword score
/// rows yet.
///
/// The existence check is the idempotency mechanism: a partially completed
/// run leaves processed articles behind and a re-run only picks up the rest.
pub fn find_unprocessed_in_window(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PendingArticle>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT a.article_id, a.title, a.content
             FROM articles a
             WHERE a.published_at >= ?1 AND a.published_at < ?2
               AND NOT EXISTS (
                 SELECT 1 FROM extracted_keyword_scores ek
                 JOIN processed_content pc
                   ON ek.processed_content_id = pc.processed_content_id
                 WHERE pc.article_id = a.article_id
               )
             ORDER BY a.published_at, a.article_id",
        )?;
        let rows = stmt
            .query_map(
                params![to_db_timestamp(start), to_db_timestamp(end)],
                |row| {
                    Ok(PendingArticle {
                        article_id: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Selects up to `limit` articles that have no processed-content row yet,
/// oldest id first.
pub fn find_without_processed_content(
    db: &Database,
    limit: u32,
) -> Result<Vec<PendingArticle>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT a.article_id, a.title, a.content
             FROM articles a
             WHERE NOT EXISTS (
               SELECT 1 FROM processed_content pc WHERE pc.article_id = a.article_id
             )
             ORDER BY a.article_id
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(PendingArticle {
                    article_id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Returns the most recent raw HTML body stored for an article, if any.
pub fn find_raw_html(db: &Database, article_id: i64) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let html: Option<Option<String>> = conn
            .query_row(
                "SELECT raw_html_content FROM article_raw_content
                 WHERE article_id = ?1
                 ORDER BY raw_content_id DESC LIMIT 1",
                params![article_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(html.flatten())
    })
}

/// Overwrites the denormalized top-keywords field. Returns whether a row changed.
pub fn update_top_words(
    db: &Database,
    article_id: i64,
    top_words: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE articles SET top_words = ?2 WHERE article_id = ?1",
            params![article_id, top_words],
        )?;
        Ok(changed > 0)
    })
}

/// Overwrites the denormalized summary field. Returns whether a row changed.
pub fn update_summary(db: &Database, article_id: i64, summary: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE articles SET summary = ?2 WHERE article_id = ?1",
            params![article_id, summary],
        )?;
        Ok(changed > 0)
    })
}
