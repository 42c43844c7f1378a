//! Keyword store and per-article keyword scores.
//!
//! Every find-or-create is a single conflict-tolerant insert followed by a
//! re-read, so concurrent writers racing on the same unique key converge on
//! the same row instead of surfacing a duplicate-key error.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{to_db_timestamp, Database, DatabaseError};
use crate::score::Score;

/// A stored keyword score joined with its surface string.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScoreRow {
    pub keyword_id: i64,
    pub keyword: String,
    pub score: Score,
}

/// Rows removed by [`delete_for_articles_published_in`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedRows {
    pub scores: u64,
    pub processed: u64,
}

fn find_or_create_keyword_on(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO keywords (keyword_name) VALUES (?1)
         ON CONFLICT(keyword_name) DO NOTHING",
        params![name],
    )?;
    conn.query_row(
        "SELECT keyword_id FROM keywords WHERE keyword_name = ?1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::MissingAfterInsert {
        table: "keywords",
        key: name.to_string(),
    })
}

fn upsert_score_on(
    conn: &Connection,
    processed_content_id: i64,
    keyword_id: i64,
    score: Score,
    extracted_at: &str,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "INSERT INTO extracted_keyword_scores
             (processed_content_id, keyword_id, score_micros, extracted_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(processed_content_id, keyword_id) DO UPDATE SET
           score_micros = excluded.score_micros,
           extracted_at = excluded.extracted_at",
        params![processed_content_id, keyword_id, score.micros(), extracted_at],
    )?;
    Ok(affected)
}

/// Returns the stable id for a keyword surface, creating it on first sight.
pub fn find_or_create_keyword(db: &Database, name: &str) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| find_or_create_keyword_on(conn, name))
}

/// Looks up the processed-content id of an article without creating it.
pub fn find_processed_content_id(
    db: &Database,
    article_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let id = conn
            .query_row(
                "SELECT processed_content_id FROM processed_content WHERE article_id = ?1",
                params![article_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    })
}

/// Returns the processed-content id for an article, creating the row if absent.
///
/// `processed_text` and `processed_at` only apply when the row is created.
pub fn find_or_create_processed_content(
    db: &Database,
    article_id: i64,
    processed_text: &str,
    processed_at: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processed_content (article_id, processed_text, processed_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(article_id) DO NOTHING",
            params![article_id, processed_text, to_db_timestamp(processed_at)],
        )?;
        conn.query_row(
            "SELECT processed_content_id FROM processed_content WHERE article_id = ?1",
            params![article_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| DatabaseError::MissingAfterInsert {
            table: "processed_content",
            key: article_id.to_string(),
        })
    })
}

/// Resolves every term to a keyword id and upserts its score, all in one
/// transaction. Returns the number of score rows inserted or updated.
pub fn store_keyword_scores(
    db: &Database,
    processed_content_id: i64,
    scores: &[(String, Score)],
    extracted_at: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let extracted_at = to_db_timestamp(extracted_at);
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let mut affected = 0;
        for (term, score) in scores {
            let keyword_id = find_or_create_keyword_on(&tx, term)?;
            affected += upsert_score_on(&tx, processed_content_id, keyword_id, *score, &extracted_at)?;
        }
        tx.commit()?;
        Ok(affected)
    })
}

/// Lists the stored scores of one article, highest first.
pub fn scores_for_article(
    db: &Database,
    article_id: i64,
) -> Result<Vec<KeywordScoreRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT k.keyword_id, k.keyword_name, ek.score_micros
             FROM extracted_keyword_scores ek
             JOIN processed_content pc ON pc.processed_content_id = ek.processed_content_id
             JOIN keywords k ON k.keyword_id = ek.keyword_id
             WHERE pc.article_id = ?1
             ORDER BY ek.score_micros DESC, k.keyword_name",
        )?;
        let rows = stmt
            .query_map(params![article_id], |row| {
                Ok(KeywordScoreRow {
                    keyword_id: row.get(0)?,
                    keyword: row.get(1)?,
                    score: Score::from_micros(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts all stored keyword score rows.
pub fn count_scores(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM extracted_keyword_scores", [], |r| r.get(0))?;
        Ok(count)
    })
}

/// Deletes score and processed-content rows of articles published in
/// `[start, end)`, so a forced extraction re-run picks them up again.
pub fn delete_for_articles_published_in(
    db: &Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ClearedRows, DatabaseError> {
    let (start, end) = (to_db_timestamp(start), to_db_timestamp(end));
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let scores = tx.execute(
            "DELETE FROM extracted_keyword_scores
             WHERE processed_content_id IN (
               SELECT pc.processed_content_id
               FROM processed_content pc
               JOIN articles a ON a.article_id = pc.article_id
               WHERE a.published_at >= ?1 AND a.published_at < ?2
             )",
            params![start, end],
        )?;
        let processed = tx.execute(
            "DELETE FROM processed_content
             WHERE article_id IN (
               SELECT article_id FROM articles
               WHERE published_at >= ?1 AND published_at < ?2
             )",
            params![start, end],
        )?;
        tx.commit()?;
        Ok(ClearedRows {
            scores: scores as u64,
            processed: processed as u64,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::article_repo::{self, NewArticle};
    use chrono::TimeZone;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn seed_article(db: &Database, id: i64, hour: u32) {
        article_repo::insert(
            db,
            &NewArticle {
                article_id: Some(id),
                title: "t".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_keyword_find_or_create_is_stable() {
        let db = test_db();
        let a = find_or_create_keyword(&db, "인공지능").unwrap();
        let b = find_or_create_keyword(&db, "인공지능").unwrap();
        let c = find_or_create_keyword(&db, "반도체").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let stored: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM keywords", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(stored, 2);
    }

    #[test]
    fn test_processed_content_is_one_per_article() {
        let db = test_db();
        seed_article(&db, 1, 1);
        assert!(find_processed_content_id(&db, 1).unwrap().is_none());
        let first = find_or_create_processed_content(&db, 1, "a b", now()).unwrap();
        assert_eq!(find_processed_content_id(&db, 1).unwrap(), Some(first));
        let second = find_or_create_processed_content(&db, 1, "ignored", now()).unwrap();
        assert_eq!(first, second);

        let text: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT processed_text FROM processed_content WHERE article_id = 1",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(text, "a b");
    }

    #[test]
    fn test_upsert_score_overwrites() {
        let db = test_db();
        seed_article(&db, 1, 1);
        let pc = find_or_create_processed_content(&db, 1, "", now()).unwrap();
        let first = vec![("수출".to_string(), Score::from_micros(100))];
        let second = vec![("수출".to_string(), Score::from_micros(250))];

        assert_eq!(store_keyword_scores(&db, pc, &first, now()).unwrap(), 1);
        assert_eq!(store_keyword_scores(&db, pc, &second, now()).unwrap(), 1);

        let rows = scores_for_article(&db, 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score.micros(), 250);
        assert_eq!(count_scores(&db).unwrap(), 1);
    }

    #[test]
    fn test_store_keyword_scores_counts_rows() {
        let db = test_db();
        seed_article(&db, 1, 1);
        let pc = find_or_create_processed_content(&db, 1, "", now()).unwrap();
        let scores = vec![
            ("반도체".to_string(), Score::from_micros(900_000)),
            ("수출".to_string(), Score::from_micros(500_000)),
        ];

        assert_eq!(store_keyword_scores(&db, pc, &scores, now()).unwrap(), 2);
        assert_eq!(store_keyword_scores(&db, pc, &scores, now()).unwrap(), 2);
        assert_eq!(count_scores(&db).unwrap(), 2);

        let rows = scores_for_article(&db, 1).unwrap();
        assert_eq!(rows[0].keyword, "반도체");
    }

    #[test]
    fn test_delete_for_articles_published_in_range() {
        let db = test_db();
        seed_article(&db, 1, 1);
        seed_article(&db, 2, 5);
        for id in [1, 2] {
            let pc = find_or_create_processed_content(&db, id, "", now()).unwrap();
            store_keyword_scores(&db, pc, &[("k".to_string(), Score::from_micros(1))], now())
                .unwrap();
        }

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();
        let cleared = delete_for_articles_published_in(&db, start, end).unwrap();
        assert_eq!(cleared, ClearedRows { scores: 1, processed: 1 });
        assert!(scores_for_article(&db, 1).unwrap().is_empty());
        assert_eq!(scores_for_article(&db, 2).unwrap().len(), 1);
    }
}
