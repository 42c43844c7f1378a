//! Builders for creating test data programmatically.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use newstrend::db::article_repo::{self, NewArticle};
use newstrend::Database;

/// Midnight UTC of the fixed test day.
pub fn test_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

pub fn test_day_window() -> (DateTime<Utc>, DateTime<Utc>) {
    (test_day(), test_day() + Duration::hours(24))
}

/// Builder for creating articles.
pub struct ArticleBuilder {
    article: NewArticle,
    raw_html: Option<String>,
}

impl ArticleBuilder {
    /// An article in category "101" published one hour into the test day.
    pub fn new(title: &str) -> Self {
        Self {
            article: NewArticle {
                title: title.to_string(),
                content: Some(format!("{} 본문", title)),
                category_code: Some("101".to_string()),
                published_at: Some(test_day() + Duration::hours(1)),
                ..Default::default()
            },
            raw_html: None,
        }
    }

    pub fn content(mut self, content: Option<&str>) -> Self {
        self.article.content = content.map(str::to_string);
        self
    }

    pub fn category(mut self, code: &str) -> Self {
        self.article.category_code = Some(code.to_string());
        self
    }

    pub fn published_hours_after_start(mut self, hours: i64) -> Self {
        self.article.published_at = Some(test_day() + Duration::hours(hours));
        self
    }

    /// No publication time; only the crawl time places it in a window.
    pub fn crawled_only(mut self, hours: i64) -> Self {
        self.article.published_at = None;
        self.article.content_crawled_at = Some(test_day() + Duration::hours(hours));
        self
    }

    pub fn raw_html(mut self, html: &str) -> Self {
        self.raw_html = Some(html.to_string());
        self
    }

    pub fn insert(self, db: &Database) -> i64 {
        let id = article_repo::insert(db, &self.article).expect("Failed to insert article");
        if let Some(html) = self.raw_html {
            article_repo::insert_raw_html(db, id, &html, test_day())
                .expect("Failed to insert raw html");
        }
        id
    }
}
