//! Keyword extraction pipeline.
//!
//! Selects articles in a publication window that have no keyword scores,
//! sends each to the analyzer and stores the returned keyword scores. An
//! article counts as done once it has at least one score row, so a re-run
//! over the same window only touches what is still pending.

pub mod report;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::analyzer::{AnalyzeRequest, AnalyzeResponse, KeywordAnalyzer};
use crate::db::article_repo::{self, PendingArticle};
use crate::db::keyword_repo::{self, ClearedRows};
use crate::db::Database;
use crate::error::Result;
use crate::nlp::{html_to_text, normalize, TermExtractor};
use crate::score::Score;
use crate::window::TimeWindow;

pub use report::{ArticleOutcome, ExtractionReport, PreprocessReport, SkipReason};

pub const DEFAULT_TOP_WORDS: usize = 10;

/// Where an article's text came from.
enum ArticleBody {
    Content(String),
    RawHtml(String),
}

impl ArticleBody {
    /// What the analyzer receives; it takes HTML as is.
    fn raw(&self) -> &str {
        match self {
            Self::Content(text) | Self::RawHtml(text) => text,
        }
    }

    /// Plain text for term extraction.
    fn plain_text(&self) -> String {
        match self {
            Self::Content(text) => text.clone(),
            Self::RawHtml(html) => html_to_text(html),
        }
    }
}

pub struct KeywordExtractor {
    db: Database,
    analyzer: Arc<dyn KeywordAnalyzer>,
    terms: TermExtractor,
    top_words: usize,
}

impl KeywordExtractor {
    pub fn new(db: Database, analyzer: Arc<dyn KeywordAnalyzer>, terms: TermExtractor) -> Self {
        Self {
            db,
            analyzer,
            terms,
            top_words: DEFAULT_TOP_WORDS,
        }
    }

    pub fn with_top_words(mut self, top_words: usize) -> Self {
        self.top_words = top_words;
        self
    }

    /// Extracts and stores keyword scores for pending articles published in
    /// `[start, end)`.
    ///
    /// Per-article problems (missing body, empty or failed analysis) are
    /// recorded in the report and never abort the batch. Only failing to
    /// select the batch is an error.
    pub async fn compute_and_store_keywords(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ExtractionReport> {
        let window = TimeWindow::new(start, end)?;
        let span = info_span!("extraction", window = %window);
        self.run_extraction(window).instrument(span).await
    }

    async fn run_extraction(&self, window: TimeWindow) -> Result<ExtractionReport> {
        if window.is_empty() {
            info!("Window {} is empty, nothing to extract", window);
            return Ok(ExtractionReport::new(window.start, window.end));
        }
        let articles = article_repo::find_unprocessed_in_window(&self.db, window.start, window.end)?;
        info!("{} pending articles in {}", articles.len(), window);

        let mut report = ExtractionReport::new(window.start, window.end);
        for article in &articles {
            let outcome = self.process_article(article).await;
            match &outcome {
                ArticleOutcome::Stored { rows } => {
                    debug!("article_id={} stored {} keyword rows", article.article_id, rows)
                }
                ArticleOutcome::Skipped(reason) => {
                    warn!("article_id={} skipped: {}", article.article_id, reason)
                }
                ArticleOutcome::Failed(message) => {
                    warn!("article_id={} failed: {}", article.article_id, message)
                }
            }
            report = report.record(article.article_id, outcome);
        }

        info!("Extraction finished: {}", report.note());
        Ok(report)
    }

    async fn process_article(&self, article: &PendingArticle) -> ArticleOutcome {
        let body = match self.resolve_body(article) {
            Ok(Some(body)) => body,
            Ok(None) => return ArticleOutcome::Skipped(SkipReason::NoContent),
            Err(e) => return ArticleOutcome::Failed(e.to_string()),
        };

        let request = AnalyzeRequest::new(body.raw(), article.title.as_str());
        let response = match self.analyzer.analyze(&request).await {
            Ok(Some(response)) if !response.keywords().is_empty() => response,
            Ok(_) => return ArticleOutcome::Skipped(SkipReason::EmptyAnalysis),
            Err(e) => return ArticleOutcome::Failed(e.to_string()),
        };

        match self.store(article, &body, &response).await {
            Ok(rows) => ArticleOutcome::Stored { rows },
            Err(e) => ArticleOutcome::Failed(e.to_string()),
        }
    }

    /// The article body, falling back to the latest raw HTML.
    fn resolve_body(&self, article: &PendingArticle) -> Result<Option<ArticleBody>> {
        if let Some(content) = article.content.as_deref().filter(|c| !c.trim().is_empty()) {
            return Ok(Some(ArticleBody::Content(content.to_string())));
        }
        let raw = article_repo::find_raw_html(&self.db, article.article_id)?;
        Ok(raw
            .filter(|html| !html.trim().is_empty())
            .map(ArticleBody::RawHtml))
    }

    async fn store(
        &self,
        article: &PendingArticle,
        body: &ArticleBody,
        response: &AnalyzeResponse,
    ) -> Result<usize> {
        let now = Utc::now();
        let processed_content_id =
            match keyword_repo::find_processed_content_id(&self.db, article.article_id)? {
                Some(id) => id,
                None => {
                    let text = self.processed_text(&article.title, &body.plain_text()).await;
                    keyword_repo::find_or_create_processed_content(
                        &self.db,
                        article.article_id,
                        &text,
                        now,
                    )?
                }
            };

        let mut scores = Vec::with_capacity(response.keywords().len());
        for keyword in response.keywords() {
            let Some(word) = keyword.word.as_deref().map(str::trim).filter(|w| !w.is_empty())
            else {
                continue;
            };
            match Score::from_f64(keyword.score) {
                Some(score) => scores.push((word.to_string(), score)),
                None => warn!(
                    "article_id={} keyword '{}' has unusable score {}",
                    article.article_id, word, keyword.score
                ),
            }
        }
        let rows =
            keyword_repo::store_keyword_scores(&self.db, processed_content_id, &scores, now)?;

        self.update_denormalized(article.article_id, response);
        Ok(rows)
    }

    /// Best effort: failures are logged and never fail the article.
    fn update_denormalized(&self, article_id: i64, response: &AnalyzeResponse) {
        let top_words = top_words(response, self.top_words);
        if !top_words.is_empty() {
            if let Err(e) = article_repo::update_top_words(&self.db, article_id, &top_words) {
                warn!("article_id={} top_words update failed: {}", article_id, e);
            }
        }
        if let Some(summary) = response.summary() {
            if let Err(e) = article_repo::update_summary(&self.db, article_id, summary) {
                warn!("article_id={} summary update failed: {}", article_id, e);
            }
        }
    }

    async fn processed_text(&self, title: &str, body: &str) -> String {
        let text = normalize(Some(&format!("{} {}", title, body)));
        self.terms.extract_terms(&text).await.join(" ")
    }

    /// Creates processed-content rows for up to `limit` articles that have
    /// none yet.
    pub async fn process_new_articles(&self, limit: u32) -> Result<PreprocessReport> {
        self.run_preprocess(limit)
            .instrument(info_span!("preprocess", limit))
            .await
    }

    async fn run_preprocess(&self, limit: u32) -> Result<PreprocessReport> {
        let articles = article_repo::find_without_processed_content(&self.db, limit)?;
        let mut report = PreprocessReport::default();
        for article in &articles {
            report.articles_seen += 1;
            let body = self
                .resolve_body(article)?
                .map(|body| body.plain_text())
                .unwrap_or_default();
            let text = self.processed_text(&article.title, &body).await;
            if text.is_empty() {
                report.empty_text += 1;
            }
            keyword_repo::find_or_create_processed_content(
                &self.db,
                article.article_id,
                &text,
                Utc::now(),
            )?;
            report.created += 1;
        }
        info!("Preprocessing finished: {}", report.note());
        Ok(report)
    }

    /// Removes keyword scores and processed content for articles published in
    /// `[start, end)` so the next extraction run reprocesses them.
    pub fn clear_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<ClearedRows> {
        let window = TimeWindow::new(start, end)?;
        let cleared = keyword_repo::delete_for_articles_published_in(&self.db, start, end)?;
        info!(
            "Cleared {} score rows and {} processed rows in {}",
            cleared.scores, cleared.processed, window
        );
        Ok(cleared)
    }
}

/// The first `limit` keyword surfaces, blanks dropped, comma-joined.
fn top_words(response: &AnalyzeResponse, limit: usize) -> String {
    response
        .keywords()
        .iter()
        .take(limit)
        .filter_map(|k| k.word.as_deref())
        .filter(|w| !w.trim().is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
