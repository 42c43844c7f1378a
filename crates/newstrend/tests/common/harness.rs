//! Test harness for isolated test execution.
//!
//! Each `TestHarness` owns a temporary directory holding its SQLite file, so
//! tests can reopen the database and run concurrently without sharing state.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use newstrend::analyzer::{AnalyzeRequest, AnalyzeResponse, AnalyzerError, KeywordAnalyzer, KeywordScore};
use newstrend::jobs::{AdminService, JobRunner};
use newstrend::nlp::{CompoundDictionary, DictionaryAnalyzer, TermExtractor, TokenizerBackend};
use newstrend::{Database, KeywordExtractor, TrendAggregator};

/// Analyzer double that answers by article title.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    keywords: HashMap<String, Vec<(String, f64)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, title: &str, keywords: &[(&str, f64)]) -> Self {
        self.keywords.insert(
            title.to_string(),
            keywords.iter().map(|(w, s)| (w.to_string(), *s)).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeywordAnalyzer for ScriptedAnalyzer {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<Option<AnalyzeResponse>, AnalyzerError> {
        self.calls.lock().unwrap().push(request.article_title.clone());
        let Some(keywords) = self.keywords.get(&request.article_title) else {
            return Err(AnalyzerError::Request("connection refused".to_string()));
        };
        Ok(Some(AnalyzeResponse {
            summary: Some(format!("{} 요약", request.article_title)),
            keywords: Some(
                keywords
                    .iter()
                    .map(|(word, score)| KeywordScore {
                        word: Some(word.clone()),
                        score: *score,
                    })
                    .collect(),
            ),
            definitions: None,
        }))
    }
}

/// Test harness providing an isolated database for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("newstrend.db");
        let db = Database::open(&db_path).expect("Failed to open database");
        Self {
            temp_dir,
            db_path,
            db,
        }
    }

    /// Opens a second handle on the same file.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen database")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Local term extraction with the given compound entries.
    pub fn terms(&self, compounds: &[&str]) -> TermExtractor {
        TermExtractor::new(
            TokenizerBackend::Local(Arc::new(DictionaryAnalyzer::default())),
            Arc::new(CompoundDictionary::new(compounds.iter().copied())),
        )
    }

    pub fn extractor(&self, analyzer: Arc<ScriptedAnalyzer>) -> KeywordExtractor {
        KeywordExtractor::new(self.db.clone(), analyzer, self.terms(&[]))
    }

    pub fn aggregator(&self) -> TrendAggregator {
        TrendAggregator::new(self.db.clone())
    }

    pub fn runner(&self) -> JobRunner {
        JobRunner::new(self.db.clone(), chrono::Duration::minutes(30))
    }

    pub fn admin(&self, analyzer: Arc<ScriptedAnalyzer>) -> AdminService {
        AdminService::new(
            self.runner(),
            Arc::new(self.extractor(analyzer)),
            Arc::new(self.aggregator()),
        )
    }
}
