//! Client for the external keyword analysis service.
//!
//! The service receives an article body and title and returns scored
//! keywords plus an optional summary. It is consumed as a black box; the
//! [`KeywordAnalyzer`] trait is the seam the extraction pipeline depends on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AnalyzerConfig;
use crate::sanitize::{redact_url, truncate};
use crate::secrets::{resolve_api_key, SecretError};

const API_KEY_HEADER: &str = "X-API-KEY";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Analyzer request failed: {0}")]
    Request(String),

    #[error("Analyzer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode analyzer response: {0}")]
    Decode(String),

    #[error("Analyzer credentials: {0}")]
    Credentials(#[from] SecretError),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub html_content: String,
    pub article_title: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AnalyzeRequest {
    pub fn new(html_content: impl Into<String>, article_title: impl Into<String>) -> Self {
        Self {
            html_content: html_content.into(),
            article_title: article_title.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct KeywordScore {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<KeywordScore>>,
    #[serde(default)]
    pub definitions: Option<HashMap<String, String>>,
}

impl AnalyzeResponse {
    /// Keyword list, empty when the service sent none.
    pub fn keywords(&self) -> &[KeywordScore] {
        self.keywords.as_deref().unwrap_or_default()
    }

    /// The summary, if present and not blank.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait KeywordAnalyzer: Send + Sync {
    /// Analyzes one article. `Ok(None)` means the service answered with an
    /// empty body.
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<Option<AnalyzeResponse>, AnalyzerError>;
}

/// HTTP implementation posting JSON to `{base_url}/analyze`.
pub struct HttpAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for HttpAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAnalyzer")
            .field("endpoint", &redact_url(&self.endpoint))
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .finish()
    }
}

pub fn analyze_endpoint(base_url: &str) -> String {
    format!("{}/analyze", base_url.trim().trim_end_matches('/'))
}

impl HttpAnalyzer {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: analyze_endpoint(base_url),
            api_key,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let api_key = resolve_api_key(&config.credentials)?;
        if api_key.is_none() {
            log::warn!("No analyzer API key configured; requests are sent unauthenticated");
        }
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl KeywordAnalyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<Option<AnalyzeResponse>, AnalyzerError> {
        debug!(
            "Analyzing '{}' ({} bytes) via {}",
            truncate(&request.article_title),
            request.html_content.len(),
            redact_url(&self.endpoint)
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalyzerError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Status {
                status,
                body: truncate(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalyzerError::Request(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<Option<AnalyzeResponse>>(&body)
            .map_err(|e| AnalyzerError::Decode(e.to_string()))
    }
}
