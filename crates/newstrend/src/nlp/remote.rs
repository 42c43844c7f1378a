//! HTTP tokenizer client.
//!
//! Every failure mode (transport, non-2xx status, undecodable body) yields an
//! empty token list and a warning. Extraction degrades instead of failing.

use std::time::Duration;

use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::NlpError;
use crate::sanitize::{redact_url, truncate};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    #[serde(default)]
    tokens: Vec<String>,
}

/// Picks the tokenization endpoint: an explicit full URL wins, otherwise
/// `/tokenize` is appended to the base URL.
pub fn resolve_endpoint(url: Option<&str>, base_url: Option<&str>) -> Option<String> {
    if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    let base = base_url.map(str::trim).filter(|b| !b.is_empty())?;
    if base.ends_with('/') {
        Some(format!("{}tokenize", base))
    } else {
        Some(format!("{}/tokenize", base))
    }
}

/// Client for a remote tokenization service.
#[derive(Debug, Clone)]
pub struct RemoteTokenizer {
    client: Client,
    endpoint: String,
}

impl RemoteTokenizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NlpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| NlpError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `text` for tokenization. Returned tokens are trimmed and blanks
    /// are dropped.
    pub async fn tokenize(&self, text: &str) -> Vec<String> {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(&TokenizeRequest { text })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Tokenizer request to {} failed: {}",
                    redact_url(&self.endpoint),
                    e
                );
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Tokenizer at {} returned {}: {}",
                redact_url(&self.endpoint),
                status,
                truncate(&body)
            );
            return Vec::new();
        }

        match response.json::<TokenizeResponse>().await {
            Ok(body) => body
                .tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Err(e) => {
                warn!(
                    "Failed to decode tokenizer response from {}: {}",
                    redact_url(&self.endpoint),
                    e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_url_wins() {
        assert_eq!(
            resolve_endpoint(Some("http://a/custom"), Some("http://b")).as_deref(),
            Some("http://a/custom")
        );
    }

    #[test]
    fn test_base_url_gets_path() {
        assert_eq!(
            resolve_endpoint(None, Some("http://b")).as_deref(),
            Some("http://b/tokenize")
        );
        assert_eq!(
            resolve_endpoint(Some("  "), Some("http://b/")).as_deref(),
            Some("http://b/tokenize")
        );
    }

    #[test]
    fn test_no_endpoint() {
        assert!(resolve_endpoint(None, None).is_none());
        assert!(resolve_endpoint(Some(""), Some(" ")).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_empty() {
        // Port 9 (discard) on localhost is closed in test environments.
        let tokenizer =
            RemoteTokenizer::new("http://127.0.0.1:9/tokenize", Duration::from_secs(2)).unwrap();
        assert!(tokenizer.tokenize("인공 지능").await.is_empty());
    }
}
