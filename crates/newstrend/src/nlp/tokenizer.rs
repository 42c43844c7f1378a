//! Term extraction front end.

use std::sync::Arc;
use std::time::Duration;

use super::compound::{read_entries, CompoundDictionary};
use super::morph::{retained_terms, DictionaryAnalyzer, MorphAnalyzer};
use super::remote::{resolve_endpoint, RemoteTokenizer};
use super::NlpError;
use crate::config::{NlpConfig, TokenizerProvider};

/// Where raw terms come from. Chosen once when the extractor is built.
#[derive(Clone)]
pub enum TokenizerBackend {
    /// In-process morphological analysis with part-of-speech filtering.
    Local(Arc<dyn MorphAnalyzer>),
    /// A tokenization service over HTTP.
    Remote(RemoteTokenizer),
}

impl std::fmt::Debug for TokenizerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Local"),
            Self::Remote(remote) => f.debug_tuple("Remote").field(&remote.endpoint()).finish(),
        }
    }
}

/// Turns text into terms: backend tokenization followed by compound merging.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    backend: TokenizerBackend,
    compounds: Arc<CompoundDictionary>,
}

impl TermExtractor {
    pub fn new(backend: TokenizerBackend, compounds: Arc<CompoundDictionary>) -> Self {
        Self { backend, compounds }
    }

    /// Local extractor with the built-in lexicon and no compounds.
    pub fn local_default() -> Self {
        Self::new(
            TokenizerBackend::Local(Arc::new(DictionaryAnalyzer::default())),
            Arc::new(CompoundDictionary::empty()),
        )
    }

    /// Builds the extractor described by the `nlp` config section.
    pub fn from_config(config: &NlpConfig) -> Result<Self, NlpError> {
        let mut entries = config.compounds.clone();
        if let Some(path) = &config.compound_file {
            entries.extend(read_entries(path)?);
        }
        let compounds = Arc::new(CompoundDictionary::with_spans(
            &entries,
            config.max_span,
            config.min_span,
        ));

        let backend = match config.provider {
            TokenizerProvider::Local => {
                let analyzer = match &config.lexicon_path {
                    Some(path) => DictionaryAnalyzer::from_lexicon_file(path)?,
                    None => DictionaryAnalyzer::default(),
                };
                TokenizerBackend::Local(Arc::new(analyzer))
            }
            TokenizerProvider::Remote => {
                let endpoint =
                    resolve_endpoint(config.remote_url.as_deref(), config.remote_base_url.as_deref())
                        .ok_or(NlpError::MissingEndpoint)?;
                TokenizerBackend::Remote(RemoteTokenizer::new(
                    endpoint,
                    Duration::from_secs(config.timeout_secs),
                )?)
            }
        };

        log::info!(
            "Term extractor ready: backend={:?}, compounds={}",
            backend,
            compounds.len()
        );
        Ok(Self::new(backend, compounds))
    }

    pub fn backend(&self) -> &TokenizerBackend {
        &self.backend
    }

    /// Shared handle for reloading compounds at runtime.
    pub fn compounds(&self) -> &Arc<CompoundDictionary> {
        &self.compounds
    }

    /// Extracts terms from already-normalized text. Blank input yields no
    /// terms and makes no backend call.
    pub async fn extract_terms(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let raw = match &self.backend {
            TokenizerBackend::Local(analyzer) => retained_terms(&analyzer.analyze(text)),
            TokenizerBackend::Remote(remote) => remote.tokenize(text).await,
        };
        if raw.is_empty() || self.compounds.is_empty() {
            return raw;
        }
        self.compounds.merge(&raw)
    }
}

/// Splits stored processed text back into terms.
pub fn tokenize(processed_text: &str) -> Vec<String> {
    processed_text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::morph::{Morpheme, PosTag};

    struct FixedAnalyzer(Vec<Morpheme>);

    impl MorphAnalyzer for FixedAnalyzer {
        fn analyze(&self, _text: &str) -> Vec<Morpheme> {
            self.0.clone()
        }
    }

    fn extractor(morphemes: Vec<Morpheme>, compounds: &[&str]) -> TermExtractor {
        TermExtractor::new(
            TokenizerBackend::Local(Arc::new(FixedAnalyzer(morphemes))),
            Arc::new(CompoundDictionary::new(compounds)),
        )
    }

    #[tokio::test]
    async fn test_blank_input_yields_nothing() {
        let ex = extractor(vec![Morpheme::new("x", PosTag::Nng)], &[]);
        assert!(ex.extract_terms("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_filters_then_merges() {
        let ex = extractor(
            vec![
                Morpheme::new("인공", PosTag::Nng),
                Morpheme::new("지능", PosTag::Nng),
                Morpheme::new("의", PosTag::Jkg),
                Morpheme::new("발전", PosTag::Nng),
                Morpheme::new(" ", PosTag::Nng),
                Morpheme::new("매우", PosTag::Mag),
            ],
            &["인공지능"],
        );
        assert_eq!(ex.extract_terms("무엇이든").await, vec!["인공지능", "발전"]);
    }

    #[tokio::test]
    async fn test_dictionary_analyzer_end_to_end() {
        let analyzer = DictionaryAnalyzer::new(vec![
            ("인공".to_string(), PosTag::Nng),
            ("지능".to_string(), PosTag::Nng),
        ]);
        let ex = TermExtractor::new(
            TokenizerBackend::Local(Arc::new(analyzer)),
            Arc::new(CompoundDictionary::new(["인공지능"])),
        );
        assert_eq!(
            ex.extract_terms("인공지능의 발전이 빠르다").await,
            vec!["인공지능", "발전", "빠르다"]
        );
    }

    #[test]
    fn test_from_config_remote_requires_endpoint() {
        let config = NlpConfig {
            provider: TokenizerProvider::Remote,
            ..NlpConfig::default()
        };
        assert!(matches!(
            TermExtractor::from_config(&config),
            Err(NlpError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_from_config_loads_compound_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compounds.txt");
        std::fs::write(&path, "반도체산업\n").unwrap();
        let config = NlpConfig {
            compounds: vec!["인공 지능".to_string()],
            compound_file: Some(path),
            ..NlpConfig::default()
        };
        let ex = TermExtractor::from_config(&config).unwrap();
        assert_eq!(ex.compounds().len(), 2);
        assert!(matches!(ex.backend(), TokenizerBackend::Local(_)));
    }

    #[test]
    fn test_tokenize_splits_whitespace_runs() {
        assert_eq!(tokenize("  인공지능  발전\t반도체 "), vec!["인공지능", "발전", "반도체"]);
        assert!(tokenize("   ").is_empty());
    }
}
