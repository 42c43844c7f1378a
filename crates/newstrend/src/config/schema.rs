use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub nlp: NlpConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            database_path: None,
            nlp: NlpConfig::default(),
            analyzer: AnalyzerConfig::default(),
            pipeline: PipelineConfig::default(),
            trend: TrendConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerProvider {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    #[serde(default)]
    pub provider: TokenizerProvider,
    /// Full tokenization endpoint. Takes precedence over `remote_base_url`.
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_base_url: Option<String>,
    /// User lexicon for the local analyzer (`surface<TAB>TAG` per line).
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,
    #[serde(default)]
    pub compounds: Vec<String>,
    #[serde(default)]
    pub compound_file: Option<PathBuf>,
    #[serde(default = "default_max_span")]
    pub max_span: usize,
    #[serde(default = "default_min_span")]
    pub min_span: usize,
    #[serde(default = "default_tokenizer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_span() -> usize {
    crate::nlp::compound::DEFAULT_MAX_SPAN
}

fn default_min_span() -> usize {
    crate::nlp::compound::DEFAULT_MIN_SPAN
}

fn default_tokenizer_timeout_secs() -> u64 {
    10
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            provider: TokenizerProvider::Local,
            remote_url: None,
            remote_base_url: None,
            lexicon_path: None,
            compounds: Vec::new(),
            compound_file: None,
            max_span: default_max_span(),
            min_span: default_min_span(),
            timeout_secs: default_tokenizer_timeout_secs(),
        }
    }
}

/// Where the analyzer API key comes from. See [`crate::secrets`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeySource {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Base URL of the analysis service; requests go to `{base_url}/analyze`.
    #[serde(default = "default_analyzer_base_url")]
    pub base_url: String,
    #[serde(flatten)]
    pub credentials: ApiKeySource,
    #[serde(default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_analyzer_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_analyzer_timeout_secs() -> u64 {
    30
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: default_analyzer_base_url(),
            credentials: ApiKeySource::default(),
            timeout_secs: default_analyzer_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keyword surfaces copied onto `articles.top_words`.
    #[serde(default = "default_top_words")]
    pub top_words: usize,
    /// Scheduled extraction covers `[now - lookback, now + lookahead)`.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: i64,
    /// Articles preprocessed per `process_new_articles` run.
    #[serde(default = "default_preprocess_batch_size")]
    pub preprocess_batch_size: u32,
}

fn default_top_words() -> usize {
    10
}

fn default_lookback_hours() -> i64 {
    168
}

fn default_lookahead_hours() -> i64 {
    24
}

fn default_preprocess_batch_size() -> u32 {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_words: default_top_words(),
            lookback_hours: default_lookback_hours(),
            lookahead_hours: default_lookahead_hours(),
            preprocess_batch_size: default_preprocess_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
}

fn default_window_hours() -> i64 {
    24
}

fn default_retention_hours() -> i64 {
    48
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            retention_hours: default_retention_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_preprocess_interval_secs")]
    pub preprocess_interval_secs: u64,
    #[serde(default = "default_extraction_interval_secs")]
    pub extraction_interval_secs: u64,
    #[serde(default = "default_aggregation_interval_secs")]
    pub aggregation_interval_secs: u64,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// How long a job body may hold its lease before others can take over.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_preprocess_interval_secs() -> u64 {
    5 * 60
}

fn default_extraction_interval_secs() -> u64 {
    15 * 60
}

fn default_aggregation_interval_secs() -> u64 {
    3 * 60 * 60
}

fn default_purge_interval_secs() -> u64 {
    6 * 60 * 60
}

fn default_lease_secs() -> u64 {
    30 * 60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preprocess_interval_secs: default_preprocess_interval_secs(),
            extraction_interval_secs: default_extraction_interval_secs(),
            aggregation_interval_secs: default_aggregation_interval_secs(),
            purge_interval_secs: default_purge_interval_secs(),
            lease_secs: default_lease_secs(),
        }
    }
}
