pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod nlp;
pub mod pipeline;
pub mod sanitize;
pub mod score;
pub mod secrets;
pub mod trend;
pub mod window;

pub use analyzer::{HttpAnalyzer, KeywordAnalyzer};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, NewstrendError, Result};
pub use jobs::{AdminService, JobRunner, RunId, Scheduler};
pub use nlp::{CompoundDictionary, TermExtractor};
pub use pipeline::{ExtractionReport, KeywordExtractor};
pub use score::Score;
pub use secrets::SecretError;
pub use trend::{AggregationReport, TrendAggregator};
pub use window::TimeWindow;
