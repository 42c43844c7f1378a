use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewstrendError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Text processing error: {0}")]
    Nlp(#[from] crate::nlp::NlpError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] crate::analyzer::AnalyzerError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid window: start {start} is not before end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Hour span {hours} is out of range (0..={max})")]
    HoursOutOfRange { hours: i64, max: i64 },

    #[error("Job '{job}' run {run_id} failed: {message}")]
    Job {
        job: String,
        run_id: i64,
        message: String,
    },

    #[error("Job '{job}' is already running elsewhere")]
    JobBusy { job: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, NewstrendError>;
