use std::path::Path;

use crate::config::schema::{Config, TokenizerProvider, CONFIG_VERSION};
use crate::error::ConfigError;
use crate::nlp::remote::resolve_endpoint;
use crate::window::MAX_SPAN_HOURS;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let nlp = &config.nlp;
    if nlp.min_span == 0 || nlp.max_span < nlp.min_span {
        return Err(invalid(format!(
            "nlp spans must satisfy 1 <= min_span <= max_span (got {}..{})",
            nlp.min_span, nlp.max_span
        )));
    }
    if nlp.provider == TokenizerProvider::Remote
        && resolve_endpoint(nlp.remote_url.as_deref(), nlp.remote_base_url.as_deref()).is_none()
    {
        return Err(invalid(
            "nlp.provider is 'remote' but neither remote_url nor remote_base_url is set",
        ));
    }
    if nlp.timeout_secs == 0 || config.analyzer.timeout_secs == 0 {
        return Err(invalid("timeout_secs must be positive"));
    }

    if config.analyzer.base_url.trim().is_empty() {
        return Err(invalid("analyzer.base_url must not be empty"));
    }

    let pipeline = &config.pipeline;
    if pipeline.lookback_hours < 0 || pipeline.lookahead_hours < 0 {
        return Err(invalid("pipeline lookback/lookahead hours must not be negative"));
    }
    if pipeline.lookback_hours == 0 && pipeline.lookahead_hours == 0 {
        return Err(invalid("pipeline extraction window must not be empty"));
    }
    if pipeline.preprocess_batch_size == 0 {
        return Err(invalid("pipeline.preprocess_batch_size must be positive"));
    }

    if config.trend.window_hours <= 0 || config.trend.retention_hours <= 0 {
        return Err(invalid("trend window_hours and retention_hours must be positive"));
    }

    let spans = [
        ("pipeline.lookback_hours", pipeline.lookback_hours),
        ("pipeline.lookahead_hours", pipeline.lookahead_hours),
        ("trend.window_hours", config.trend.window_hours),
        ("trend.retention_hours", config.trend.retention_hours),
    ];
    for (name, value) in spans {
        if value > MAX_SPAN_HOURS {
            return Err(invalid(format!(
                "{} must be at most {} (got {})",
                name, MAX_SPAN_HOURS, value
            )));
        }
    }

    let scheduler = &config.scheduler;
    let intervals = [
        ("preprocess_interval_secs", scheduler.preprocess_interval_secs),
        ("extraction_interval_secs", scheduler.extraction_interval_secs),
        ("aggregation_interval_secs", scheduler.aggregation_interval_secs),
        ("purge_interval_secs", scheduler.purge_interval_secs),
        ("lease_secs", scheduler.lease_secs),
    ];
    for (name, value) in intervals {
        if value == 0 {
            return Err(invalid(format!("scheduler.{} must be positive", name)));
        }
    }

    Ok(())
}
