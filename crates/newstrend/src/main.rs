use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use newstrend::config::{load_config, validate_config, Config};
use newstrend::db::default_database_path;
use newstrend::jobs::{ttl_from_secs, JobRunner, Scheduler};
use newstrend::{
    ConfigError, Database, HttpAnalyzer, KeywordExtractor, Result, TermExtractor,
    TrendAggregator,
};

const DEFAULT_LOG_FILTER: &str = "newstrend=info";

#[derive(Parser, Debug)]
#[command(name = "newstrend", version, about = "News keyword extraction and trend aggregation daemon")]
struct Args {
    /// JSON config file. Built-in defaults are used when omitted.
    #[arg(long, env = "NEWSTREND_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the config file.
    #[arg(long, env = "NEWSTREND_DATABASE")]
    database: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.json_logs);

    info!("Starting newstrend v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records into tracing: {}", e);
    }
}

fn load(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_config(path)?
        }
        None => {
            warn!("No config file given, using defaults");
            Config::default()
        }
    };
    if let Some(path) = &args.database {
        config.database_path = Some(path.clone());
    }
    validate_config(&config)?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load(&args)?;

    let db_path = config
        .database_path
        .clone()
        .or_else(default_database_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "No database path configured and no home directory found".to_string(),
        })?;
    let db = Database::open(&db_path)?;

    let terms = TermExtractor::from_config(&config.nlp)?;
    info!("Term extraction backend: {:?}", terms.backend());
    let analyzer = Arc::new(HttpAnalyzer::from_config(&config.analyzer)?);
    info!("Analyzer endpoint: {}", newstrend::sanitize::redact_url(analyzer.endpoint()));

    let extractor = Arc::new(
        KeywordExtractor::new(db.clone(), analyzer, terms).with_top_words(config.pipeline.top_words),
    );
    let aggregator = Arc::new(
        TrendAggregator::new(db.clone()).with_retention_hours(config.trend.retention_hours),
    );

    if !config.scheduler.enabled {
        warn!("Scheduler is disabled in the config, nothing to run");
        return Ok(());
    }

    let runner = JobRunner::new(db, ttl_from_secs(config.scheduler.lease_secs));
    info!("Lease holder: {}", runner.leases().holder());
    let scheduler = Scheduler::from_config(runner, &config, extractor, aggregator);
    let handles = scheduler.start()?;
    info!("Scheduled jobs: {}", scheduler.job_names().join(", "));

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| std::io::Error::other(e.to_string()))?;

    let _ = rx.recv();
    info!("Shutting down, waiting for running jobs to finish");
    scheduler.stop();
    for handle in handles {
        if handle.join().is_err() {
            error!("A job thread panicked");
        }
    }
    info!("Stopped");
    Ok(())
}
