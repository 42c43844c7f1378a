//! Job names shared by the gate, the run log and the lease table.

pub const PROCESS_NEW_ARTICLES: &str = "process_new_articles";
pub const ANALYZE_KEYWORDS: &str = "analyze_keywords";
// Kept as "24h" even though the window length is configurable.
pub const AGGREGATE_TREND_24H: &str = "aggregate_trend_24h";
pub const PURGE_TREND_SNAPSHOT: &str = "purge_trend_snapshot";

/// Names under which manual admin runs are logged.
pub const RERUN_KEYWORDS: &str = "rerun_keywords";
pub const BUILD_TREND_SNAPSHOT: &str = "build_trend_snapshot";
pub const CLEANUP_SNAPSHOTS: &str = "cleanup_snapshots";

pub const SCHEDULED_JOBS: [&str; 4] = [
    PROCESS_NEW_ARTICLES,
    ANALYZE_KEYWORDS,
    AGGREGATE_TREND_24H,
    PURGE_TREND_SNAPSHOT,
];

pub fn is_scheduled(name: &str) -> bool {
    SCHEDULED_JOBS.contains(&name)
}
