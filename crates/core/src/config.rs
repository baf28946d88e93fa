//! Process-wide configuration record (§9 Design Notes: "no process-wide
//! mutable state is required; all configuration is a config record passed
//! to the worker pool at startup").

use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the Job Store, Worker Pool, Repository Cache, and engines.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for bare repository clones (§4.2, §6 `baseDir`).
    pub repo_cache_dir: PathBuf,
    /// How often each worker ticks (§4.1, default 5s).
    pub poll_interval: Duration,
    /// How long a `processing` job can sit before a restart sweeps it back
    /// to `pending` (§4.1, default 30 minutes).
    pub stale_threshold: Duration,
    /// Number of independent worker tickers (§4.1, §5).
    pub worker_count: usize,
    /// Default `git_mine` lookback window in days when the job payload omits `days` (§4.4).
    pub default_mine_days: i64,
    /// Files larger than this are skipped by the Import Extractor without raising (§4.3).
    pub max_import_file_bytes: u64,
    /// Default hotspot/trend window in weeks (§4.8).
    pub default_window_weeks: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_cache_dir: crate::paths::repo_cache_dir().unwrap_or_else(|| PathBuf::from("./repo-cache")),
            poll_interval: Duration::from_secs(5),
            stale_threshold: Duration::from_secs(30 * 60),
            worker_count: 4,
            default_mine_days: 90,
            max_import_file_bytes: 500 * 1024,
            default_window_weeks: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.stale_threshold, Duration::from_secs(1800));
        assert_eq!(cfg.default_mine_days, 90);
        assert_eq!(cfg.max_import_file_bytes, 500 * 1024);
        assert_eq!(cfg.default_window_weeks, 12);
    }
}
