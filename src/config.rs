use std::env;
use std::time::Duration;

use log::warn;

/// Slice that receives every statement that touches no sharded table.
pub const DEFAULT_SLICE: &str = "slice-0";

const DEFAULT_MAX_PARALLEL: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub default_slice: String,
    /// Upper bound on concurrently dispatched backend statements per plan.
    pub max_parallel: usize,
    /// Applied to requests that carry no deadline of their own.
    pub backend_timeout: Option<Duration>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            default_slice: DEFAULT_SLICE.to_string(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            backend_timeout: None,
        }
    }
}

impl PlannerConfig {
    pub fn with_default_slice(mut self, slice: &str) -> Self {
        self.default_slice = slice.to_string();
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Read overrides from `SHARDPLAN_DEFAULT_SLICE`, `SHARDPLAN_MAX_PARALLEL`
    /// and `SHARDPLAN_BACKEND_TIMEOUT_MS`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = PlannerConfig::default();
        if let Ok(slice) = env::var("SHARDPLAN_DEFAULT_SLICE") {
            if !slice.is_empty() {
                config.default_slice = slice;
            }
        }
        if let Ok(raw) = env::var("SHARDPLAN_MAX_PARALLEL") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_parallel = n,
                _ => warn!("ignoring SHARDPLAN_MAX_PARALLEL={:?}", raw),
            }
        }
        if let Ok(raw) = env::var("SHARDPLAN_BACKEND_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => config.backend_timeout = Some(Duration::from_millis(ms)),
                Err(_) => warn!("ignoring SHARDPLAN_BACKEND_TIMEOUT_MS={:?}", raw),
            }
        }
        config
    }
}
