//! Runtime configuration for the SDK (§6).
//!
//! Unlike the ambient git tooling this crate's implementation idiom is drawn
//! from, there is no personal/project config file layering here — env vars
//! are the single source of truth, matching the spec's non-goal of no
//! durable configuration storage.

use std::env;
use std::time::Duration;

/// Default health-check interval, matching §4.9's "default 60 s".
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 60_000;
/// Default nudge-evaluation interval, matching §4.9's "default 30 s".
pub const DEFAULT_NUDGE_INTERVAL_MS: u64 = 30_000;
/// Default forge result-cache capacity (§4.11).
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Recognized runtime configuration, loaded from environment variables (§6).
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Mandatory for the provider adapters; absence is a synchronous
    /// construction error at the forge, not a deferred async failure (§7, §8).
    pub api_key: Option<String>,
    /// `RUST_LOG`-style level name, used only by [`crate::logger::init_tracing`].
    pub log_level: String,
    /// Interval between automatic health probes run by the agent worker.
    pub health_interval: Duration,
    /// Interval between automatic nudge-rule evaluations run by the agent worker.
    pub nudge_interval: Duration,
    /// Capacity of the forge's result cache.
    pub cache_capacity: usize,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: "info".to_string(),
            health_interval: Duration::from_millis(DEFAULT_HEALTH_INTERVAL_MS),
            nudge_interval: Duration::from_millis(DEFAULT_NUDGE_INTERVAL_MS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl GenesisConfig {
    /// Load configuration from the process environment, falling back to the
    /// spec's documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(ms) = Self::read_u64("AGENT_HEALTH_INTERVAL_MS") {
            config.health_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = Self::read_u64("AGENT_NUDGE_INTERVAL_MS") {
            config.nudge_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) = Self::read_u64("CACHE_CAPACITY") {
            // A zero capacity is rejected by the cache constructor itself;
            // keep the spec default rather than propagate an invalid value here.
            if capacity > 0 {
                config.cache_capacity = usize::try_from(capacity).unwrap_or(DEFAULT_CACHE_CAPACITY);
            }
        }

        config
    }

    fn read_u64(var: &str) -> Option<u64> {
        env::var(var).ok().and_then(|v| v.parse().ok())
    }

    /// Returns the configured API key, or [`crate::error::ForgeError::MissingApiKey`]
    /// if none was provided.
    pub fn require_api_key(&self) -> Result<&str, crate::error::ForgeError> {
        self.api_key
            .as_deref()
            .ok_or(crate::error::ForgeError::MissingApiKey)
    }
}
