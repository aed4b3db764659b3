//! Engine configuration.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Tunable intervals and bounds for the authorization engine.
///
/// Every option can be overridden from the environment via
/// [`Config::from_env`]; durations are given in milliseconds there.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Write-based TTL after which a whole window entry is reclaimed.
    pub cache_expiration: Duration,
    /// Per-pair age threshold used by the evictor; also the horizon of the
    /// doubled-transaction rule.
    pub eviction_interval: Duration,
    /// Horizon of the high-frequency rule.
    pub high_frequency_interval: Duration,
    /// Number of transactions allowed inside the high-frequency horizon.
    pub high_frequency_threshold: usize,
    /// Period of the background eviction task.
    pub eviction_tick: Duration,
    /// Bound on distinct `(merchant, amount)` keys held by the window.
    pub max_window_keys: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_expiration: Duration::from_secs(30),
            eviction_interval: Duration::from_secs(120),
            high_frequency_interval: Duration::from_secs(120),
            high_frequency_threshold: 3,
            eviction_tick: Duration::from_secs(3),
            max_window_keys: 100,
        }
    }
}

impl Config {
    pub const fn with_cache_expiration(mut self, interval: Duration) -> Self {
        self.cache_expiration = interval;
        self
    }

    pub const fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    pub const fn with_high_frequency_interval(mut self, interval: Duration) -> Self {
        self.high_frequency_interval = interval;
        self
    }

    pub const fn with_high_frequency_threshold(mut self, threshold: usize) -> Self {
        self.high_frequency_threshold = threshold;
        self
    }

    pub const fn with_eviction_tick(mut self, tick: Duration) -> Self {
        self.eviction_tick = tick;
        self
    }

    pub const fn with_max_window_keys(mut self, max: usize) -> Self {
        self.max_window_keys = max;
        self
    }

    /// Build a configuration from `AUTH_ENG_*` environment variables,
    /// falling back to the default for any option that is absent or does
    /// not parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_expiration: env_duration_ms("AUTH_ENG_CACHE_EXPIRATION_MS", defaults.cache_expiration),
            eviction_interval: env_duration_ms("AUTH_ENG_EVICTION_INTERVAL_MS", defaults.eviction_interval),
            high_frequency_interval: env_duration_ms(
                "AUTH_ENG_HIGH_FREQUENCY_INTERVAL_MS",
                defaults.high_frequency_interval,
            ),
            high_frequency_threshold: env_count(
                "AUTH_ENG_HIGH_FREQUENCY_THRESHOLD",
                defaults.high_frequency_threshold,
            ),
            eviction_tick: env_duration_ms("AUTH_ENG_EVICTION_TICK_MS", defaults.eviction_tick),
            max_window_keys: env_count("AUTH_ENG_MAX_WINDOW_KEYS", defaults.max_window_keys),
        }
    }
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(name, raw = %raw, "ignoring unparseable duration override");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_count(name: &str, default: usize) -> usize {
    match env::var(name) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(count) => count,
            Err(_) => {
                warn!(name, raw = %raw, "ignoring unparseable count override");
                default
            }
        },
        Err(_) => default,
    }
}
