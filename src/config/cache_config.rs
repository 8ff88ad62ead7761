//! Cache configuration parsing from environment variables.
//!
//! Lifetimes for memoized collaborator responses, per data kind.

use std::env;
use std::time::Duration;

/// Cache environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEnvConfig {
    pub quote_ttl: Duration,
    pub candle_ttl: Duration,
    pub flow_ttl: Duration,
}

impl Default for CacheEnvConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::from_secs(30),
            candle_ttl: Duration::from_secs(60),
            flow_ttl: Duration::from_secs(300),
        }
    }
}

impl CacheEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quote_ttl: Self::parse_secs("QUOTE_CACHE_TTL_SECS", defaults.quote_ttl),
            candle_ttl: Self::parse_secs("CANDLE_CACHE_TTL_SECS", defaults.candle_ttl),
            flow_ttl: Self::parse_secs("FLOW_CACHE_TTL_SECS", defaults.flow_ttl),
        }
    }

    fn parse_secs(key: &str, default: Duration) -> Duration {
        env::var(key)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}
