//! Analysis configuration parsing from environment variables.
//!
//! This module handles loading order block detection and flow window parameters.

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Analysis environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEnvConfig {
    // Order Block Detector
    pub ob_lookback_bars: usize,
    pub ob_body_multiplier: Decimal,

    // Input windows
    pub candle_history_days: usize,
    pub flow_window_days: usize,

    // Run the broad investor-class agreement tier
    pub broad_flow_tier: bool,
}

impl Default for AnalysisEnvConfig {
    fn default() -> Self {
        Self {
            ob_lookback_bars: 50,
            ob_body_multiplier: Decimal::new(15, 1),
            candle_history_days: 60,
            flow_window_days: 7,
            broad_flow_tier: false,
        }
    }
}

impl AnalysisEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let ob_lookback_bars = Self::parse_usize("OB_LOOKBACK_BARS", defaults.ob_lookback_bars)?;
        Self::check_lookback("OB_LOOKBACK_BARS", ob_lookback_bars)?;

        let ob_body_multiplier = env::var("OB_BODY_MULTIPLIER")
            .ok()
            .map(|raw| Decimal::from_str(raw.trim()))
            .transpose()
            .context("Failed to parse OB_BODY_MULTIPLIER")?
            .unwrap_or(defaults.ob_body_multiplier);
        Self::check_multiplier("OB_BODY_MULTIPLIER", ob_body_multiplier)?;

        Ok(Self {
            ob_lookback_bars,
            ob_body_multiplier,
            candle_history_days: Self::parse_usize(
                "CANDLE_HISTORY_DAYS",
                defaults.candle_history_days,
            )?,
            flow_window_days: Self::parse_usize("FLOW_WINDOW_DAYS", defaults.flow_window_days)?,
            broad_flow_tier: env::var("BROAD_FLOW_TIER")
                .unwrap_or_else(|_| "false".to_string())
                .parse::<bool>()
                .unwrap_or(false),
        })
    }

    /// Applies command-line detector overrides under the same rules as the env vars.
    pub fn with_detector_overrides(
        &self,
        lookback: Option<usize>,
        multiplier: Option<Decimal>,
    ) -> Result<Self> {
        let mut config = self.clone();
        if let Some(bars) = lookback {
            Self::check_lookback("--lookback", bars)?;
            config.ob_lookback_bars = bars;
        }
        if let Some(m) = multiplier {
            Self::check_multiplier("--multiplier", m)?;
            config.ob_body_multiplier = m;
        }
        Ok(config)
    }

    fn check_lookback(name: &str, bars: usize) -> Result<()> {
        if bars == 0 {
            bail!("{} must be positive", name);
        }
        Ok(())
    }

    fn check_multiplier(name: &str, multiplier: Decimal) -> Result<()> {
        if multiplier <= Decimal::ZERO {
            bail!("{} must be positive, got {}", name, multiplier);
        }
        Ok(())
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }
}
