//! Configuration module for smartmoney.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Analysis parameters and Cache lifetimes.

mod analysis_config;
mod cache_config;

pub use analysis_config::AnalysisEnvConfig;
pub use cache_config::CacheEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub analysis: AnalysisEnvConfig,
    pub cache: CacheEnvConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            analysis: AnalysisEnvConfig::default(),
            cache: CacheEnvConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let analysis = AnalysisEnvConfig::from_env().context("Failed to load analysis config")?;
        let cache = CacheEnvConfig::from_env();

        Ok(Self {
            data_dir,
            analysis,
            cache,
        })
    }
}
