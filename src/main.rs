//! smartmoney - order block and investor-flow analysis
//!
//! Reads daily candles and investor flows exported under `DATA_DIR` and
//! prints order block zones, derived levels and the supply trend.
//!
//! # Usage
//! ```sh
//! smartmoney analyze 005930 --broad
//! smartmoney --json batch --symbols 005930,000660,035720
//! ```
//!
//! # Environment Variables
//! - `DATA_DIR` - Root of the per-symbol CSV exports (default: ./data)
//! - `OB_LOOKBACK_BARS`, `OB_BODY_MULTIPLIER` - Detector tuning
//! - `CANDLE_HISTORY_DAYS`, `FLOW_WINDOW_DAYS` - Input windows
//! - `RUST_LOG` - Log filter (logs go to stderr)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use smartmoney::application::analysis::{OrderBlockDetector, classify, classify_broad};
use smartmoney::application::analyst::{Analyst, SecurityReport};
use smartmoney::config::Config;
use smartmoney::infrastructure::{CachedMarketData, CsvMarketData};
use smartmoney::interfaces::report;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Order block and smart-money flow analyzer", long_about = None)]
struct Cli {
    /// Root directory holding <SYMBOL>/candles.csv and <SYMBOL>/flows.csv
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit JSON instead of text tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect order blocks for a symbol
    Blocks {
        symbol: String,

        /// Bars scanned backward from the newest pair
        #[arg(long)]
        lookback: Option<usize>,

        /// Impulse body must exceed this multiple of the average body
        #[arg(long)]
        multiplier: Option<Decimal>,
    },
    /// Derive support, resistance, entries and stop from order blocks
    Levels {
        symbol: String,

        /// Use this price instead of the latest quote
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Classify recent foreign and institutional flows
    Flows {
        symbol: String,

        /// Trailing window in trading days
        #[arg(long)]
        days: Option<usize>,

        /// Also run the five-class agreement tier
        #[arg(long)]
        broad: bool,
    },
    /// Full outlook: zones, levels, supply trend and stance
    Analyze {
        symbol: String,

        #[arg(long)]
        price: Option<Decimal>,

        #[arg(long)]
        broad: bool,
    },
    /// Analyze several symbols; fetches first, then analyzes in parallel
    Batch {
        /// Comma-separated list of symbols
        #[arg(short, long)]
        symbols: String,

        #[arg(long)]
        broad: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    info!("smartmoney {} reading {}", env!("CARGO_PKG_VERSION"), config.data_dir.display());

    let csv = CsvMarketData::new(config.data_dir.clone());

    match cli.command {
        Commands::Blocks {
            symbol,
            lookback,
            multiplier,
        } => {
            let tuning = config.analysis.with_detector_overrides(lookback, multiplier)?;
            let detector = OrderBlockDetector::new(tuning.ob_lookback_bars, tuning.ob_body_multiplier);
            let (candles, load) = csv
                .load_candles(&symbol)
                .with_context(|| format!("Failed to load candles for {}", symbol))?;
            let window = &candles[candles.len().saturating_sub(config.analysis.candle_history_days)..];
            let price = csv
                .price_from(&symbol, &candles)
                .with_context(|| format!("Failed to get current price for {}", symbol))?;
            let scan = detector.scan(window);

            if cli.json {
                print_json(&scan)?;
            } else {
                if load.rejected_count() > 0 {
                    println!("{}", report::render_load_report("candles.csv", &load));
                }
                println!("{}", report::render_blocks(&symbol, &scan.blocks, price));
                if !scan.skipped.is_empty() {
                    println!("Skipped {} candidate bar(s).", scan.skipped.len());
                }
            }
        }
        Commands::Levels { symbol, price } => {
            let analyst = build_analyst(&config, csv);
            let outlook = analyst.analyze(&symbol, price, false).await?.outlook;

            if cli.json {
                print_json(&outlook.levels)?;
            } else {
                println!("{}", report::render_levels(&outlook.levels, outlook.current_price));
            }
        }
        Commands::Flows {
            symbol,
            days,
            broad,
        } => {
            let (rows, load) = csv
                .load_flows(&symbol)
                .with_context(|| format!("Failed to load investor flows for {}", symbol))?;
            let days = days.unwrap_or(config.analysis.flow_window_days);
            let window = &rows[rows.len().saturating_sub(days)..];
            let trend = classify(window);
            let broad_trend = (broad || config.analysis.broad_flow_tier).then(|| classify_broad(window));

            if cli.json {
                match &broad_trend {
                    Some(b) => print_json(b)?,
                    None => print_json(&trend)?,
                }
            } else {
                if load.rejected_count() > 0 {
                    println!("{}", report::render_load_report("flows.csv", &load));
                }
                println!("{}", report::render_trend(&trend, broad_trend.as_ref()));
            }
        }
        Commands::Analyze {
            symbol,
            price,
            broad,
        } => {
            let broad = broad || config.analysis.broad_flow_tier;
            let analyst = build_analyst(&config, csv);
            let security = analyst.analyze(&symbol, price, broad).await?;

            if cli.json {
                print_json(&security)?;
            } else {
                println!("{}", report::render_report(&security));
            }
        }
        Commands::Batch { symbols, broad } => {
            let broad = broad || config.analysis.broad_flow_tier;
            let symbol_list: Vec<String> = symbols
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            let analyst = build_analyst(&config, csv);

            // All I/O happens here; the parallel step below is pure
            let mut inputs = Vec::with_capacity(symbol_list.len());
            for symbol in &symbol_list {
                match analyst.fetch(symbol, None).await {
                    Ok(fetched) => inputs.push(fetched),
                    Err(e) => error!("Skipping {}: {:#}", symbol, e),
                }
            }

            let results: Vec<(String, Result<SecurityReport>)> = inputs
                .into_par_iter()
                .map(|fetched| {
                    let symbol = fetched.symbol.clone();
                    (symbol, analyst.analyze_materialized(fetched, broad))
                })
                .collect();

            let mut reports = Vec::with_capacity(results.len());
            for (symbol, result) in results {
                match result {
                    Ok(security) => reports.push(security),
                    Err(e) => error!("Analysis failed for {}: {:#}", symbol, e),
                }
            }

            if cli.json {
                print_json(&reports)?;
            } else {
                println!("{}", report::render_batch_table(&reports));
            }
        }
    }

    Ok(())
}

fn build_analyst(config: &Config, csv: CsvMarketData) -> Analyst {
    let source = Arc::new(CachedMarketData::new(csv, &config.cache));
    Analyst::new(source.clone(), source, config.analysis.clone())
}
