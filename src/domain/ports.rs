use crate::domain::errors::DataSourceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::FlowRow;
use async_trait::async_trait;
use rust_decimal::Decimal;

// Providers may block on I/O; everything must be materialized before the
// analysis core runs.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Most recent `days` daily candles, oldest first.
    async fn daily_candles(&self, symbol: &str, days: usize)
    -> Result<Vec<Candle>, DataSourceError>;

    async fn current_price(&self, symbol: &str) -> Result<Decimal, DataSourceError>;
}

#[async_trait]
pub trait FlowSource: Send + Sync {
    /// Most recent `days` investor-flow rows, oldest first.
    async fn investor_flows(&self, symbol: &str, days: usize)
    -> Result<Vec<FlowRow>, DataSourceError>;
}
