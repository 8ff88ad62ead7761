use crate::domain::errors::DataSourceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::FlowRow;
use crate::domain::ports::{CandleSource, FlowSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// In-memory market data for tests and demos.
///
/// Counts calls per port method so decorators can be checked for hits.
#[derive(Debug, Default)]
pub struct MockMarketData {
    candles: RwLock<HashMap<String, Vec<Candle>>>,
    flows: RwLock<HashMap<String, Vec<FlowRow>>>,
    prices: RwLock<HashMap<String, Decimal>>,
    candle_calls: AtomicUsize,
    flow_calls: AtomicUsize,
    price_calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        Self::write(&self.candles).insert(symbol.to_string(), candles);
    }

    pub fn set_flows(&self, symbol: &str, rows: Vec<FlowRow>) {
        Self::write(&self.flows).insert(symbol.to_string(), rows);
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        Self::write(&self.prices).insert(symbol.to_string(), price);
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }

    pub fn flow_calls(&self) -> usize {
        self.flow_calls.load(Ordering::SeqCst)
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
        match lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
        match lock.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn not_found(symbol: &str) -> DataSourceError {
        DataSourceError::NotFound {
            symbol: symbol.to_string(),
            path: PathBuf::from("<memory>"),
        }
    }

    fn tail<T: Clone>(rows: &[T], days: usize) -> Vec<T> {
        rows[rows.len().saturating_sub(days)..].to_vec()
    }
}

#[async_trait]
impl CandleSource for MockMarketData {
    async fn daily_candles(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<Candle>, DataSourceError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        debug!("MockMarketData: candles for {} ({} days)", symbol, days);
        Self::read(&self.candles)
            .get(symbol)
            .map(|rows| Self::tail(rows, days))
            .ok_or_else(|| Self::not_found(symbol))
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal, DataSourceError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        Self::read(&self.prices)
            .get(symbol)
            .copied()
            .ok_or_else(|| DataSourceError::NoQuote {
                symbol: symbol.to_string(),
            })
    }
}

#[async_trait]
impl FlowSource for MockMarketData {
    async fn investor_flows(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<FlowRow>, DataSourceError> {
        self.flow_calls.fetch_add(1, Ordering::SeqCst);
        debug!("MockMarketData: flows for {} ({} days)", symbol, days);
        Self::read(&self.flows)
            .get(symbol)
            .map(|rows| Self::tail(rows, days))
            .ok_or_else(|| Self::not_found(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[tokio::test]
    async fn test_returns_most_recent_rows() {
        let mock = MockMarketData::new();
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let rows: Vec<FlowRow> = (0..10)
            .map(|i| FlowRow::new(start + Duration::days(i), i, 0))
            .collect();
        mock.set_flows("005930", rows);

        let tail = mock.investor_flows("005930", 3).await.unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].foreign_net, 7);
        assert_eq!(tail[2].foreign_net, 9);
        assert_eq!(mock.flow_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let mock = MockMarketData::new();
        assert!(matches!(
            mock.daily_candles("XXXX", 60).await,
            Err(DataSourceError::NotFound { .. })
        ));
        assert!(matches!(
            mock.current_price("XXXX").await,
            Err(DataSourceError::NoQuote { .. })
        ));
    }
}
