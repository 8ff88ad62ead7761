use crate::config::CacheEnvConfig;
use crate::domain::errors::DataSourceError;
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::FlowRow;
use crate::domain::ports::{CandleSource, FlowSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::Duration;

struct Entry<V> {
    value: V,
    stored_at: i64,
}

/// Time-bounded memo keyed by request.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl_ms: i64,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &"<RwLock>")
            .field("ttl_ms", &self.ttl_ms)
            .finish()
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Fresh value for `key`, if any. A zero TTL never hits.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = chrono::Utc::now().timestamp_millis();
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl_ms)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` and drops whatever has already expired.
    pub fn insert(&self, key: K, value: V) {
        let now = chrono::Utc::now().timestamp_millis();
        let entry = Entry {
            value,
            stored_at: now,
        };
        let mut guard = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::error!("TtlCache: Lock poisoned during write, recovering");
                poisoned.into_inner()
            }
        };
        let ttl_ms = self.ttl_ms;
        guard.retain(|_, entry| now - entry.stored_at < ttl_ms);
        guard.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caching decorator over any market data collaborator.
///
/// Series are keyed by `(symbol, days)`, quotes by symbol. Errors are passed
/// through and never cached.
pub struct CachedMarketData<S> {
    inner: S,
    quotes: TtlCache<String, Decimal>,
    candles: TtlCache<(String, usize), Vec<Candle>>,
    flows: TtlCache<(String, usize), Vec<FlowRow>>,
}

impl<S> CachedMarketData<S> {
    pub fn new(inner: S, config: &CacheEnvConfig) -> Self {
        Self {
            inner,
            quotes: TtlCache::new(config.quote_ttl),
            candles: TtlCache::new(config.candle_ttl),
            flows: TtlCache::new(config.flow_ttl),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CandleSource> CandleSource for CachedMarketData<S> {
    async fn daily_candles(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<Candle>, DataSourceError> {
        let key = (symbol.to_string(), days);
        if let Some(hit) = self.candles.get(&key) {
            tracing::debug!("CachedMarketData: candle hit for {} ({} days)", symbol, days);
            return Ok(hit);
        }
        let candles = self.inner.daily_candles(symbol, days).await?;
        self.candles.insert(key, candles.clone());
        Ok(candles)
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal, DataSourceError> {
        let key = symbol.to_string();
        if let Some(hit) = self.quotes.get(&key) {
            return Ok(hit);
        }
        let price = self.inner.current_price(symbol).await?;
        self.quotes.insert(key, price);
        Ok(price)
    }
}

#[async_trait]
impl<S: FlowSource> FlowSource for CachedMarketData<S> {
    async fn investor_flows(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<FlowRow>, DataSourceError> {
        let key = (symbol.to_string(), days);
        if let Some(hit) = self.flows.get(&key) {
            tracing::debug!("CachedMarketData: flow hit for {} ({} days)", symbol, days);
            return Ok(hit);
        }
        let rows = self.inner.investor_flows(symbol, days).await?;
        self.flows.insert(key, rows.clone());
        Ok(rows)
    }
}
