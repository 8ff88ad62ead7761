use crate::application::analysis::{
    OrderBlockDetector, Outlook, SkippedIndex, classify, classify_broad, compute_levels,
};
use crate::config::AnalysisEnvConfig;
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::{BroadSupplyTrend, FlowRow};
use crate::domain::ports::{CandleSource, FlowSource};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything one security needs, fetched up front.
#[derive(Debug, Clone)]
pub struct MarketInputs {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub flows: Vec<FlowRow>,
    pub current_price: Decimal,
    /// Fetch problems that were downgraded to empty series
    pub data_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub outlook: Outlook,
    pub broad: Option<BroadSupplyTrend>,
    pub skipped: Vec<SkippedIndex>,
    pub data_notes: Vec<String>,
}

/// Runs both pipelines for a symbol over the configured collaborators.
pub struct Analyst {
    candles: Arc<dyn CandleSource>,
    flows: Arc<dyn FlowSource>,
    config: AnalysisEnvConfig,
    detector: OrderBlockDetector,
}

impl Analyst {
    pub fn new(
        candles: Arc<dyn CandleSource>,
        flows: Arc<dyn FlowSource>,
        config: AnalysisEnvConfig,
    ) -> Self {
        let detector = OrderBlockDetector::new(config.ob_lookback_bars, config.ob_body_multiplier);
        Self {
            candles,
            flows,
            config,
            detector,
        }
    }

    /// Materialize candles, flows and a quote.
    ///
    /// A failed series fetch becomes an empty series plus a note; the core
    /// then reports empty / UNKNOWN. Without a price there is nothing to
    /// anchor levels on, so that one is an error.
    pub async fn fetch(&self, symbol: &str, price_override: Option<Decimal>) -> Result<MarketInputs> {
        let mut data_notes = Vec::new();

        let candles = match self
            .candles
            .daily_candles(symbol, self.config.candle_history_days)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!("Analyst: candle fetch failed for {}: {}", symbol, e);
                data_notes.push(format!("candles unavailable: {}", e));
                Vec::new()
            }
        };

        let flows = match self
            .flows
            .investor_flows(symbol, self.config.flow_window_days)
            .await
        {
            Ok(flows) => flows,
            Err(e) => {
                warn!("Analyst: flow fetch failed for {}: {}", symbol, e);
                data_notes.push(format!("investor flows unavailable: {}", e));
                Vec::new()
            }
        };

        let current_price = match price_override {
            Some(price) => price,
            None => self
                .candles
                .current_price(symbol)
                .await
                .with_context(|| format!("Failed to get current price for {}", symbol))?,
        };

        Ok(MarketInputs {
            symbol: symbol.to_string(),
            candles,
            flows,
            current_price,
            data_notes,
        })
    }

    /// Pure step over materialized inputs; safe to run on any thread.
    pub fn analyze_materialized(&self, inputs: MarketInputs, broad: bool) -> Result<SecurityReport> {
        let scan = self.detector.scan(&inputs.candles);
        let levels = compute_levels(inputs.current_price, &scan.blocks)
            .with_context(|| format!("Failed to compute levels for {}", inputs.symbol))?;

        let trend = classify(&inputs.flows);
        let broad_trend = broad.then(|| classify_broad(&inputs.flows));
        let effective_label = broad_trend.as_ref().map(|b| b.label);

        info!(
            "Analyst: {} -> {} zones, trend {}, {} skipped",
            inputs.symbol,
            scan.blocks.len(),
            effective_label.unwrap_or(trend.label),
            scan.skipped.len()
        );

        let outlook = Outlook::build(
            &inputs.symbol,
            inputs.current_price,
            scan.blocks,
            levels,
            Some(trend),
            effective_label,
        );

        Ok(SecurityReport {
            outlook,
            broad: broad_trend,
            skipped: scan.skipped,
            data_notes: inputs.data_notes,
        })
    }

    pub async fn analyze(
        &self,
        symbol: &str,
        price_override: Option<Decimal>,
        broad: bool,
    ) -> Result<SecurityReport> {
        let inputs = self.fetch(symbol, price_override).await?;
        self.analyze_materialized(inputs, broad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::flow::{Stance, TrendLabel};
    use crate::infrastructure::mock::MockMarketData;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn quiet_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let (open, close) = if i % 2 == 0 {
                    (dec!(100), dec!(101))
                } else {
                    (dec!(101), dec!(100))
                };
                Candle::new(
                    start() + Duration::days(i as i64),
                    open,
                    dec!(101.5),
                    dec!(99.5),
                    close,
                    1_000,
                )
            })
            .collect()
    }

    fn selling_flows(n: usize) -> Vec<FlowRow> {
        (0..n)
            .map(|i| FlowRow::new(start() + Duration::days(i as i64), -300, -200))
            .collect()
    }

    fn analyst(mock: Arc<MockMarketData>) -> Analyst {
        Analyst::new(mock.clone(), mock, AnalysisEnvConfig::default())
    }

    #[tokio::test]
    async fn test_analyze_uses_quote_and_flows() {
        let mock = Arc::new(MockMarketData::new());
        mock.set_candles("005930", quiet_candles(30));
        mock.set_flows("005930", selling_flows(7));
        mock.set_price("005930", dec!(100.5));

        let report = analyst(mock).analyze("005930", None, false).await.unwrap();

        assert_eq!(report.outlook.current_price, dec!(100.5));
        assert!(report.outlook.order_blocks.is_empty());
        assert_eq!(report.outlook.effective_label, Some(TrendLabel::Distributing));
        assert_eq!(report.outlook.stance, Stance::Avoid);
        assert!(report.broad.is_none());
        assert!(report.data_notes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_flow_fetch_degrades_to_unknown() {
        let mock = Arc::new(MockMarketData::new());
        mock.set_candles("000660", quiet_candles(30));
        mock.set_price("000660", dec!(100));

        let report = analyst(mock).analyze("000660", None, true).await.unwrap();

        assert_eq!(report.outlook.effective_label, Some(TrendLabel::Unknown));
        assert_eq!(report.outlook.stance, Stance::Wait);
        assert_eq!(report.data_notes.len(), 1);
        assert!(report.data_notes[0].contains("investor flows"));
    }

    #[tokio::test]
    async fn test_missing_quote_is_an_error() {
        let mock = Arc::new(MockMarketData::new());
        mock.set_candles("035720", quiet_candles(30));

        let result = analyst(mock).analyze("035720", None, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_price_override_skips_quote_lookup() {
        let mock = Arc::new(MockMarketData::new());
        mock.set_candles("035720", quiet_candles(30));

        let report = analyst(mock.clone())
            .analyze("035720", Some(dec!(99)), false)
            .await
            .unwrap();

        assert_eq!(report.outlook.current_price, dec!(99));
        assert_eq!(mock.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_override_is_rejected() {
        let mock = Arc::new(MockMarketData::new());
        let result = analyst(mock).analyze("005930", Some(dec!(0)), false).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_broad_tier_overrides_label() {
        let mock = Arc::new(MockMarketData::new());
        let mut flows = selling_flows(7);
        for row in &mut flows {
            row.pension = Some(-10);
            row.private_fund = Some(-10);
        }
        let inputs = MarketInputs {
            symbol: "005930".to_string(),
            candles: Vec::new(),
            flows,
            current_price: dec!(100),
            data_notes: Vec::new(),
        };

        let report = analyst(mock).analyze_materialized(inputs, true).unwrap();
        assert_eq!(
            report.outlook.effective_label,
            Some(TrendLabel::BroadDistribution)
        );
        let broad = report.broad.unwrap();
        assert_eq!(broad.base.label, TrendLabel::Distributing);
        assert_eq!(broad.agreement.negative, 4);
    }
}
