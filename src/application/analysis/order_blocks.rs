use crate::domain::errors::RowRejection;
use crate::domain::market::candle::Candle;
use crate::domain::market::order_block::{OrderBlock, OrderBlockKind};
use crate::domain::validation::data_quality::StrictRowValidator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

/// Below this many candles there is no stable body average to compare against.
pub const MIN_CANDLES: usize = 15;

/// Bars averaged to establish the "normal" body size before an origin candle.
pub const BODY_AVERAGE_WINDOW: usize = 10;

/// Why a candidate origin index produced nothing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// Trailing bodies average to zero (no movement)
    DegenerateWindow,
    /// The origin or impulse candle breaks OHLC invariants
    MalformedCandle(String),
    /// Checked decimal arithmetic overflowed
    ArithmeticOverflow,
}

impl From<RowRejection> for SkipReason {
    fn from(rejection: RowRejection) -> Self {
        SkipReason::MalformedCandle(rejection.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedIndex {
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of one backward scan, including the indices that were passed over.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBlockScan {
    /// Strongest first
    pub blocks: Vec<OrderBlock>,
    pub skipped: Vec<SkippedIndex>,
}

/// Order Block Detector
///
/// An order block is the last opposite-colored candle before an unusually
/// large impulse candle that closes beyond it:
/// 1. Bullish: down candle, then an up candle closing above its high.
/// 2. Bearish: up candle, then a down candle closing below its low.
///
/// "Unusually large" means the impulse body exceeds `body_multiplier` times the
/// mean body of the 10 candles preceding the origin.
#[derive(Debug, Clone)]
pub struct OrderBlockDetector {
    pub lookback_bars: usize,
    pub body_multiplier: Decimal,
}

impl Default for OrderBlockDetector {
    fn default() -> Self {
        Self {
            lookback_bars: 50,
            body_multiplier: dec!(1.5),
        }
    }
}

impl OrderBlockDetector {
    pub fn new(lookback_bars: usize, body_multiplier: Decimal) -> Self {
        Self {
            lookback_bars,
            body_multiplier,
        }
    }

    /// Detect order blocks, strongest first.
    pub fn detect(&self, candles: &[Candle]) -> Vec<OrderBlock> {
        let scan = self.scan(candles);
        for skipped in &scan.skipped {
            debug!(
                "OrderBlockDetector: skipped index {}: {:?}",
                skipped.index, skipped.reason
            );
        }
        scan.blocks
    }

    /// Walks origin indices from the newest pair backward.
    ///
    /// The scan floor is `max(n - lookback_bars, 10)` and is exclusive, so every
    /// origin has a full 10-bar average window behind it.
    pub fn scan(&self, candles: &[Candle]) -> OrderBlockScan {
        let mut scan = OrderBlockScan::default();
        let n = candles.len();
        if n < MIN_CANDLES {
            return scan;
        }

        let floor = n.saturating_sub(self.lookback_bars).max(BODY_AVERAGE_WINDOW);

        for i in (floor + 1..=n - 2).rev() {
            match self.evaluate(candles, i) {
                Ok(Some(block)) => scan.blocks.push(block),
                Ok(None) => {}
                Err(reason) => scan.skipped.push(SkippedIndex { index: i, reason }),
            }
        }

        // Stable: equal strengths keep the newest-first encounter order
        scan.blocks.sort_by(|a, b| b.strength.cmp(&a.strength));
        scan
    }

    fn evaluate(&self, candles: &[Candle], i: usize) -> Result<Option<OrderBlock>, SkipReason> {
        let origin = &candles[i];
        let impulse = &candles[i + 1];
        StrictRowValidator::validate_candle(origin)?;
        StrictRowValidator::validate_candle(impulse)?;

        let avg_body = Self::average_body(&candles[i.saturating_sub(BODY_AVERAGE_WINDOW)..i])?;
        if avg_body.is_zero() {
            return Err(SkipReason::DegenerateWindow);
        }

        let impulse_body = impulse.body();
        let threshold = avg_body
            .checked_mul(self.body_multiplier)
            .ok_or(SkipReason::ArithmeticOverflow)?;
        if impulse_body <= threshold {
            return Ok(None);
        }

        let kind = if origin.is_bearish() && impulse.is_bullish() && impulse.close > origin.high {
            OrderBlockKind::Bullish
        } else if origin.is_bullish() && impulse.is_bearish() && impulse.close < origin.low {
            OrderBlockKind::Bearish
        } else {
            return Ok(None);
        };

        let strength = impulse_body
            .checked_div(avg_body)
            .ok_or(SkipReason::ArithmeticOverflow)?;

        Ok(Some(OrderBlock {
            kind,
            origin_date: origin.date,
            top: origin.high,
            bottom: origin.low,
            strength,
        }))
    }

    fn average_body(window: &[Candle]) -> Result<Decimal, SkipReason> {
        if window.is_empty() {
            return Err(SkipReason::DegenerateWindow);
        }

        // Window bars only contribute their body; a malformed neighbour must not
        // knock out every origin within reach of it.
        let mut total = Decimal::ZERO;
        for candle in window {
            total = total
                .checked_add(candle.body())
                .ok_or(SkipReason::ArithmeticOverflow)?;
        }

        total
            .checked_div(Decimal::from(window.len()))
            .ok_or(SkipReason::ArithmeticOverflow)
    }
}
