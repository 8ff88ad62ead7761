use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an order block zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBlockKind {
    /// Demand zone: a down candle followed by an up impulse
    Bullish,
    /// Supply zone: an up candle followed by a down impulse
    Bearish,
}

impl fmt::Display for OrderBlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBlockKind::Bullish => write!(f, "BULLISH"),
            OrderBlockKind::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Price range bounded by the origin candle's high/low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub kind: OrderBlockKind,
    pub origin_date: NaiveDate,
    pub top: Decimal,
    pub bottom: Decimal,
    /// Impulse body divided by the trailing average body
    pub strength: Decimal,
}

impl OrderBlock {
    pub fn midpoint(&self) -> Decimal {
        (self.top + self.bottom) / dec!(2)
    }

    pub fn is_bullish(&self) -> bool {
        self.kind == OrderBlockKind::Bullish
    }

    pub fn is_bearish(&self) -> bool {
        self.kind == OrderBlockKind::Bearish
    }

    /// Inclusive containment test with a fractional band on both sides.
    ///
    /// `band = 0.02` widens the zone to `[bottom * 0.98, top * 1.02]`.
    pub fn contains_with_band(&self, price: Decimal, band: Decimal) -> bool {
        self.bottom * (Decimal::ONE - band) <= price && price <= self.top * (Decimal::ONE + band)
    }
}

/// Derived trade levels for one current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LevelSet {
    /// Bullish zones still approachable as support, strongest first
    pub entry_zones: Vec<OrderBlock>,
    /// Bearish zones still reachable as targets, strongest first
    pub take_profit_zones: Vec<OrderBlock>,
    pub nearest_support: Option<OrderBlock>,
    pub nearest_resistance: Option<OrderBlock>,
    pub stop_loss: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(top: Decimal, bottom: Decimal) -> OrderBlock {
        OrderBlock {
            kind: OrderBlockKind::Bullish,
            origin_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            top,
            bottom,
            strength: dec!(2),
        }
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(block(dec!(110), dec!(100)).midpoint(), dec!(105));
    }

    #[test]
    fn test_band_containment() {
        let ob = block(dec!(100), dec!(90));
        assert!(ob.contains_with_band(dec!(88.2), dec!(0.02)));
        assert!(ob.contains_with_band(dec!(102), dec!(0.02)));
        assert!(!ob.contains_with_band(dec!(88.1), dec!(0.02)));
        assert!(!ob.contains_with_band(dec!(102.01), dec!(0.02)));
    }
}
