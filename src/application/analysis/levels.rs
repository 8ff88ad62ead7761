use crate::domain::errors::AnalysisError;
use crate::domain::market::order_block::{LevelSet, OrderBlock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bullish zones whose midpoint sits more than 5% above price are not entries.
const ENTRY_CEILING: Decimal = dec!(1.05);
/// Bearish zones whose midpoint sits more than 5% below price are not targets.
const TARGET_FLOOR: Decimal = dec!(0.95);
/// Stop sits 0.2% under the support zone's lower bound.
const STOP_BUFFER: Decimal = dec!(0.998);
/// Band used when deciding whether price is inside a zone.
const POSITION_BAND: Decimal = dec!(0.02);

/// Partition zones into actionable levels for `current_price`.
///
/// Fails fast on a non-positive price: every threshold here is a percentage
/// of it.
pub fn compute_levels(
    current_price: Decimal,
    zones: &[OrderBlock],
) -> Result<LevelSet, AnalysisError> {
    if current_price <= Decimal::ZERO {
        return Err(AnalysisError::InvalidPrice {
            price: current_price,
        });
    }

    let entry_ceiling = current_price * ENTRY_CEILING;
    let target_floor = current_price * TARGET_FLOOR;

    let entry_zones: Vec<OrderBlock> = zones
        .iter()
        .filter(|ob| ob.is_bullish() && ob.midpoint() <= entry_ceiling)
        .cloned()
        .collect();

    let take_profit_zones: Vec<OrderBlock> = zones
        .iter()
        .filter(|ob| ob.is_bearish() && ob.midpoint() >= target_floor)
        .cloned()
        .collect();

    // min_by_key keeps the first of several equal minima
    let nearest_support = zones
        .iter()
        .filter(|ob| ob.is_bullish() && ob.midpoint() < current_price)
        .min_by_key(|ob| current_price - ob.midpoint())
        .cloned();

    let nearest_resistance = zones
        .iter()
        .filter(|ob| ob.is_bearish() && ob.midpoint() > current_price)
        .min_by_key(|ob| ob.midpoint() - current_price)
        .cloned();

    let stop_loss = nearest_support.as_ref().map(|ob| ob.bottom * STOP_BUFFER);

    Ok(LevelSet {
        entry_zones,
        take_profit_zones,
        nearest_support,
        nearest_resistance,
        stop_loss,
    })
}

/// Signed distance from price to the zone midpoint, in percent.
pub fn distance_pct(zone: &OrderBlock, current_price: Decimal) -> Option<Decimal> {
    (zone.midpoint() - current_price)
        .checked_div(current_price)
        .map(|ratio| ratio * dec!(100))
}

/// Signed distance from price to the stop, in percent.
pub fn stop_loss_pct(levels: &LevelSet, current_price: Decimal) -> Option<Decimal> {
    let stop = levels.stop_loss?;
    (stop - current_price)
        .checked_div(current_price)
        .map(|ratio| ratio * dec!(100))
}

/// Where price sits relative to the nearest zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricePosition {
    InResistance,
    InSupport,
    Neutral,
}

impl PricePosition {
    /// Resistance is checked first; both tests widen the zone by 2%.
    pub fn locate(levels: &LevelSet, current_price: Decimal) -> Self {
        let inside = |zone: &Option<OrderBlock>| {
            zone.as_ref()
                .is_some_and(|ob| ob.contains_with_band(current_price, POSITION_BAND))
        };

        if inside(&levels.nearest_resistance) {
            PricePosition::InResistance
        } else if inside(&levels.nearest_support) {
            PricePosition::InSupport
        } else {
            PricePosition::Neutral
        }
    }
}

impl fmt::Display for PricePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePosition::InResistance => {
                write!(f, "In resistance: avoid new entries, consider taking profit")
            }
            PricePosition::InSupport => write!(f, "In support: entry area, set a stop"),
            PricePosition::Neutral => write!(f, "Between zones: plan around the levels below"),
        }
    }
}

/// Entry, stop and first target drawn from a LevelSet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: Option<OrderBlock>,
    pub stop_loss: Option<Decimal>,
    pub target: Option<OrderBlock>,
}

impl TradePlan {
    pub fn from_levels(levels: &LevelSet) -> Self {
        Self {
            entry: levels.entry_zones.first().cloned(),
            stop_loss: levels.stop_loss,
            target: levels.take_profit_zones.first().cloned(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.entry.is_some() || self.stop_loss.is_some() || self.target.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::order_block::OrderBlockKind;
    use chrono::NaiveDate;

    fn zone(kind: OrderBlockKind, bottom: Decimal, top: Decimal, strength: Decimal) -> OrderBlock {
        OrderBlock {
            kind,
            origin_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            top,
            bottom,
            strength,
        }
    }

    fn bull(bottom: Decimal, top: Decimal) -> OrderBlock {
        zone(OrderBlockKind::Bullish, bottom, top, dec!(2))
    }

    fn bear(bottom: Decimal, top: Decimal) -> OrderBlock {
        zone(OrderBlockKind::Bearish, bottom, top, dec!(2))
    }

    #[test]
    fn test_rejects_non_positive_price() {
        assert_eq!(
            compute_levels(Decimal::ZERO, &[]),
            Err(AnalysisError::InvalidPrice {
                price: Decimal::ZERO
            })
        );
        assert!(compute_levels(dec!(-1), &[bull(dec!(1), dec!(2))]).is_err());
    }

    #[test]
    fn test_empty_zones() {
        let levels = compute_levels(dec!(100), &[]).unwrap();
        assert_eq!(levels, LevelSet::default());
    }

    #[test]
    fn test_entry_ceiling_boundary() {
        // Midpoints 105 (kept, equal to ceiling) and 105.5 (dropped)
        let zones = vec![bull(dec!(104), dec!(106)), bull(dec!(105), dec!(106))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert_eq!(levels.entry_zones, vec![zones[0].clone()]);
    }

    #[test]
    fn test_target_floor_boundary() {
        // Midpoints 95 (kept) and 94.5 (dropped)
        let zones = vec![bear(dec!(94), dec!(96)), bear(dec!(94), dec!(95))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert_eq!(levels.take_profit_zones, vec![zones[0].clone()]);
    }

    #[test]
    fn test_nearest_support_and_stop() {
        let zones = vec![
            bull(dec!(80), dec!(90)),  // mid 85
            bull(dec!(94), dec!(96)),  // mid 95, nearest below
            bull(dec!(99), dec!(103)), // mid 101, above price
        ];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert_eq!(levels.nearest_support, Some(zones[1].clone()));
        assert_eq!(levels.stop_loss, Some(dec!(94) * dec!(0.998)));
        assert_eq!(levels.stop_loss, Some(dec!(93.812)));
        assert_eq!(levels.entry_zones.len(), 3);
    }

    #[test]
    fn test_nearest_resistance() {
        let zones = vec![
            bear(dec!(120), dec!(130)),
            bear(dec!(104), dec!(106)),
            bear(dec!(96), dec!(98)),
        ];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert_eq!(levels.nearest_resistance, Some(zones[1].clone()));
        assert!(levels.nearest_support.is_none());
        assert!(levels.stop_loss.is_none());
    }

    #[test]
    fn test_midpoint_equal_to_price_is_neither_support_nor_resistance() {
        let zones = vec![bull(dec!(98), dec!(102)), bear(dec!(99), dec!(101))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert!(levels.nearest_support.is_none());
        assert!(levels.nearest_resistance.is_none());
    }

    #[test]
    fn test_equidistant_support_takes_first() {
        let first = zone(OrderBlockKind::Bullish, dec!(94), dec!(96), dec!(5));
        let second = zone(OrderBlockKind::Bullish, dec!(93), dec!(97), dec!(3));
        let levels = compute_levels(dec!(100), &[first.clone(), second]).unwrap();
        assert_eq!(levels.nearest_support, Some(first));
    }

    #[test]
    fn test_position_resistance_checked_first() {
        let zones = vec![bull(dec!(97), dec!(99)), bear(dec!(101), dec!(103))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        // 100 lies inside both banded zones
        assert_eq!(
            PricePosition::locate(&levels, dec!(100)),
            PricePosition::InResistance
        );
    }

    #[test]
    fn test_position_support_and_neutral() {
        let zones = vec![bull(dec!(97), dec!(99))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        assert_eq!(
            PricePosition::locate(&levels, dec!(100)),
            PricePosition::InSupport
        );

        let far = vec![bull(dec!(80), dec!(85))];
        let levels = compute_levels(dec!(100), &far).unwrap();
        assert_eq!(
            PricePosition::locate(&levels, dec!(100)),
            PricePosition::Neutral
        );
    }

    #[test]
    fn test_distance_and_stop_pct() {
        let ob = bull(dec!(90), dec!(100));
        assert_eq!(distance_pct(&ob, dec!(100)), Some(dec!(-5)));

        let levels = compute_levels(dec!(100), &[ob]).unwrap();
        // stop = 90 * 0.998 = 89.82
        assert_eq!(stop_loss_pct(&levels, dec!(100)), Some(dec!(-10.18)));
    }

    #[test]
    fn test_trade_plan() {
        let zones = vec![bull(dec!(94), dec!(96)), bear(dec!(104), dec!(106))];
        let levels = compute_levels(dec!(100), &zones).unwrap();
        let plan = TradePlan::from_levels(&levels);
        assert_eq!(plan.entry, Some(zones[0].clone()));
        assert_eq!(plan.target, Some(zones[1].clone()));
        assert!(plan.is_actionable());

        let empty = TradePlan::from_levels(&LevelSet::default());
        assert!(!empty.is_actionable());
    }
}
