use super::levels::{PricePosition, TradePlan};
use crate::domain::market::flow::{Stance, SupplyTrend, TrendLabel};
use crate::domain::market::order_block::{LevelSet, OrderBlock};
use rust_decimal::Decimal;
use serde::Serialize;

/// Both pipelines side by side for one security.
///
/// Pure output shaping: nothing here adds a threshold of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlook {
    pub symbol: String,
    pub current_price: Decimal,
    pub order_blocks: Vec<OrderBlock>,
    pub levels: LevelSet,
    pub position: PricePosition,
    pub plan: TradePlan,
    pub trend: Option<SupplyTrend>,
    /// Label used for the stance; the broad label when that tier ran
    pub effective_label: Option<TrendLabel>,
    pub stance: Stance,
}

impl Outlook {
    pub fn build(
        symbol: &str,
        current_price: Decimal,
        order_blocks: Vec<OrderBlock>,
        levels: LevelSet,
        trend: Option<SupplyTrend>,
        effective_label: Option<TrendLabel>,
    ) -> Self {
        let position = PricePosition::locate(&levels, current_price);
        let plan = TradePlan::from_levels(&levels);
        let effective_label = effective_label.or_else(|| trend.as_ref().map(|t| t.label));
        let stance = effective_label
            .map(|label| label.stance())
            .unwrap_or(Stance::Wait);

        Self {
            symbol: symbol.to_string(),
            current_price,
            order_blocks,
            levels,
            position,
            plan,
            trend,
            effective_label,
            stance,
        }
    }

    /// Flow says buy while price is not pressing into resistance.
    pub fn is_aligned_long(&self) -> bool {
        self.stance == Stance::ConsiderBuying && self.position != PricePosition::InResistance
    }
}
