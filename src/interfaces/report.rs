//! Console rendering for analysis results.
//!
//! Every renderer returns a `String` so the CLI decides where it goes.

use crate::application::analysis::{PricePosition, distance_pct, stop_loss_pct};
use crate::application::analyst::SecurityReport;
use crate::domain::market::flow::{BroadSupplyTrend, SupplyTrend};
use crate::domain::market::order_block::{LevelSet, OrderBlock};
use crate::domain::validation::data_quality::LoadReport;
use rust_decimal::Decimal;

const RULE_WIDTH: usize = 72;

/// Text tables show the strongest zones only; JSON output carries all of them.
pub const MAX_LISTED_ZONES: usize = 5;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// `1234567` -> `+1,234,567`
pub fn format_net(value: i128) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = match value.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    };
    format!("{}{}", sign, grouped)
}

fn format_pct(pct: Option<Decimal>) -> String {
    pct.map(|p| format!("{:+.2}%", p.round_dp(2)))
        .unwrap_or_else(|| "-".to_string())
}

fn zone_line(zone: &OrderBlock, current_price: Decimal) -> String {
    format!(
        "{:<8} | {:>10} | {:>12} | {:>12} | {:>7} | {:>9}",
        zone.kind,
        zone.origin_date,
        zone.bottom.round_dp(2),
        zone.top.round_dp(2),
        zone.strength.round_dp(2),
        format_pct(distance_pct(zone, current_price))
    )
}

pub fn render_blocks(symbol: &str, blocks: &[OrderBlock], current_price: Decimal) -> String {
    let mut lines = vec![
        rule('='),
        format!("ORDER BLOCKS - {} @ {}", symbol, current_price),
        rule('='),
    ];

    if blocks.is_empty() {
        lines.push("No order blocks in the lookback window.".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "{:<8} | {:>10} | {:>12} | {:>12} | {:>7} | {:>9}",
        "Kind", "Origin", "Bottom", "Top", "Str", "Dist"
    ));
    lines.push(rule('-'));
    lines.extend(
        blocks
            .iter()
            .take(MAX_LISTED_ZONES)
            .map(|zone| zone_line(zone, current_price)),
    );
    if blocks.len() > MAX_LISTED_ZONES {
        lines.push(format!("... {} more", blocks.len() - MAX_LISTED_ZONES));
    }
    lines.join("\n")
}

pub fn render_levels(levels: &LevelSet, current_price: Decimal) -> String {
    let describe = |zone: &Option<OrderBlock>| match zone {
        Some(ob) => format!(
            "{} - {} (mid {}, {})",
            ob.bottom.round_dp(2),
            ob.top.round_dp(2),
            ob.midpoint().round_dp(2),
            format_pct(distance_pct(ob, current_price))
        ),
        None => "none".to_string(),
    };

    let stop = match levels.stop_loss {
        Some(stop) => format!(
            "{} ({})",
            stop.round_dp(2),
            format_pct(stop_loss_pct(levels, current_price))
        ),
        None => "none".to_string(),
    };

    let position = PricePosition::locate(levels, current_price);

    [
        format!("Current price:      {}", current_price),
        format!("Nearest support:    {}", describe(&levels.nearest_support)),
        format!("Nearest resistance: {}", describe(&levels.nearest_resistance)),
        format!("Stop loss:          {}", stop),
        format!(
            "Entry zones:        {}   Take-profit zones: {}",
            levels.entry_zones.len(),
            levels.take_profit_zones.len()
        ),
        format!("Position:           {}", position),
    ]
    .join("\n")
}

pub fn render_trend(trend: &SupplyTrend, broad: Option<&BroadSupplyTrend>) -> String {
    let mut lines = vec![
        format!("Supply trend:  {} ({})", trend.label, trend.narrative),
        format!(
            "Window:        {} days, {} buy / {} sell, streak +{} / -{}",
            trend.window_len(),
            trend.buy_days,
            trend.sell_days,
            trend.consecutive_buy,
            trend.consecutive_sell
        ),
        format!(
            "Totals:        foreign {}  institution {}",
            format_net(trend.total_foreign_net),
            format_net(trend.total_institution_net)
        ),
    ];

    if let Some(broad) = broad {
        lines.push(format!(
            "Broad tier:    {} ({} classes net long, {} net short)",
            broad.label, broad.agreement.positive, broad.agreement.negative
        ));
    }

    if !trend.daily.is_empty() {
        lines.push(rule('-'));
        lines.push(format!(
            "{:<10} | {:>16} | {:>16} | {:>4}",
            "Date", "Foreign", "Institution", "Side"
        ));
        for day in &trend.daily {
            lines.push(format!(
                "{:<10} | {:>16} | {:>16} | {:>4}",
                day.date,
                format_net(i128::from(day.foreign_net)),
                format_net(i128::from(day.institution_net)),
                if day.is_buy { "BUY" } else { "SELL" }
            ));
        }
    }

    lines.join("\n")
}

pub fn render_report(report: &SecurityReport) -> String {
    let outlook = &report.outlook;
    let mut sections = vec![
        render_blocks(&outlook.symbol, &outlook.order_blocks, outlook.current_price),
        rule('-'),
        render_levels(&outlook.levels, outlook.current_price),
        rule('-'),
    ];

    match &outlook.trend {
        Some(trend) => sections.push(render_trend(trend, report.broad.as_ref())),
        None => sections.push("Supply trend:  unavailable".to_string()),
    }

    sections.push(rule('-'));
    sections.push(format!("Stance:        {}", outlook.stance));
    if outlook.is_aligned_long() {
        sections.push("Flow and price structure agree on the long side.".to_string());
    }
    if !report.skipped.is_empty() {
        sections.push(format!(
            "Skipped {} candidate bar(s) with unusable data.",
            report.skipped.len()
        ));
    }
    for note in &report.data_notes {
        sections.push(format!("Note: {}", note));
    }

    sections.join("\n")
}

/// One line per security, sorted the way the caller passes them.
pub fn render_batch_table(reports: &[SecurityReport]) -> String {
    let mut lines = vec![
        rule('='),
        format!(
            "{:<10} | {:>12} | {:<20} | {:<14} | {:>5}",
            "Symbol", "Price", "Trend", "Position", "Zones"
        ),
        rule('-'),
    ];

    for report in reports {
        let outlook = &report.outlook;
        let label = outlook
            .effective_label
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        let position = match outlook.position {
            PricePosition::InResistance => "resistance",
            PricePosition::InSupport => "support",
            PricePosition::Neutral => "between",
        };
        lines.push(format!(
            "{:<10} | {:>12} | {:<20} | {:<14} | {:>5}",
            outlook.symbol,
            outlook.current_price,
            label,
            position,
            outlook.order_blocks.len()
        ));
    }

    lines.push(rule('='));
    lines.join("\n")
}

pub fn render_load_report(what: &str, report: &LoadReport) -> String {
    let mut lines = vec![format!(
        "{}: {} rows accepted, {} rejected",
        what,
        report.accepted,
        report.rejected_count()
    )];
    lines.extend(report.rejected.iter().map(|r| format!("  - {}", r)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::order_block::OrderBlockKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_net_groups_thousands() {
        assert_eq!(format_net(0), "0");
        assert_eq!(format_net(999), "+999");
        assert_eq!(format_net(1_000), "+1,000");
        assert_eq!(format_net(-1_234_567), "-1,234,567");
    }

    #[test]
    fn test_render_blocks_lists_each_zone() {
        let zone = OrderBlock {
            kind: OrderBlockKind::Bearish,
            origin_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            top: dec!(110),
            bottom: dec!(106),
            strength: dec!(2.5),
        };
        let text = render_blocks("005930", &[zone], dec!(100));
        assert!(text.contains("BEARISH"));
        assert!(text.contains("2024-03-04"));
        assert!(text.contains("+8.00%"));
    }

    #[test]
    fn test_render_blocks_keeps_strongest_five() {
        // Already sorted strongest first, as the detector returns them
        let blocks: Vec<OrderBlock> = (0..7u32)
            .map(|i| OrderBlock {
                kind: OrderBlockKind::Bullish,
                origin_date: NaiveDate::from_ymd_opt(2024, 3, 1 + i).unwrap(),
                top: dec!(95),
                bottom: dec!(90),
                strength: Decimal::from(9 - i),
            })
            .collect();

        let text = render_blocks("005930", &blocks, dec!(100));
        assert_eq!(text.matches("BULLISH").count(), MAX_LISTED_ZONES);
        assert!(text.contains("2024-03-05"));
        assert!(!text.contains("2024-03-06"));
        assert!(text.ends_with("... 2 more"));
    }

    #[test]
    fn test_render_blocks_empty() {
        let text = render_blocks("005930", &[], dec!(100));
        assert!(text.contains("No order blocks"));
    }

    #[test]
    fn test_render_levels_without_zones() {
        let text = render_levels(&LevelSet::default(), dec!(100));
        assert!(text.contains("Nearest support:    none"));
        assert!(text.contains("Between zones"));
    }
}
