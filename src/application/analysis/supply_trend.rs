use crate::domain::market::flow::{
    BroadSupplyTrend, DailyFlow, FlowAgreement, FlowRow, InvestorClass, SupplyTrend, TrendLabel,
};

/// Fewer rows than this cannot support a streak-based label.
pub const MIN_FLOW_ROWS: usize = 3;

/// Streak length for the strong accumulation/distribution rules.
const STRONG_STREAK: usize = 3;
/// Shortest buy streak that counts as a turn.
const TURN_STREAK: usize = 2;
/// Buy days that make a single sell day a "turn" to selling.
const TURN_SELL_BUY_DAYS: usize = 3;
/// Day count for the frequency-based variants (out of a nominal 7-day week).
const FREQUENCY_DAYS: usize = 5;
/// Classes that must agree before the broad tier escalates.
const BROAD_AGREEMENT: usize = 4;

/// Classify foreign + institutional ("smart money") flow over a window.
///
/// Rules are checked top-down and the first match wins:
/// 1. buy streak >= 3 with either total positive      -> ACCUMULATING
/// 2. sell streak >= 3 with both totals negative      -> DISTRIBUTING
/// 3. buy streak >= 2 after a sell day, a total > 0   -> TURNING_BUY
/// 4. latest day sells after >= 3 buy days            -> TURNING_SELL
/// 5. >= 5 buy days                                   -> ACCUMULATING
/// 6. >= 5 sell days                                  -> DISTRIBUTING
/// 7. otherwise                                       -> NEUTRAL
///
/// Rule 1 shadows rule 3 whenever the streak is three or longer, so
/// TURNING_BUY is only reported for a fresh two-day streak.
pub fn classify(rows: &[FlowRow]) -> SupplyTrend {
    if rows.len() < MIN_FLOW_ROWS {
        return SupplyTrend::unknown();
    }

    let daily: Vec<DailyFlow> = rows.iter().map(DailyFlow::from).collect();
    let window = daily.len();

    let buy_days = daily.iter().filter(|d| d.is_buy).count();
    let sell_days = window - buy_days;

    let consecutive_buy = daily.iter().rev().take_while(|d| d.is_buy).count();
    let consecutive_sell = daily.iter().rev().take_while(|d| !d.is_buy).count();

    let total_foreign_net: i128 = rows.iter().map(|r| i128::from(r.foreign_net)).sum();
    let total_institution_net: i128 = rows.iter().map(|r| i128::from(r.institution_net)).sum();

    let any_total_positive = total_foreign_net > 0 || total_institution_net > 0;
    let both_totals_negative = total_foreign_net < 0 && total_institution_net < 0;

    let turned_from_sell = consecutive_buy >= TURN_STREAK
        && consecutive_buy < window
        && !daily[window - consecutive_buy - 1].is_buy;

    let (label, narrative) = if consecutive_buy >= STRONG_STREAK && any_total_positive {
        (
            TrendLabel::Accumulating,
            format!("{} consecutive buying days", consecutive_buy),
        )
    } else if consecutive_sell >= STRONG_STREAK && both_totals_negative {
        (
            TrendLabel::Distributing,
            format!("{} consecutive selling days", consecutive_sell),
        )
    } else if turned_from_sell && any_total_positive {
        (
            TrendLabel::TurningBuy,
            format!("Turned to buying ({} days in a row)", consecutive_buy),
        )
    } else if consecutive_sell >= 1 && buy_days >= TURN_SELL_BUY_DAYS {
        (
            TrendLabel::TurningSell,
            format!(
                "Turned to selling ({} buy days, then {} selling)",
                buy_days, consecutive_sell
            ),
        )
    } else if buy_days >= FREQUENCY_DAYS {
        (
            TrendLabel::Accumulating,
            format!("Bought on {}/{} days", buy_days, window),
        )
    } else if sell_days >= FREQUENCY_DAYS {
        (
            TrendLabel::Distributing,
            format!("Sold on {}/{} days", sell_days, window),
        )
    } else {
        (
            TrendLabel::Neutral,
            format!("{} buy days / {} sell days", buy_days, sell_days),
        )
    };

    SupplyTrend {
        label,
        narrative,
        buy_days,
        sell_days,
        consecutive_buy,
        consecutive_sell,
        total_foreign_net,
        total_institution_net,
        daily,
    }
}

/// Count the broad investor classes that ended the window net long / short.
pub fn flow_agreement(rows: &[FlowRow]) -> FlowAgreement {
    let mut agreement = FlowAgreement::default();
    for class in InvestorClass::BROAD {
        let total: i128 = rows.iter().map(|r| i128::from(r.net_for(class))).sum();
        if total > 0 {
            agreement.positive += 1;
        } else if total < 0 {
            agreement.negative += 1;
        }
    }
    agreement
}

/// Extended tier: escalates the base label when at least 4 of the 5 broad
/// classes (foreign, institution, pension, private fund, investment trust)
/// agree on direction. Positive agreement outranks every base rule.
pub fn classify_broad(rows: &[FlowRow]) -> BroadSupplyTrend {
    let base = classify(rows);
    if base.label == TrendLabel::Unknown {
        return BroadSupplyTrend {
            label: TrendLabel::Unknown,
            agreement: FlowAgreement::default(),
            base,
        };
    }

    let agreement = flow_agreement(rows);
    let label = if agreement.positive >= BROAD_AGREEMENT {
        TrendLabel::BroadAccumulation
    } else if agreement.negative >= BROAD_AGREEMENT {
        TrendLabel::BroadDistribution
    } else {
        base.label
    };

    BroadSupplyTrend {
        label,
        agreement,
        base,
    }
}
