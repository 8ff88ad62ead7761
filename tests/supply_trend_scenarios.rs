use chrono::{Duration, NaiveDate};
use smartmoney::application::analysis::{classify, classify_broad};
use smartmoney::domain::market::flow::{FlowRow, Stance, TrendLabel};

/// One row per sign; foreign carries most of the flow, institution follows.
fn window(signs: &[i64]) -> Vec<FlowRow> {
    let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    signs
        .iter()
        .enumerate()
        .map(|(i, &s)| FlowRow::new(start + Duration::days(i as i64), s * 1_200_000, s * 300_000))
        .collect()
}

#[test]
fn test_turning_sell_beats_frequency_rule() {
    let trend = classify(&window(&[1, 1, 1, 1, 1, -1, -1]));

    assert_eq!(trend.buy_days, 5);
    assert_eq!(trend.consecutive_buy, 0);
    assert_eq!(trend.consecutive_sell, 2);
    assert!(trend.total_foreign_net + trend.total_institution_net > 0);
    assert_eq!(trend.label, TrendLabel::TurningSell);
    assert_eq!(trend.label.stance(), Stance::Avoid);
}

#[test]
fn test_all_sell_week_is_distributing() {
    let trend = classify(&window(&[-1; 7]));

    assert_eq!(trend.consecutive_sell, 7);
    assert_eq!(trend.sell_days, 7);
    assert_eq!(trend.label, TrendLabel::Distributing);
    assert_eq!(trend.narrative, "7 consecutive selling days");
}

#[test]
fn test_long_streak_after_selling_is_accumulating() {
    // Rule 1 is checked before rule 3, so a five-day streak out of a sell day
    // is reported as accumulation rather than a turn.
    let trend = classify(&window(&[-1, -1, 1, 1, 1, 1, 1]));

    assert_eq!(trend.consecutive_buy, 5);
    assert_eq!(trend.label, TrendLabel::Accumulating);
    assert_eq!(trend.narrative, "5 consecutive buying days");
}

#[test]
fn test_two_day_turn_is_turning_buy() {
    let trend = classify(&window(&[-1, -1, -1, -1, -1, 1, 1]));

    assert_eq!(trend.consecutive_buy, 2);
    assert_eq!(trend.label, TrendLabel::TurningBuy);
    assert_eq!(trend.label.stance(), Stance::ConsiderBuying);
}

#[test]
fn test_sell_streak_with_mixed_totals_falls_through() {
    // Three sell days to close, but the foreign total stays positive, so
    // rule 2 fails and nothing later matches.
    let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let rows: Vec<FlowRow> = [(9_000, -100), (-100, -200), (-100, -200), (-100, -200)]
        .iter()
        .enumerate()
        .map(|(i, &(f, inst))| FlowRow::new(start + Duration::days(i as i64), f, inst))
        .collect();

    let trend = classify(&rows);
    assert_eq!(trend.consecutive_sell, 3);
    assert_eq!(trend.label, TrendLabel::Neutral);
}

#[test]
fn test_trailing_sell_after_buying_is_a_turn() {
    let trend = classify(&window(&[1, 1, -1, 1, 1, 1, -1]));
    assert_eq!(trend.buy_days, 5);
    assert_eq!(trend.consecutive_sell, 1);
    assert_eq!(trend.label, TrendLabel::TurningSell);
    assert_eq!(trend.narrative, "Turned to selling (5 buy days, then 1 selling)");
}

#[test]
fn test_frequency_rules() {
    let trend = classify(&window(&[1, -1, 1, 1, 1, -1, 1]));
    assert_eq!(trend.consecutive_buy, 1);
    assert_eq!(trend.label, TrendLabel::Accumulating);
    assert_eq!(trend.narrative, "Bought on 5/7 days");

    let trend = classify(&window(&[-1, -1, -1, -1, -1, 1]));
    assert_eq!(trend.consecutive_buy, 1);
    assert_eq!(trend.label, TrendLabel::Distributing);
    assert_eq!(trend.narrative, "Sold on 5/6 days");
}

#[test]
fn test_short_window_is_unknown() {
    let trend = classify(&window(&[1, 1]));
    assert_eq!(trend.label, TrendLabel::Unknown);
    assert_eq!(trend.label.stance(), Stance::Wait);

    let broad = classify_broad(&window(&[1, 1]));
    assert_eq!(broad.label, TrendLabel::Unknown);
}

#[test]
fn test_broad_agreement_escalates() {
    let mut rows = window(&[1, -1, 1, -1, 1, -1, 1]);
    for row in &mut rows {
        row.pension = Some(500);
        row.invest_trust = Some(200);
    }

    let broad = classify_broad(&rows);
    assert_eq!(broad.base.label, TrendLabel::Neutral);
    assert_eq!(broad.agreement.positive, 4);
    assert_eq!(broad.label, TrendLabel::BroadAccumulation);
}
