use crate::domain::errors::RowRejection;
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::FlowRow;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

/// Centralized validator for input row integrity.
///
/// Rejects rows that are physically impossible so callers can skip them
/// individually instead of aborting a whole series.
pub struct StrictRowValidator;

impl StrictRowValidator {
    /// Validates a Candle's price invariants.
    pub fn validate_candle(candle: &Candle) -> Result<(), RowRejection> {
        if candle.open <= Decimal::ZERO
            || candle.high <= Decimal::ZERO
            || candle.low <= Decimal::ZERO
            || candle.close <= Decimal::ZERO
        {
            return Err(RowRejection::NonPositivePrice { date: candle.date });
        }

        if candle.low > candle.high {
            return Err(RowRejection::InvertedRange {
                date: candle.date,
                low: candle.low,
                high: candle.high,
            });
        }

        let in_range = |p: Decimal| candle.low <= p && p <= candle.high;
        if !in_range(candle.open) || !in_range(candle.close) {
            return Err(RowRejection::BodyOutsideRange {
                date: candle.date,
                low: candle.low,
                high: candle.high,
            });
        }

        Ok(())
    }

    /// Keeps candles that pass validation and continue a strictly ascending
    /// date sequence; everything else lands in the report.
    pub fn filter_candles(candles: Vec<Candle>) -> (Vec<Candle>, Vec<RowRejection>) {
        let mut kept: Vec<Candle> = Vec::with_capacity(candles.len());
        let mut rejected = Vec::new();

        for candle in candles {
            let verdict = Self::validate_candle(&candle)
                .and_then(|_| Self::check_sequence(kept.last().map(|c| c.date), candle.date));
            match verdict {
                Ok(()) => kept.push(candle),
                Err(rejection) => {
                    warn!("Validation FAILED: dropping candle: {}", rejection);
                    rejected.push(rejection);
                }
            }
        }

        (kept, rejected)
    }

    /// Same ordering policy for investor-flow rows.
    pub fn filter_flows(rows: Vec<FlowRow>) -> (Vec<FlowRow>, Vec<RowRejection>) {
        let mut kept: Vec<FlowRow> = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for row in rows {
            match Self::check_sequence(kept.last().map(|r| r.date), row.date) {
                Ok(()) => kept.push(row),
                Err(rejection) => {
                    warn!("Validation FAILED: dropping flow row: {}", rejection);
                    rejected.push(rejection);
                }
            }
        }

        (kept, rejected)
    }

    fn check_sequence(
        previous: Option<chrono::NaiveDate>,
        date: chrono::NaiveDate,
    ) -> Result<(), RowRejection> {
        match previous {
            Some(prev) if prev == date => Err(RowRejection::DuplicateDate { date }),
            Some(prev) if prev > date => Err(RowRejection::OutOfOrder {
                date,
                previous: prev,
            }),
            _ => Ok(()),
        }
    }
}

/// Rows accepted and rejected while loading one series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub accepted: usize,
    #[serde(serialize_with = "serialize_rejections")]
    pub rejected: Vec<RowRejection>,
}

impl LoadReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

fn serialize_rejections<S>(rejected: &[RowRejection], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(rejected.iter().map(|r| r.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn candle(d: u32, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(day(d), open, high, low, close, 100)
    }

    #[test]
    fn test_validate_candle_ok() {
        let c = candle(2, dec!(100), dec!(105), dec!(98), dec!(104));
        assert!(StrictRowValidator::validate_candle(&c).is_ok());
    }

    #[test]
    fn test_validate_candle_non_positive() {
        let c = candle(2, dec!(0), dec!(105), dec!(98), dec!(104));
        assert_eq!(
            StrictRowValidator::validate_candle(&c),
            Err(RowRejection::NonPositivePrice { date: day(2) })
        );
    }

    #[test]
    fn test_validate_candle_invalid_low_high() {
        let c = candle(2, dec!(2000), dec!(2000), dec!(2001), dec!(2000));
        assert!(matches!(
            StrictRowValidator::validate_candle(&c),
            Err(RowRejection::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_validate_candle_close_above_high() {
        let c = candle(2, dec!(100), dec!(105), dec!(98), dec!(106));
        assert!(matches!(
            StrictRowValidator::validate_candle(&c),
            Err(RowRejection::BodyOutsideRange { .. })
        ));
    }

    #[test]
    fn test_filter_candles_drops_duplicates_and_disorder() {
        let good = |d| candle(d, dec!(100), dec!(101), dec!(99), dec!(100));
        let (kept, rejected) =
            StrictRowValidator::filter_candles(vec![good(2), good(3), good(3), good(1), good(4)]);

        assert_eq!(kept.len(), 3);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0], RowRejection::DuplicateDate { date: day(3) });
        assert_eq!(
            rejected[1],
            RowRejection::OutOfOrder {
                date: day(1),
                previous: day(3)
            }
        );
    }

    #[test]
    fn test_filter_flows_keeps_ascending() {
        let rows = vec![
            FlowRow::new(day(5), 1, 1),
            FlowRow::new(day(6), 1, 1),
            FlowRow::new(day(6), 2, 2),
        ];
        let (kept, rejected) = StrictRowValidator::filter_flows(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(rejected.len(), 1);
    }
}
