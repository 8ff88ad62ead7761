use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

/// Contract violations raised by the analysis core
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid current price: {price} (must be positive)")]
    InvalidPrice { price: Decimal },
}

/// Why a single input row was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowRejection {
    #[error("non-positive price component on {date}")]
    NonPositivePrice { date: NaiveDate },

    #[error("low {low} > high {high} on {date}")]
    InvertedRange {
        date: NaiveDate,
        low: Decimal,
        high: Decimal,
    },

    #[error("open/close outside [{low}, {high}] on {date}")]
    BodyOutsideRange {
        date: NaiveDate,
        low: Decimal,
        high: Decimal,
    },

    #[error("duplicate date {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("{date} is out of order (previous row {previous})")]
    OutOfOrder {
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("unparseable row at line {line}: {reason}")]
    Unparseable { line: u64, reason: String },
}

/// Errors related to market data collaborators
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("No data for {symbol} under {path}")]
    NotFound { symbol: String, path: PathBuf },

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("No usable quote for {symbol}")]
    NoQuote { symbol: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
