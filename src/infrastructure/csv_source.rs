use crate::domain::errors::{DataSourceError, RowRejection};
use crate::domain::market::candle::Candle;
use crate::domain::market::flow::FlowRow;
use crate::domain::ports::{CandleSource, FlowSource};
use crate::domain::validation::data_quality::{LoadReport, StrictRowValidator};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

const CANDLE_FILE: &str = "candles.csv";
const FLOW_FILE: &str = "flows.csv";
const QUOTE_FILE: &str = "quote.txt";

const FOREIGN_ALIASES: [&str; 3] = ["foreign_net", "foreign_total", "foreign"];
const INSTITUTION_ALIASES: [&str; 3] = ["institution_net", "institution_total", "institution"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y%m%d"];

/// Reads exported daily series from `<root>/<SYMBOL>/`.
///
/// Layout:
/// - `candles.csv`: `date,open,high,low,close[,volume]`
/// - `flows.csv`: `date`, a foreign column, an institution column and any
///   subclass columns (`pension`, `private_fund`, `invest_trust`, ...)
/// - `quote.txt` (optional): a single price; otherwise the last close is used
#[derive(Debug, Clone)]
pub struct CsvMarketData {
    root: PathBuf,
}

/// Header name -> column index, after normalization.
struct Columns {
    index: HashMap<String, usize>,
    path: PathBuf,
}

impl Columns {
    fn from_headers(headers: &StringRecord, path: &Path) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (normalize_header(name), i))
            .collect();
        Self {
            index,
            path: path.to_path_buf(),
        }
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.index.get(*alias).copied())
    }

    fn require(&self, aliases: &[&str]) -> Result<usize, DataSourceError> {
        self.find(aliases).ok_or_else(|| DataSourceError::MissingColumn {
            column: aliases.join("|"),
            path: self.path.clone(),
        })
    }
}

struct FlowColumns {
    date: usize,
    foreign: usize,
    institution: usize,
    pension: Option<usize>,
    private_fund: Option<usize>,
    invest_trust: Option<usize>,
    financial: Option<usize>,
    insurance: Option<usize>,
    bank: Option<usize>,
    retail: Option<usize>,
    corporate: Option<usize>,
}

impl FlowColumns {
    fn resolve(columns: &Columns) -> Result<Self, DataSourceError> {
        let optional = |name: &str| {
            let net = format!("{}_net", name);
            columns.find(&[name, net.as_str()])
        };
        Ok(Self {
            date: columns.require(&["date"])?,
            foreign: columns.require(&FOREIGN_ALIASES)?,
            institution: columns.require(&INSTITUTION_ALIASES)?,
            pension: optional("pension"),
            private_fund: optional("private_fund"),
            invest_trust: optional("invest_trust"),
            financial: optional("financial"),
            insurance: optional("insurance"),
            bank: optional("bank"),
            retail: optional("retail"),
            corporate: optional("corporate"),
        })
    }
}

fn normalize_header(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace([' ', '-'], "_")
}

fn clean_number(raw: &str) -> String {
    raw.trim().replace(',', "")
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {}", name))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("bad date '{}'", raw))
}

fn parse_decimal(record: &StringRecord, idx: usize, name: &str) -> Result<Decimal, String> {
    let raw = field(record, idx, name)?;
    Decimal::from_str(&clean_number(raw)).map_err(|e| format!("bad {} '{}': {}", name, raw, e))
}

fn parse_i64(record: &StringRecord, idx: usize, name: &str) -> Result<i64, String> {
    let raw = field(record, idx, name)?;
    clean_number(raw)
        .parse::<i64>()
        .map_err(|e| format!("bad {} '{}': {}", name, raw, e))
}

fn parse_optional_i64(
    record: &StringRecord,
    idx: Option<usize>,
    name: &str,
) -> Result<Option<i64>, String> {
    match idx {
        Some(i) if record.get(i).is_some_and(|v| !v.trim().is_empty()) => {
            parse_i64(record, i, name).map(Some)
        }
        _ => Ok(None),
    }
}

/// Undecodable records become rejections; only I/O failures abort the load.
fn read_record(
    result: csv::Result<StringRecord>,
    path: &Path,
    rejected: &mut Vec<RowRejection>,
) -> Result<Option<StringRecord>, DataSourceError> {
    match result {
        Ok(record) => Ok(Some(record)),
        Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => Err(e.into()),
        Err(e) => {
            let line = e.position().map(|p| p.line()).unwrap_or_default();
            warn!("CsvMarketData: {} line {}: {}", path.display(), line, e);
            rejected.push(RowRejection::Unparseable {
                line,
                reason: e.to_string(),
            });
            Ok(None)
        }
    }
}

fn tail<T>(mut rows: Vec<T>, days: usize) -> Vec<T> {
    let skip = rows.len().saturating_sub(days);
    rows.drain(..skip);
    rows
}

impl CsvMarketData {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, symbol: &str, file: &str) -> PathBuf {
        self.root.join(symbol).join(file)
    }

    fn open(&self, symbol: &str, file: &str) -> Result<(csv::Reader<fs::File>, PathBuf), DataSourceError> {
        let path = self.file_for(symbol, file);
        if !path.exists() {
            return Err(DataSourceError::NotFound {
                symbol: symbol.to_string(),
                path,
            });
        }
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;
        Ok((reader, path))
    }

    /// Every valid candle on file, oldest first, with the rows that were dropped.
    pub fn load_candles(&self, symbol: &str) -> Result<(Vec<Candle>, LoadReport), DataSourceError> {
        let (mut reader, path) = self.open(symbol, CANDLE_FILE)?;
        let columns = Columns::from_headers(reader.headers()?, &path);
        let date = columns.require(&["date"])?;
        let open = columns.require(&["open"])?;
        let high = columns.require(&["high"])?;
        let low = columns.require(&["low"])?;
        let close = columns.require(&["close"])?;
        let volume = columns.find(&["volume"]);

        let mut parsed = Vec::new();
        let mut rejected = Vec::new();

        for result in reader.records() {
            let Some(record) = read_record(result, &path, &mut rejected)? else {
                continue;
            };
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row = (|| -> Result<Candle, String> {
                let volume = match volume {
                    Some(idx) => parse_optional_i64(&record, Some(idx), "volume")?
                        .map(|v| u64::try_from(v).map_err(|_| format!("negative volume {}", v)))
                        .transpose()?
                        .unwrap_or(0),
                    None => 0,
                };
                Ok(Candle::new(
                    parse_date(field(&record, date, "date")?)?,
                    parse_decimal(&record, open, "open")?,
                    parse_decimal(&record, high, "high")?,
                    parse_decimal(&record, low, "low")?,
                    parse_decimal(&record, close, "close")?,
                    volume,
                ))
            })();

            match row {
                Ok(candle) => parsed.push(candle),
                Err(reason) => {
                    warn!("CsvMarketData: {} line {}: {}", path.display(), line, reason);
                    rejected.push(RowRejection::Unparseable { line, reason });
                }
            }
        }

        parsed.sort_by_key(|c| c.date);
        let (candles, invalid) = StrictRowValidator::filter_candles(parsed);
        rejected.extend(invalid);

        let report = LoadReport {
            accepted: candles.len(),
            rejected,
        };
        Ok((candles, report))
    }

    /// Every flow row on file, oldest first, with the rows that were dropped.
    pub fn load_flows(&self, symbol: &str) -> Result<(Vec<FlowRow>, LoadReport), DataSourceError> {
        let (mut reader, path) = self.open(symbol, FLOW_FILE)?;
        let columns = Columns::from_headers(reader.headers()?, &path);
        let cols = FlowColumns::resolve(&columns)?;

        let mut parsed = Vec::new();
        let mut rejected = Vec::new();

        for result in reader.records() {
            let Some(record) = read_record(result, &path, &mut rejected)? else {
                continue;
            };
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row = (|| -> Result<FlowRow, String> {
                let mut row = FlowRow::new(
                    parse_date(field(&record, cols.date, "date")?)?,
                    parse_i64(&record, cols.foreign, "foreign")?,
                    parse_i64(&record, cols.institution, "institution")?,
                );
                row.pension = parse_optional_i64(&record, cols.pension, "pension")?;
                row.private_fund = parse_optional_i64(&record, cols.private_fund, "private_fund")?;
                row.invest_trust = parse_optional_i64(&record, cols.invest_trust, "invest_trust")?;
                row.financial = parse_optional_i64(&record, cols.financial, "financial")?;
                row.insurance = parse_optional_i64(&record, cols.insurance, "insurance")?;
                row.bank = parse_optional_i64(&record, cols.bank, "bank")?;
                row.retail = parse_optional_i64(&record, cols.retail, "retail")?;
                row.corporate = parse_optional_i64(&record, cols.corporate, "corporate")?;
                Ok(row)
            })();

            match row {
                Ok(row) => parsed.push(row),
                Err(reason) => {
                    warn!("CsvMarketData: {} line {}: {}", path.display(), line, reason);
                    rejected.push(RowRejection::Unparseable { line, reason });
                }
            }
        }

        parsed.sort_by_key(|r| r.date);
        let (rows, invalid) = StrictRowValidator::filter_flows(parsed);
        rejected.extend(invalid);

        let report = LoadReport {
            accepted: rows.len(),
            rejected,
        };
        Ok((rows, report))
    }

    /// `quote.txt` when present, else the last close of `candles`.
    pub fn price_from(&self, symbol: &str, candles: &[Candle]) -> Result<Decimal, DataSourceError> {
        if let Some(price) = self.quote_override(symbol)? {
            info!("CsvMarketData: using {} for {}", QUOTE_FILE, symbol);
            return Ok(price);
        }
        candles
            .last()
            .map(|c| c.close)
            .ok_or_else(|| DataSourceError::NoQuote {
                symbol: symbol.to_string(),
            })
    }

    fn quote_override(&self, symbol: &str) -> Result<Option<Decimal>, DataSourceError> {
        let path = self.file_for(symbol, QUOTE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        match Decimal::from_str(&clean_number(&raw)) {
            Ok(price) => Ok(Some(price)),
            Err(e) => {
                warn!("CsvMarketData: ignoring {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CandleSource for CsvMarketData {
    async fn daily_candles(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<Candle>, DataSourceError> {
        let (candles, report) = self.load_candles(symbol)?;
        if report.rejected_count() > 0 {
            warn!(
                "CsvMarketData: {} candles for {}: {} accepted, {} rejected",
                CANDLE_FILE,
                symbol,
                report.accepted,
                report.rejected_count()
            );
        }
        Ok(tail(candles, days))
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal, DataSourceError> {
        if let Some(price) = self.quote_override(symbol)? {
            info!("CsvMarketData: using {} for {}", QUOTE_FILE, symbol);
            return Ok(price);
        }
        let (candles, _) = self.load_candles(symbol)?;
        self.price_from(symbol, &candles)
    }
}

#[async_trait]
impl FlowSource for CsvMarketData {
    async fn investor_flows(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<FlowRow>, DataSourceError> {
        let (rows, report) = self.load_flows(symbol)?;
        if report.rejected_count() > 0 {
            warn!(
                "CsvMarketData: {} for {}: {} accepted, {} rejected",
                FLOW_FILE,
                symbol,
                report.accepted,
                report.rejected_count()
            );
        }
        Ok(tail(rows, days))
    }
}
