use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Investor classes tracked by the broad agreement tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestorClass {
    Foreign,
    Institution,
    Pension,
    PrivateFund,
    InvestTrust,
}

impl InvestorClass {
    pub const BROAD: [InvestorClass; 5] = [
        InvestorClass::Foreign,
        InvestorClass::Institution,
        InvestorClass::Pension,
        InvestorClass::PrivateFund,
        InvestorClass::InvestTrust,
    ];
}

impl fmt::Display for InvestorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestorClass::Foreign => write!(f, "Foreign"),
            InvestorClass::Institution => write!(f, "Institution"),
            InvestorClass::Pension => write!(f, "Pension"),
            InvestorClass::PrivateFund => write!(f, "Private Fund"),
            InvestorClass::InvestTrust => write!(f, "Investment Trust"),
        }
    }
}

/// Daily net traded value per investor class (positive = net buying).
///
/// Subclass fields are `None` when the upstream source does not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRow {
    pub date: NaiveDate,
    pub foreign_net: i64,
    pub institution_net: i64,
    #[serde(default)]
    pub pension: Option<i64>,
    #[serde(default)]
    pub private_fund: Option<i64>,
    #[serde(default)]
    pub invest_trust: Option<i64>,
    #[serde(default)]
    pub financial: Option<i64>,
    #[serde(default)]
    pub insurance: Option<i64>,
    #[serde(default)]
    pub bank: Option<i64>,
    #[serde(default)]
    pub retail: Option<i64>,
    #[serde(default)]
    pub corporate: Option<i64>,
}

impl FlowRow {
    pub fn new(date: NaiveDate, foreign_net: i64, institution_net: i64) -> Self {
        Self {
            date,
            foreign_net,
            institution_net,
            pension: None,
            private_fund: None,
            invest_trust: None,
            financial: None,
            insurance: None,
            bank: None,
            retail: None,
            corporate: None,
        }
    }

    /// Foreign + institutional net for the day.
    pub fn smart_net(&self) -> i128 {
        i128::from(self.foreign_net) + i128::from(self.institution_net)
    }

    pub fn is_buy_day(&self) -> bool {
        self.smart_net() > 0
    }

    /// Net for one class; unreported subclasses count as zero.
    pub fn net_for(&self, class: InvestorClass) -> i64 {
        match class {
            InvestorClass::Foreign => self.foreign_net,
            InvestorClass::Institution => self.institution_net,
            InvestorClass::Pension => self.pension.unwrap_or(0),
            InvestorClass::PrivateFund => self.private_fund.unwrap_or(0),
            InvestorClass::InvestTrust => self.invest_trust.unwrap_or(0),
        }
    }
}

/// What a trend label suggests doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    ConsiderBuying,
    Avoid,
    Wait,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stance::ConsiderBuying => write!(f, "Consider buying"),
            Stance::Avoid => write!(f, "Avoid"),
            Stance::Wait => write!(f, "Wait"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    Accumulating,
    Distributing,
    TurningBuy,
    TurningSell,
    Neutral,
    Unknown,
    /// Only produced by the broad agreement tier
    BroadAccumulation,
    /// Only produced by the broad agreement tier
    BroadDistribution,
}

impl TrendLabel {
    pub fn stance(&self) -> Stance {
        match self {
            TrendLabel::Accumulating | TrendLabel::TurningBuy | TrendLabel::BroadAccumulation => {
                Stance::ConsiderBuying
            }
            TrendLabel::Distributing
            | TrendLabel::TurningSell
            | TrendLabel::BroadDistribution => Stance::Avoid,
            TrendLabel::Neutral | TrendLabel::Unknown => Stance::Wait,
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendLabel::Accumulating => write!(f, "ACCUMULATING"),
            TrendLabel::Distributing => write!(f, "DISTRIBUTING"),
            TrendLabel::TurningBuy => write!(f, "TURNING_BUY"),
            TrendLabel::TurningSell => write!(f, "TURNING_SELL"),
            TrendLabel::Neutral => write!(f, "NEUTRAL"),
            TrendLabel::Unknown => write!(f, "UNKNOWN"),
            TrendLabel::BroadAccumulation => write!(f, "BROAD_ACCUMULATION"),
            TrendLabel::BroadDistribution => write!(f, "BROAD_DISTRIBUTION"),
        }
    }
}

/// Per-day breakdown kept alongside the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub foreign_net: i64,
    pub institution_net: i64,
    pub smart_net: i128,
    pub is_buy: bool,
}

impl From<&FlowRow> for DailyFlow {
    fn from(row: &FlowRow) -> Self {
        Self {
            date: row.date,
            foreign_net: row.foreign_net,
            institution_net: row.institution_net,
            smart_net: row.smart_net(),
            is_buy: row.is_buy_day(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyTrend {
    pub label: TrendLabel,
    pub narrative: String,
    pub buy_days: usize,
    pub sell_days: usize,
    /// Trailing buy streak, newest day first
    pub consecutive_buy: usize,
    /// Trailing sell streak, newest day first
    pub consecutive_sell: usize,
    pub total_foreign_net: i128,
    pub total_institution_net: i128,
    pub daily: Vec<DailyFlow>,
}

impl SupplyTrend {
    pub fn unknown() -> Self {
        Self {
            label: TrendLabel::Unknown,
            narrative: "insufficient data".to_string(),
            buy_days: 0,
            sell_days: 0,
            consecutive_buy: 0,
            consecutive_sell: 0,
            total_foreign_net: 0,
            total_institution_net: 0,
            daily: Vec::new(),
        }
    }

    pub fn window_len(&self) -> usize {
        self.buy_days + self.sell_days
    }
}

/// How many of the broad investor classes ended the window net long / short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowAgreement {
    pub positive: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadSupplyTrend {
    pub label: TrendLabel,
    pub agreement: FlowAgreement,
    pub base: SupplyTrend,
}
