use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One CSV data line keyed by its (trimmed) header.
pub type RawRow = BTreeMap<String, String>;

/// CSV layouts the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    /// Flat export: Date, Symbol, Strategy, Legs, P/L, Status
    Legacy,
    /// OptionStrat export: one parent row per trade followed by its leg rows
    Optionstrat,
    Unknown,
}

impl CsvFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsvFormat::Legacy => "legacy",
            CsvFormat::Optionstrat => "optionstrat",
            CsvFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    LongCall,
    LongPut,
    ShortCall,
    ShortPut,
    CoveredCall,
    CashSecuredPut,
    BullCallSpread,
    BearCallSpread,
    BullPutSpread,
    BearPutSpread,
    IronCondor,
    IronButterfly,
    Butterfly,
    Straddle,
    Strangle,
    CalendarSpread,
    DiagonalSpread,
    RatioSpread,
    Custom,
}

impl StrategyType {
    pub const ALL: [StrategyType; 19] = [
        StrategyType::LongCall,
        StrategyType::LongPut,
        StrategyType::ShortCall,
        StrategyType::ShortPut,
        StrategyType::CoveredCall,
        StrategyType::CashSecuredPut,
        StrategyType::BullCallSpread,
        StrategyType::BearCallSpread,
        StrategyType::BullPutSpread,
        StrategyType::BearPutSpread,
        StrategyType::IronCondor,
        StrategyType::IronButterfly,
        StrategyType::Butterfly,
        StrategyType::Straddle,
        StrategyType::Strangle,
        StrategyType::CalendarSpread,
        StrategyType::DiagonalSpread,
        StrategyType::RatioSpread,
        StrategyType::Custom,
    ];

    /// Storage / wire name, e.g. `IRON_CONDOR`
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::LongCall => "LONG_CALL",
            StrategyType::LongPut => "LONG_PUT",
            StrategyType::ShortCall => "SHORT_CALL",
            StrategyType::ShortPut => "SHORT_PUT",
            StrategyType::CoveredCall => "COVERED_CALL",
            StrategyType::CashSecuredPut => "CASH_SECURED_PUT",
            StrategyType::BullCallSpread => "BULL_CALL_SPREAD",
            StrategyType::BearCallSpread => "BEAR_CALL_SPREAD",
            StrategyType::BullPutSpread => "BULL_PUT_SPREAD",
            StrategyType::BearPutSpread => "BEAR_PUT_SPREAD",
            StrategyType::IronCondor => "IRON_CONDOR",
            StrategyType::IronButterfly => "IRON_BUTTERFLY",
            StrategyType::Butterfly => "BUTTERFLY",
            StrategyType::Straddle => "STRADDLE",
            StrategyType::Strangle => "STRANGLE",
            StrategyType::CalendarSpread => "CALENDAR_SPREAD",
            StrategyType::DiagonalSpread => "DIAGONAL_SPREAD",
            StrategyType::RatioSpread => "RATIO_SPREAD",
            StrategyType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown strategy type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Closed,
    Expired,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
            TradeStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            "EXPIRED" => Ok(TradeStatus::Expired),
            other => Err(format!("Unknown trade status: {}", other)),
        }
    }
}

/// A single trade as read from an import file, before the user confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTrade {
    /// Unique within one import batch only
    pub id: String,
    /// 1-based position among the parsed rows, as shown to the user
    pub row_number: usize,
    pub date: Option<NaiveDate>,
    pub symbol: String,
    pub strategy_type: Option<StrategyType>,
    pub strategy_name: String,
    pub legs: String,
    #[serde(rename = "realizedPL")]
    pub realized_pl: Option<f64>,
    pub status: TradeStatus,
    pub expiration: Option<String>,
    pub return_percent: Option<f64>,
    pub max_loss: Option<f64>,
    pub max_profit: Option<f64>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
    pub is_duplicate: bool,
    pub raw_row: RawRow,
}

impl ParsedTrade {
    /// A trade that can be offered for import by default.
    pub fn is_importable(&self) -> bool {
        self.is_valid && !self.is_duplicate
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub skipped_leg_rows: usize,
}

/// Outcome of parsing one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub success: bool,
    pub format: CsvFormat,
    pub trades: Vec<ParsedTrade>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: ParseSummary,
}

impl ParseResult {
    pub(crate) fn failed(format: CsvFormat, errors: Vec<String>) -> Self {
        Self {
            success: false,
            format,
            trades: Vec::new(),
            errors,
            warnings: Vec::new(),
            summary: ParseSummary::default(),
        }
    }
}
