use super::columns::ColumnIndex;
use super::row_parser::{RowParser, invalid_date_warning, normalize_symbol, transient_trade_id};
use super::strategy::parse_strategy;
use super::values::{is_placeholder, parse_pl, parse_trade_date};
use crate::models::{CsvFormat, ParsedTrade, RawRow, TradeStatus};

const PL_COLUMNS: &[&str] = &["P/L", "PnL", "Profit/Loss", "Realized P/L"];

/// Flat export: `Date, Symbol, Strategy, Legs, P/L, Status`, one trade per row.
pub struct LegacyRowParser<'a> {
    columns: &'a ColumnIndex,
    batch_id: &'a str,
}

impl<'a> LegacyRowParser<'a> {
    pub fn new(columns: &'a ColumnIndex, batch_id: &'a str) -> Self {
        Self { columns, batch_id }
    }
}

impl RowParser for LegacyRowParser<'_> {
    fn format(&self) -> CsvFormat {
        CsvFormat::Legacy
    }

    fn date_text<'r>(&self, row: &'r RawRow) -> &'r str {
        self.columns.value(row, "Date")
    }

    fn parse_row(&self, row: &RawRow, index: usize) -> ParsedTrade {
        let mut warnings = Vec::new();

        let date_raw = self.date_text(row);
        let date = parse_trade_date(date_raw);
        if date.is_none() {
            warnings.push(invalid_date_warning(date_raw));
        }

        let symbol = normalize_symbol(self.columns.value(row, "Symbol"), &mut warnings);

        let strategy = parse_strategy(self.columns.value(row, "Strategy"));
        if strategy.strategy_type.is_none() {
            if strategy.name.is_empty() {
                warnings.push("Missing strategy".to_string());
            } else {
                warnings.push(format!("Unknown strategy: {}", strategy.name));
            }
        }

        let pl_raw = self.columns.value_any(row, PL_COLUMNS);
        let realized_pl = parse_pl(pl_raw);
        if realized_pl.is_none() && !is_placeholder(pl_raw) {
            warnings.push(format!("Could not parse P/L: '{}'", pl_raw));
        }

        let status = parse_status(self.columns.value(row, "Status"), realized_pl, &mut warnings);

        ParsedTrade {
            id: transient_trade_id(self.batch_id, index),
            row_number: index + 1,
            is_valid: date.is_some() && !symbol.is_empty(),
            date,
            symbol,
            strategy_type: strategy.strategy_type,
            strategy_name: strategy.name,
            legs: self.columns.value(row, "Legs").to_string(),
            realized_pl,
            status,
            expiration: None,
            return_percent: None,
            max_loss: None,
            max_profit: None,
            warnings,
            is_duplicate: false,
            raw_row: row.clone(),
        }
    }
}

/// Status text from the export. A blank or unrecognized value falls back to
/// CLOSED when the row carries a P/L and OPEN otherwise.
fn parse_status(raw: &str, realized_pl: Option<f64>, warnings: &mut Vec<String>) -> TradeStatus {
    match raw.trim().to_lowercase().as_str() {
        "open" | "opened" | "active" => TradeStatus::Open,
        "closed" | "close" | "filled" | "assigned" | "exercised" => TradeStatus::Closed,
        "expired" | "exp" => TradeStatus::Expired,
        other => {
            let derived = if realized_pl.is_some() {
                TradeStatus::Closed
            } else {
                TradeStatus::Open
            };
            if !other.is_empty() {
                warnings.push(format!("Unknown status '{}', using {}", raw.trim(), derived));
            }
            derived
        }
    }
}
