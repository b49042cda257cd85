//! OptionStrat portfolio export.
//!
//! Each trade appears as a parent row (the `Name` column holds a description
//! like `CRCL Apr 17th '26 100/150 Bull Call Spread`) followed by one child row
//! per option leg. Child rows carry a `.`-prefixed option symbol or a symbol
//! with no name, and are not trades themselves.

use chrono::NaiveDate;

use super::columns::ColumnIndex;
use super::name::decompose_name;
use super::row_parser::{RowParser, invalid_date_warning, normalize_symbol, transient_trade_id};
use super::strategy::parse_strategy;
use super::values::{parse_percent, parse_pl, parse_trade_date};
use crate::models::{CsvFormat, ParsedTrade, RawRow, TradeStatus};

const CREATED_COLUMNS: &[&str] = &["Created At", "Created"];
const RETURN_AMOUNT_COLUMNS: &[&str] = &["Total Return $", "Return $"];
const RETURN_PERCENT_COLUMNS: &[&str] = &["Total Return %", "Return %"];

pub struct OptionstratRowParser<'a> {
    columns: &'a ColumnIndex,
    batch_id: &'a str,
    today: NaiveDate,
}

impl<'a> OptionstratRowParser<'a> {
    pub fn new(columns: &'a ColumnIndex, batch_id: &'a str, today: NaiveDate) -> Self {
        Self {
            columns,
            batch_id,
            today,
        }
    }

    /// Leg rows: option symbol prefixed with `.`, or a symbol without a name.
    pub fn is_leg_row(&self, row: &RawRow) -> bool {
        let symbol = self.columns.value(row, "Symbol");
        let name = self.columns.value(row, "Name");
        symbol.starts_with('.') || (!symbol.is_empty() && name.is_empty())
    }
}

impl RowParser for OptionstratRowParser<'_> {
    fn format(&self) -> CsvFormat {
        CsvFormat::Optionstrat
    }

    fn date_text<'r>(&self, row: &'r RawRow) -> &'r str {
        self.columns.value_any(row, CREATED_COLUMNS)
    }

    fn is_trade_row(&self, row: &RawRow) -> bool {
        !self.is_leg_row(row)
    }

    fn parse_row(&self, row: &RawRow, index: usize) -> ParsedTrade {
        let mut warnings = Vec::new();

        let name = self.columns.value(row, "Name");
        let parts = decompose_name(name);

        let symbol = normalize_symbol(&parts.ticker, &mut warnings);

        let date_raw = self.date_text(row);
        let date = parse_trade_date(date_raw);
        if date.is_none() {
            warnings.push(invalid_date_warning(date_raw));
        }

        let strategy = parse_strategy(&parts.strategy);
        if strategy.name.is_empty() {
            if !name.is_empty() {
                warnings.push(format!("Could not determine strategy from name: '{}'", name));
            }
        } else if strategy.strategy_type.is_none() {
            warnings.push(format!("Unknown strategy: {}", strategy.name));
        }

        let expiration = match self.columns.value(row, "Expiration") {
            "" if parts.expiration.is_empty() => None,
            "" => Some(parts.expiration.clone()),
            column => Some(column.to_string()),
        };
        let expiration_date = expiration.as_deref().and_then(parse_trade_date);
        if expiration.is_some() && expiration_date.is_none() {
            warnings.push(format!(
                "Could not parse expiration '{}'",
                expiration.as_deref().unwrap_or_default()
            ));
        }

        ParsedTrade {
            id: transient_trade_id(self.batch_id, index),
            row_number: index + 1,
            is_valid: date.is_some() && !symbol.is_empty(),
            date,
            symbol,
            strategy_type: strategy.strategy_type,
            strategy_name: strategy.name,
            legs: String::new(),
            realized_pl: parse_pl(self.columns.value_any(row, RETURN_AMOUNT_COLUMNS)),
            status: determine_status(expiration_date, self.today),
            expiration,
            return_percent: parse_percent(self.columns.value_any(row, RETURN_PERCENT_COLUMNS)),
            max_loss: parse_pl(self.columns.value(row, "Max Loss")),
            max_profit: parse_pl(self.columns.value(row, "Max Profit")),
            warnings,
            is_duplicate: false,
            raw_row: row.clone(),
        }
    }
}

/// The export has no "closed early" marker: a trade is EXPIRED once its
/// expiration is behind `today`, and OPEN otherwise. Never CLOSED.
pub fn determine_status(expiration: Option<NaiveDate>, today: NaiveDate) -> TradeStatus {
    match expiration {
        Some(date) if date < today => TradeStatus::Expired,
        _ => TradeStatus::Open,
    }
}
