use regex::Regex;
use std::sync::LazyLock;

use crate::models::{CsvFormat, ParsedTrade, RawRow};

static TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,5}$").expect("valid ticker regex"));

/// Contract shared by every supported export layout: one raw row in, one
/// parsed trade out. Data problems become warnings on the trade, never errors.
pub trait RowParser {
    fn format(&self) -> CsvFormat;

    /// The trade-date cell exactly as exported, trimmed.
    fn date_text<'r>(&self, row: &'r RawRow) -> &'r str;

    /// Rows that describe a whole trade. Layouts with per-leg child rows
    /// return false for those.
    fn is_trade_row(&self, _row: &RawRow) -> bool {
        true
    }

    /// `index` is the zero-based position among trade rows.
    fn parse_row(&self, row: &RawRow, index: usize) -> ParsedTrade;
}

/// Batch-scoped trade id, e.g. `import-1a2b3c4d-7`
pub fn transient_trade_id(batch_id: &str, index: usize) -> String {
    format!("import-{}-{}", batch_id, index + 1)
}

/// Uppercases the ticker and records a warning for anything a broker
/// would not list. Returns an empty string for a missing symbol.
pub fn normalize_symbol(raw: &str, warnings: &mut Vec<String>) -> String {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        warnings.push("Missing symbol".to_string());
    } else if !TICKER.is_match(&symbol) {
        warnings.push(format!("Unusual symbol format: {}", symbol));
    }
    symbol
}

pub fn invalid_date_warning(raw: &str) -> String {
    if raw.trim().is_empty() {
        "Invalid date format: date is empty".to_string()
    } else {
        format!("Invalid date format: '{}'", raw.trim())
    }
}
