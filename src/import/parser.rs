use chrono::{Local, NaiveDate};
use csv::{ReaderBuilder, Trim};
use std::io::Cursor;

use super::columns::ColumnIndex;
use super::duplicates::mark_duplicates;
use super::format::{describe_missing_columns, detect_format};
use super::legacy::LegacyRowParser;
use super::optionstrat::OptionstratRowParser;
use super::row_parser::RowParser;
use crate::models::{CsvFormat, ParseResult, ParseSummary, RawRow};

/// Header plus data rows of one uploaded file.
struct CsvTable {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

/// One data record, padded or cut to the header width.
struct TableRow {
    line: u64,
    /// Field count as written in the file
    fields: usize,
    cells: RawRow,
}

/// Turns uploaded broker CSV text into a reviewable [`ParseResult`].
///
/// Holds no state between calls; each `parse` works on its own input.
#[derive(Debug, Clone)]
pub struct CsvImportParser {
    today: NaiveDate,
}

impl Default for CsvImportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImportParser {
    pub fn new() -> Self {
        Self::with_reference_date(Local::now().date_naive())
    }

    /// `today` decides which parent/child trades count as expired.
    pub fn with_reference_date(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Never fails: tokenizer problems and unrecognized layouts come back as
    /// `errors`, per-row problems as warnings on the trades.
    pub fn parse(&self, csv_content: &str) -> ParseResult {
        let content = csv_content.trim_start_matches('\u{feff}');

        let mut errors = Vec::new();
        let table = match read_table(content, &mut errors) {
            Some(table) => table,
            None => return ParseResult::failed(CsvFormat::Unknown, errors),
        };

        let columns = ColumnIndex::new(&table.headers);
        let format = detect_format(&columns);
        if format == CsvFormat::Unknown {
            log::warn!("Unrecognized CSV layout, columns: {:?}", table.headers);
            errors.push(describe_missing_columns(&columns));
            return ParseResult::failed(format, errors);
        }

        let batch_id = new_batch_id();
        let parser: Box<dyn RowParser + '_> = match format {
            CsvFormat::Optionstrat => {
                Box::new(OptionstratRowParser::new(&columns, &batch_id, self.today))
            }
            _ => Box::new(LegacyRowParser::new(&columns, &batch_id)),
        };

        let trade_rows: Vec<&TableRow> = table
            .rows
            .iter()
            .filter(|row| parser.is_trade_row(&row.cells))
            .collect();
        let skipped_leg_rows = table.rows.len() - trade_rows.len();

        // Leg rows often omit trailing empty cells; only trade rows must be full width
        for row in trade_rows.iter().filter(|r| r.fields != table.headers.len()) {
            errors.push(format!(
                "Row has {} fields, expected {} (line {})",
                row.fields,
                table.headers.len(),
                row.line
            ));
        }

        let date_texts: Vec<&str> = trade_rows
            .iter()
            .map(|row| parser.date_text(&row.cells))
            .collect();

        let mut trades = Vec::with_capacity(trade_rows.len());
        let mut warnings = Vec::new();
        for (index, row) in trade_rows.into_iter().enumerate() {
            let trade = parser.parse_row(&row.cells, index);
            for warning in &trade.warnings {
                warnings.push(format!("Row {}: {}", trade.row_number, warning));
            }
            trades.push(trade);
        }

        let duplicates = mark_duplicates(&mut trades, &date_texts);
        let valid = trades.iter().filter(|t| t.is_valid).count();
        let summary = ParseSummary {
            total: trades.len(),
            valid,
            invalid: trades.len() - valid,
            duplicates,
            skipped_leg_rows,
        };

        log::info!(
            "Parsed {} CSV: {} trades ({} valid, {} invalid, {} duplicates, {} leg rows skipped)",
            parser.format(),
            summary.total,
            summary.valid,
            summary.invalid,
            summary.duplicates,
            summary.skipped_leg_rows
        );

        ParseResult {
            success: errors.is_empty() && valid > 0,
            format,
            trades,
            errors,
            warnings,
            summary,
        }
    }
}

/// Parse with today's date as the expiry reference.
pub fn parse_csv(csv_content: &str) -> ParseResult {
    CsvImportParser::new().parse(csv_content)
}

/// Returns `None` when there is no usable header row. Records of the wrong
/// width are kept with missing cells read as empty; unreadable records are
/// reported in `errors` and skipped; fully blank records are dropped.
fn read_table(content: &str, errors: &mut Vec<String>) -> Option<CsvTable> {
    if content.trim().is_empty() {
        errors.push("CSV file is empty".to_string());
        return None;
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(Cursor::new(content.as_bytes()));

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.to_string()).collect(),
        Err(e) => {
            errors.push(format!("Could not read CSV header: {}", e));
            return None;
        }
    };

    if headers.iter().all(|h| h.is_empty()) {
        errors.push("CSV header row is empty".to_string());
        return None;
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                if record.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                let cells: RawRow = headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default().to_string()))
                    .collect();
                rows.push(TableRow {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    fields: record.len(),
                    cells,
                });
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line().to_string())
                    .unwrap_or_else(|| "?".to_string());
                log::debug!("Skipping malformed CSV record at line {}: {}", line, e);
                errors.push(format!("Malformed row at line {}: {}", line, e));
            }
        }
    }

    Some(CsvTable { headers, rows })
}

fn new_batch_id() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StrategyType, TradeStatus};

    fn parser() -> CsvImportParser {
        CsvImportParser::with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    const LEGACY_CSV: &str = "Date,Symbol,Strategy,Legs,P/L,Status
2024-01-15,AAPL,Iron Condor,\"175P/180P/190C/195C\",+$245,Closed
2024-01-16,NVDA,Bull Put Spread,\"100P/95P\",-$150,Open
";

    #[test]
    fn test_legacy_end_to_end() {
        let result = parser().parse(LEGACY_CSV);

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.format, CsvFormat::Legacy);
        assert_eq!(result.trades.len(), 2);

        let first = &result.trades[0];
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(first.strategy_type, Some(StrategyType::IronCondor));
        assert_eq!(first.realized_pl, Some(245.0));
        assert_eq!(first.status, TradeStatus::Closed);
        assert!(first.is_valid);
        assert_eq!(first.legs, "175P/180P/190C/195C");

        let second = &result.trades[1];
        assert_eq!(second.strategy_type, Some(StrategyType::BullPutSpread));
        assert_eq!(second.realized_pl, Some(-150.0));
        assert_eq!(second.status, TradeStatus::Open);

        assert_ne!(first.id, second.id);
        assert_eq!(
            result.summary,
            ParseSummary {
                total: 2,
                valid: 2,
                invalid: 0,
                duplicates: 0,
                skipped_leg_rows: 0
            }
        );
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let with_bom = format!("\u{feff}{}", LEGACY_CSV);
        let result = parser().parse(&with_bom);
        assert!(result.success);
        assert_eq!(result.format, CsvFormat::Legacy);
    }

    #[test]
    fn test_missing_columns_fails_without_trades() {
        let result = parser().parse("Date,Symbol\n2024-01-15,AAPL\n");

        assert!(!result.success);
        assert_eq!(result.format, CsvFormat::Unknown);
        assert!(result.trades.is_empty());
        assert!(result.errors.iter().any(|e| e.contains("Missing required columns")));
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "\u{feff}", "  \n "] {
            let result = parser().parse(input);
            assert!(!result.success);
            assert!(result.trades.is_empty());
            assert_eq!(result.errors.len(), 1);
        }
    }

    #[test]
    fn test_duplicates_are_flagged_not_dropped() {
        let csv = "Date,Symbol,Strategy,Legs,P/L,Status
2024-01-15,AAPL,Iron Condor,,+$245,Closed
2024-01-15,AAPL,Iron Condor,,+$245,Closed
2024-01-15,MSFT,Iron Condor,,+$100,Closed
";
        let result = parser().parse(csv);

        assert!(result.success);
        assert_eq!(result.trades.len(), 3);
        assert_eq!(result.trades.iter().filter(|t| t.is_duplicate).count(), 1);
        assert!(result.trades[1].is_duplicate);
        assert_eq!(result.summary.duplicates, 1);

        let importable: Vec<&str> = result
            .trades
            .iter()
            .filter(|t| t.is_importable())
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(importable, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_rows_with_different_bad_dates_are_not_duplicates() {
        let csv = "Date,Symbol,Strategy
bad-one,AAPL,Long Call
other-bad,AAPL,Long Call
";
        let result = parser().parse(csv);

        assert_eq!(result.trades.len(), 2);
        assert!(result.trades.iter().all(|t| !t.is_duplicate && !t.is_valid));
        assert_eq!(result.summary.duplicates, 0);
    }

    #[test]
    fn test_invalid_rows_are_kept() {
        let csv = "Date,Symbol,Strategy,Legs,P/L,Status
not-a-date,AAPL,Long Call,,,Open
2024-01-16,,Long Put,,,Open
2024-01-17,TSLA,Mystery Trade,,,Open
";
        let result = parser().parse(csv);

        assert_eq!(result.trades.len(), 3);
        assert!(!result.trades[0].is_valid);
        assert!(!result.trades[1].is_valid);
        assert!(result.trades[2].is_valid);
        assert_eq!(result.summary.valid, 1);
        assert_eq!(result.summary.invalid, 2);
        assert!(result.success);

        assert!(result.warnings.iter().any(|w| w.starts_with("Row 1: Invalid date format")));
        assert!(result.warnings.contains(&"Row 2: Missing symbol".to_string()));
        assert!(result.warnings.contains(&"Row 3: Unknown strategy: Mystery Trade".to_string()));
    }

    #[test]
    fn test_no_valid_rows_is_not_success() {
        let csv = "Date,Symbol,Strategy\nbad,AAPL,Long Call\n";
        let result = parser().parse(csv);

        assert!(result.errors.is_empty());
        assert_eq!(result.trades.len(), 1);
        assert!(!result.success);
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let csv = "Date,Symbol,Strategy
2024-01-15,AAPL,Long Call
2024-01-16,MSFT
2024-01-17,TSLA,Long Put
";
        let result = parser().parse(csv);

        assert!(!result.success);
        assert_eq!(result.errors, vec!["Row has 2 fields, expected 3 (line 3)".to_string()]);
        assert_eq!(result.trades.len(), 3);

        let short = &result.trades[1];
        assert_eq!(short.symbol, "MSFT");
        assert!(short.is_valid);
        assert_eq!(short.strategy_type, None);
        assert!(short.warnings.contains(&"Missing strategy".to_string()));
    }

    #[test]
    fn test_short_leg_rows_are_skipped_quietly() {
        let csv = "Name,Symbol,Created At,Expiration,Total Return %,Total Return $,Max Loss,Max Profit
CRCL Apr 17th '26 100/150 Bull Call Spread,,2025-03-10,,12.5%,$310.00,-$1200,$3800
,.CRCL260417C100
,.CRCL260417C150
";
        let result = parser().parse(csv);

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.summary.skipped_leg_rows, 2);
    }

    #[test]
    fn test_short_parent_row_is_kept() {
        let csv = "Name,Symbol,Created At,Expiration,Total Return %,Total Return $,Max Loss,Max Profit
CRCL Apr 17th '26 100/150 Bull Call Spread,,2025-03-10
,.CRCL260417C100
";
        let result = parser().parse(csv);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].symbol, "CRCL");
        assert_eq!(result.trades[0].realized_pl, None);
        assert_eq!(result.errors, vec!["Row has 3 fields, expected 8 (line 2)".to_string()]);
        assert!(!result.success);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let csv = "Date,Symbol,Strategy\n2024-01-15,AAPL,Long Call\n,,\n\n2024-01-16,MSFT,Long Put\n";
        let result = parser().parse(csv);

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.trades.len(), 2);
    }

    #[test]
    fn test_optionstrat_end_to_end() {
        let csv = "Name,Symbol,Created At,Expiration,Total Return %,Total Return $,Max Loss,Max Profit
CRCL Apr 17th '26 100/150 Bull Call Spread,,2025-03-10,,12.5%,$310.00,-$1200,$3800
,.CRCL260417C100,,,,,,
,.CRCL260417C150,,,,,,
ASPI Jan 17th '25 20 Long Call,,2024-11-02,2025-01-17,-100%,-$250,-$250,
,.ASPI250117C20,,,,,,
";
        let result = parser().parse(csv);

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.format, CsvFormat::Optionstrat);
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.summary.skipped_leg_rows, 3);

        let crcl = &result.trades[0];
        assert_eq!(crcl.symbol, "CRCL");
        assert_eq!(crcl.strategy_type, Some(StrategyType::BullCallSpread));
        assert_eq!(crcl.status, TradeStatus::Open);
        assert_eq!(crcl.realized_pl, Some(310.0));

        let aspi = &result.trades[1];
        assert_eq!(aspi.symbol, "ASPI");
        assert_eq!(aspi.row_number, 2);
        assert_eq!(aspi.strategy_type, Some(StrategyType::LongCall));
        assert_eq!(aspi.status, TradeStatus::Expired);
        assert_eq!(aspi.max_profit, None);
    }

    #[test]
    fn test_result_serializes_for_preview() {
        let result = parser().parse(LEGACY_CSV);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["format"], "legacy");
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["trades"][0]["realizedPL"], 245.0);
    }
}
