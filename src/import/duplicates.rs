use std::collections::HashSet;

use crate::models::{CsvFormat, ParsedTrade};

/// `YYYY-MM-DD|SYMBOL|strategy name`. An unparsed date keys on its raw
/// text, so rows with different bad dates stay distinct.
pub fn duplicate_key(trade: &ParsedTrade, date_text: &str) -> String {
    let date = match trade.date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => date_text.trim().to_string(),
    };
    format!("{}|{}|{}", date, trade.symbol, trade.strategy_name)
}

/// Flags every repeat of an earlier (date, symbol, strategy name) in this
/// batch. `date_texts[i]` is the exported date cell of `trades[i]`.
/// Returns the number of trades flagged. Validity is left untouched.
pub fn mark_duplicates(trades: &mut [ParsedTrade], date_texts: &[&str]) -> usize {
    let mut seen = HashSet::with_capacity(trades.len());
    let mut flagged = 0;

    for (i, trade) in trades.iter_mut().enumerate() {
        let date_text = date_texts.get(i).copied().unwrap_or_default();
        if !seen.insert(duplicate_key(trade, date_text)) {
            trade.is_duplicate = true;
            flagged += 1;
        }
    }

    flagged
}

/// Persisted dedup key used across imports, e.g.
/// `csv|legacy|2024-01-15|aapl|iron condor`
pub fn import_fingerprint(format: CsvFormat, trade: &ParsedTrade) -> String {
    let date = trade
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    format!(
        "csv|{}|{}|{}|{}",
        format,
        date,
        trade.symbol.to_lowercase(),
        trade.strategy_name.trim().to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRow, TradeStatus};
    use chrono::NaiveDate;

    fn trade(symbol: &str, strategy: &str, valid: bool) -> ParsedTrade {
        ParsedTrade {
            id: format!("import-t-{}", symbol),
            row_number: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            symbol: symbol.to_string(),
            strategy_type: None,
            strategy_name: strategy.to_string(),
            legs: String::new(),
            realized_pl: None,
            status: TradeStatus::Open,
            expiration: None,
            return_percent: None,
            max_loss: None,
            max_profit: None,
            warnings: vec![],
            is_valid: valid,
            is_duplicate: false,
            raw_row: RawRow::new(),
        }
    }

    #[test]
    fn test_second_occurrence_is_flagged() {
        let mut trades = vec![
            trade("AAPL", "Iron Condor", true),
            trade("AAPL", "Iron Condor", true),
            trade("MSFT", "Iron Condor", true),
        ];

        assert_eq!(mark_duplicates(&mut trades, &["2024-01-15"; 3]), 1);
        assert!(!trades[0].is_duplicate);
        assert!(trades[1].is_duplicate);
        assert!(!trades[2].is_duplicate);
    }

    #[test]
    fn test_duplicate_marking_keeps_validity() {
        let mut trades = vec![trade("AAPL", "Long Call", false), trade("AAPL", "Long Call", true)];
        mark_duplicates(&mut trades, &[]);

        assert!(!trades[0].is_valid);
        assert!(trades[1].is_valid);
        assert!(trades[1].is_duplicate);
    }

    #[test]
    fn test_unparsed_dates_key_on_raw_text() {
        let mut trades = vec![trade("AAPL", "Long Call", false), trade("AAPL", "Long Call", false)];
        for t in trades.iter_mut() {
            t.date = None;
        }

        assert_eq!(mark_duplicates(&mut trades, &["bad-one", "other-bad"]), 0);
        assert!(trades.iter().all(|t| !t.is_duplicate));

        assert_eq!(mark_duplicates(&mut trades, &["bad-one", " bad-one "]), 1);
        assert!(trades[1].is_duplicate);
    }

    #[test]
    fn test_fingerprint() {
        let t = trade("AAPL", "Iron Condor ", true);
        assert_eq!(
            import_fingerprint(CsvFormat::Legacy, &t),
            "csv|legacy|2024-01-15|aapl|iron condor"
        );
    }
}
