use super::columns::ColumnIndex;
use crate::models::CsvFormat;

const LEGACY_COLUMNS: &[&str] = &["Date", "Symbol", "Strategy"];
const OPTIONSTRAT_NAME_COLUMN: &str = "Name";
const OPTIONSTRAT_MARKER_COLUMNS: &[&str] = &[
    "Created At",
    "Created",
    "Total Return",
    "Return $",
    "Return",
    "Expiration",
];

pub fn detect_format(columns: &ColumnIndex) -> CsvFormat {
    if columns.has(OPTIONSTRAT_NAME_COLUMN) && columns.has_any(OPTIONSTRAT_MARKER_COLUMNS) {
        return CsvFormat::Optionstrat;
    }

    if LEGACY_COLUMNS.iter().all(|c| columns.has(c)) {
        return CsvFormat::Legacy;
    }

    CsvFormat::Unknown
}

/// Error text for a header row that matches neither layout.
pub fn describe_missing_columns(columns: &ColumnIndex) -> String {
    let missing_legacy: Vec<&str> = LEGACY_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.has(c))
        .collect();

    let optionstrat_gap = if columns.has(OPTIONSTRAT_NAME_COLUMN) {
        "Name is present but none of Created At, Total Return or Expiration"
    } else {
        "no Name column"
    };

    let found = if columns.headers().is_empty() {
        "(none)".to_string()
    } else {
        columns.headers().join(", ")
    };

    format!(
        "Missing required columns. Expected Date, Symbol, Strategy (legacy export; missing: {}) \
         or Name with Created At/Total Return/Expiration (OptionStrat export; {}). Found columns: {}",
        missing_legacy.join(", "),
        optionstrat_gap,
        found
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(headers: &[&str]) -> ColumnIndex {
        let owned: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        ColumnIndex::new(&owned)
    }

    #[test]
    fn test_detect_legacy() {
        let cols = columns(&["Date", "Symbol", "Strategy", "Legs", "P/L", "Status"]);
        assert_eq!(detect_format(&cols), CsvFormat::Legacy);

        // Column order and extra columns do not matter
        let cols = columns(&["status", "STRATEGY", "symbol", "Trade Date"]);
        assert_eq!(detect_format(&cols), CsvFormat::Legacy);
    }

    #[test]
    fn test_detect_optionstrat() {
        let cols = columns(&["Name", "Symbol", "Created At", "Expiration", "Total Return %", "Total Return $"]);
        assert_eq!(detect_format(&cols), CsvFormat::Optionstrat);

        // Renamed marker column still detected
        let cols = columns(&["Name", "Created On"]);
        assert_eq!(detect_format(&cols), CsvFormat::Optionstrat);
    }

    #[test]
    fn test_detect_unknown() {
        let cols = columns(&["Date", "Symbol"]);
        assert_eq!(detect_format(&cols), CsvFormat::Unknown);

        let cols = columns(&["Name", "Quantity"]);
        assert_eq!(detect_format(&cols), CsvFormat::Unknown);
    }

    #[test]
    fn test_missing_columns_message() {
        let message = describe_missing_columns(&columns(&["Date", "Symbol"]));
        assert!(message.starts_with("Missing required columns"));
        assert!(message.contains("missing: Strategy"));
        assert!(message.contains("Found columns: Date, Symbol"));
    }
}
