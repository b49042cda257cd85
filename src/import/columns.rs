//! Header normalization and tolerant column lookup.
//!
//! Broker exports rename columns between versions ("Created At" vs "Created"),
//! so every lookup goes through a normalized, substring-based match instead of
//! an exact header string.

use crate::models::RawRow;

/// Lowercase, treat `_` as a space, drop punctuation other than `$` and `%`,
/// collapse whitespace.
pub fn normalize_header(header: &str) -> String {
    let mut cleaned = String::with_capacity(header.len());
    for c in header.chars() {
        if c.is_alphanumeric() || c == '$' || c == '%' {
            cleaned.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '_' {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Both sides must already be normalized. Empty strings never match.
pub fn fuzzy_matches(header: &str, target: &str) -> bool {
    if header.is_empty() || target.is_empty() {
        return false;
    }
    header.contains(target) || target.contains(header)
}

/// The header row of one file, in file order.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    headers: Vec<String>,
    normalized: Vec<String>,
}

impl ColumnIndex {
    pub fn new(headers: &[String]) -> Self {
        Self {
            headers: headers.to_vec(),
            normalized: headers.iter().map(|h| normalize_header(h)).collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Best header for `target`: an exact normalized match wins, otherwise the
    /// first header that fuzzy-matches.
    pub fn find(&self, target: &str) -> Option<&str> {
        let wanted = normalize_header(target);

        if let Some(pos) = self.normalized.iter().position(|h| !h.is_empty() && *h == wanted) {
            return Some(&self.headers[pos]);
        }

        self.normalized
            .iter()
            .position(|h| fuzzy_matches(h, &wanted))
            .map(|pos| self.headers[pos].as_str())
    }

    pub fn has(&self, target: &str) -> bool {
        self.find(target).is_some()
    }

    pub fn has_any(&self, targets: &[&str]) -> bool {
        targets.iter().any(|t| self.has(t))
    }

    /// Cell for `target`, falling back to the literal key, then to "".
    pub fn value<'r>(&self, row: &'r RawRow, target: &str) -> &'r str {
        self.find(target)
            .and_then(|header| row.get(header))
            .or_else(|| row.get(target))
            .map(|v| v.trim())
            .unwrap_or("")
    }

    /// First non-empty cell among several aliases of the same field.
    pub fn value_any<'r>(&self, row: &'r RawRow, targets: &[&str]) -> &'r str {
        targets
            .iter()
            .map(|t| self.value(row, t))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(headers: &[&str]) -> ColumnIndex {
        let owned: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        ColumnIndex::new(&owned)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Total   Return $ "), "total return $");
        assert_eq!(normalize_header("P/L"), "pl");
        assert_eq!(normalize_header("Created_At"), "created at");
        assert_eq!(normalize_header("Return (%)"), "return %");
        assert_eq!(normalize_header("---"), "");
    }

    #[test]
    fn test_fuzzy_matches_both_directions() {
        assert!(fuzzy_matches("created at", "created"));
        assert!(fuzzy_matches("date", "trade date"));
        assert!(!fuzzy_matches("", "date"));
        assert!(!fuzzy_matches("total return %", "total return $"));
    }

    #[test]
    fn test_find_prefers_exact_match() {
        let cols = columns(&["Strategy Name", "Name", "Created At"]);
        assert_eq!(cols.find("Name"), Some("Name"));
        assert_eq!(cols.find("created"), Some("Created At"));
        assert_eq!(cols.find("Expiration"), None);
    }

    #[test]
    fn test_value_falls_back_to_literal_key() {
        let cols = columns(&["Date", "Symbol"]);
        let mut row = RawRow::new();
        row.insert("Date".to_string(), " 2024-01-15 ".to_string());
        row.insert("Notes".to_string(), "x".to_string());

        assert_eq!(cols.value(&row, "date"), "2024-01-15");
        assert_eq!(cols.value(&row, "Notes"), "x");
        assert_eq!(cols.value(&row, "Symbol"), "");
    }

    #[test]
    fn test_value_any_skips_empty_aliases() {
        let cols = columns(&["Total Return $", "Return $"]);
        let mut row = RawRow::new();
        row.insert("Total Return $".to_string(), "".to_string());
        row.insert("Return $".to_string(), "12".to_string());

        assert_eq!(cols.value_any(&row, &["Total Return $", "Return $"]), "12");
    }
}
