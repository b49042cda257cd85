use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("valid number regex"));
static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));
static SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"['‘’](\d{2})\b").expect("valid short year regex"));

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2024-01-15
    "%m/%d/%y",  // 1/15/24 (before %Y so "24" is not read as year 24)
    "%m/%d/%Y",  // 01/15/2024
    "%Y/%m/%d",  // 2024/01/15
    "%m-%d-%Y",  // 01-15-2024
    "%b %d %Y",  // Jan 15 2024, January 15 2024
    "%d %b %Y",  // 15 Jan 2024
    "%d-%b-%Y",  // 15-Jan-2024
    "%Y%m%d",    // 20240115
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%b %d %Y %I:%M %p",
];

/// Placeholder values brokers write into empty numeric cells.
pub fn is_placeholder(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_uppercase().as_str(),
        "" | "N/A" | "NA" | "-" | "--" | "NONE" | "NULL"
    )
}

/// Parse a money amount such as `+$245`, `-$150`, `1,245.50` or `(150.00)`.
pub fn parse_pl(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return None;
    }

    // Accounting format: (150.00) is negative
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if !NUMBER.is_match(cleaned) {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .map(|v| if negative { -v } else { v })
}

/// Parse a percentage cell such as `12.5%` or `-3%` into 12.5 / -3.0.
pub fn parse_percent(raw: &str) -> Option<f64> {
    parse_pl(&raw.trim().replace('%', ""))
}

/// Parse the date part of any of the date and date-time layouts seen in
/// broker exports. Times and offsets are discarded.
pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    let cleaned = clean_date_text(trimmed);

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(date);
        }
    }

    let without_tz = cleaned
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim_end_matches("-00:00");
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(without_tz, fmt) {
            return Some(dt.date());
        }
    }

    // "2025-03-10 14:22:05 EST" and similar: retry with the leading token only
    let first = cleaned.split_whitespace().next().unwrap_or("");
    if first.len() < cleaned.len() {
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(first, fmt) {
                return Some(date);
            }
        }
    }

    None
}

/// "Apr 17th, '26" -> "Apr 17 2026"
fn clean_date_text(raw: &str) -> String {
    let no_ordinals = ORDINAL_SUFFIX.replace_all(raw, "$1");
    let full_year = SHORT_YEAR.replace_all(&no_ordinals, "20$1");
    full_year
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
