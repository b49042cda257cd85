//! Splits an OptionStrat trade name such as
//! `CRCL Apr 17th '26 100/150 Bull Call Spread` into its parts.
//!
//! The strategy phrase must start with one of [`STRATEGY_KEYWORDS`]; names
//! whose strategy starts with anything else (e.g. "Box Spread") decompose to a
//! ticker only.

const STRATEGY_KEYWORDS: &[&str] = &[
    "long", "short", "bull", "bear", "iron", "covered", "cash", "naked", "straddle", "strangle",
    "calendar", "diagonal", "butterfly", "condor", "ratio",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedName {
    pub ticker: String,
    /// e.g. "Apr 17th '26"; empty when no strategy keyword was found
    pub expiration: String,
    /// e.g. "Bull Call Spread"; empty when no strategy keyword was found
    pub strategy: String,
}

pub fn decompose_name(name: &str) -> DecomposedName {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let Some((first, rest)) = tokens.split_first() else {
        return DecomposedName::default();
    };

    let ticker = first.to_uppercase();

    let Some(start) = rest.iter().position(|token| is_strategy_keyword(token)) else {
        return DecomposedName {
            ticker,
            ..Default::default()
        };
    };

    let expiration = rest[..start]
        .iter()
        .filter(|token| !is_strike(token))
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    DecomposedName {
        ticker,
        expiration,
        strategy: rest[start..].join(" "),
    }
}

fn is_strategy_keyword(token: &str) -> bool {
    let lower = token.to_lowercase();
    STRATEGY_KEYWORDS.iter().any(|k| lower.starts_with(k))
}

/// Strike columns: "100", "22.5", "100/150"
fn is_strike(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit() || c == '/' || c == '.')
}
