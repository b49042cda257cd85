use crate::models::StrategyType;

/// Known strategy phrases, lowercase. Order matters for partial matching:
/// multi-leg structures first, then verticals, then single legs, with broker
/// shorthand last so it only catches what nothing more specific did.
const STRATEGY_ALIASES: &[(&str, StrategyType)] = &[
    ("iron condor", StrategyType::IronCondor),
    ("iron butterfly", StrategyType::IronButterfly),
    ("iron fly", StrategyType::IronButterfly),
    ("butterfly", StrategyType::Butterfly),
    ("straddle", StrategyType::Straddle),
    ("strangle", StrategyType::Strangle),
    ("calendar spread", StrategyType::CalendarSpread),
    ("calendar", StrategyType::CalendarSpread),
    ("poor man's covered call", StrategyType::DiagonalSpread),
    ("diagonal spread", StrategyType::DiagonalSpread),
    ("diagonal", StrategyType::DiagonalSpread),
    ("ratio spread", StrategyType::RatioSpread),
    ("ratio", StrategyType::RatioSpread),
    ("bull call spread", StrategyType::BullCallSpread),
    ("bear call spread", StrategyType::BearCallSpread),
    ("bull put spread", StrategyType::BullPutSpread),
    ("bear put spread", StrategyType::BearPutSpread),
    ("call debit spread", StrategyType::BullCallSpread),
    ("call credit spread", StrategyType::BearCallSpread),
    ("put credit spread", StrategyType::BullPutSpread),
    ("put debit spread", StrategyType::BearPutSpread),
    ("covered call", StrategyType::CoveredCall),
    ("cash secured put", StrategyType::CashSecuredPut),
    ("cash-secured put", StrategyType::CashSecuredPut),
    ("long call", StrategyType::LongCall),
    ("long put", StrategyType::LongPut),
    ("short call", StrategyType::ShortCall),
    ("short put", StrategyType::ShortPut),
    ("naked call", StrategyType::ShortCall),
    ("naked put", StrategyType::ShortPut),
    ("custom", StrategyType::Custom),
    ("pmcc", StrategyType::DiagonalSpread),
    ("ifly", StrategyType::IronButterfly),
    ("csp", StrategyType::CashSecuredPut),
    ("cc", StrategyType::CoveredCall),
    ("ic", StrategyType::IronCondor),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyMatch {
    /// `None` means "uncertain", not "invalid"
    pub strategy_type: Option<StrategyType>,
    pub name: String,
}

/// Classify a free-text strategy label: exact phrase first, then the first
/// table entry where either string contains the other.
pub fn parse_strategy(input: &str) -> StrategyMatch {
    let wanted = input.trim().to_lowercase();

    let strategy_type = if wanted.is_empty() {
        None
    } else {
        STRATEGY_ALIASES
            .iter()
            .find(|(phrase, _)| *phrase == wanted)
            .or_else(|| {
                STRATEGY_ALIASES
                    .iter()
                    .find(|(phrase, _)| wanted.contains(phrase) || phrase.contains(wanted.as_str()))
            })
            .map(|(_, t)| *t)
    };

    StrategyMatch {
        strategy_type,
        name: input.to_string(),
    }
}
