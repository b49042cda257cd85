use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A market view that groups related trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub direction: ThesisDirection,
    pub status: ThesisStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThesisDirection {
    Bullish,
    Bearish,
    #[default]
    Neutral,
    Volatile,
}

impl ThesisDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisDirection::Bullish => "BULLISH",
            ThesisDirection::Bearish => "BEARISH",
            ThesisDirection::Neutral => "NEUTRAL",
            ThesisDirection::Volatile => "VOLATILE",
        }
    }
}

impl FromStr for ThesisDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BULLISH" => Ok(ThesisDirection::Bullish),
            "BEARISH" => Ok(ThesisDirection::Bearish),
            "NEUTRAL" => Ok(ThesisDirection::Neutral),
            "VOLATILE" => Ok(ThesisDirection::Volatile),
            other => Err(format!("Unknown thesis direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThesisStatus {
    #[default]
    Active,
    Closed,
}

impl ThesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisStatus::Active => "ACTIVE",
            ThesisStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ThesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThesisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ThesisStatus::Active),
            "CLOSED" => Ok(ThesisStatus::Closed),
            other => Err(format!("Unknown thesis status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThesisInput {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub direction: ThesisDirection,
}

/// Where a confirmed import trade should be filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThesisChoice {
    #[serde(rename_all = "camelCase")]
    Existing { thesis_id: String },
    /// Created once per distinct name within a confirmation, ticker taken from the trade
    #[serde(rename_all = "camelCase")]
    New {
        name: String,
        #[serde(default)]
        direction: ThesisDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisAssignment {
    pub trade_id: String,
    pub thesis: ThesisChoice,
}
