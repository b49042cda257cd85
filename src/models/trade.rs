use serde::{Deserialize, Serialize};

use super::{StrategyType, TradeStatus};

/// A trade stored in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub thesis_id: Option<String>,
    pub symbol: String,
    pub strategy_type: Option<StrategyType>,
    pub strategy_name: String,
    pub legs: String,
    pub opened_on: String, // YYYY-MM-DD
    pub expiration: Option<String>,
    pub status: TradeStatus,

    pub realized_pl: Option<f64>,
    pub return_percent: Option<f64>,
    pub max_loss: Option<f64>,
    pub max_profit: Option<f64>,

    pub notes: String,
    pub import_fingerprint: Option<String>,
    pub import_source: String, // USER_CREATED | CSV_IMPORT
    pub import_batch_id: Option<String>,
    pub raw_row: Option<String>, // JSON

    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTradeInput {
    pub status: Option<TradeStatus>,
    pub realized_pl: Option<f64>,
    pub notes: Option<String>,
    pub thesis_id: Option<String>,
    pub expiration: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub status: Option<TradeStatus>,
    pub symbol: Option<String>,
    pub strategy_type: Option<StrategyType>,
    pub thesis_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
