use crate::db::Database;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStats {
    pub total_trades: i32,
    pub open_trades: i32,
    pub closed_trades: i32,
    pub expired_trades: i32,
    pub winners: i32,
    pub losers: i32,
    pub win_rate: f64,
    pub total_realized_pl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyBreakdown {
    /// Stored strategy type, or `UNCLASSIFIED` for trades without one
    pub strategy_type: String,
    pub trade_count: i32,
    pub winners: i32,
    pub losers: i32,
    pub total_realized_pl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesisSummary {
    pub thesis_id: String,
    pub name: String,
    pub ticker: String,
    pub status: String,
    pub trade_count: i32,
    pub open_trades: i32,
    pub total_realized_pl: f64,
}

pub async fn get_journal_stats(db: &Database) -> Result<JournalStats> {
    let conn = db.conn.lock()?;

    let stats = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(status = 'OPEN'), 0),
            COALESCE(SUM(status = 'CLOSED'), 0),
            COALESCE(SUM(status = 'EXPIRED'), 0),
            COALESCE(SUM(realized_pl > 0), 0),
            COALESCE(SUM(realized_pl < 0), 0),
            COALESCE(SUM(realized_pl), 0.0),
            COALESCE(MAX(realized_pl), 0.0),
            COALESCE(MIN(realized_pl), 0.0)
         FROM trades WHERE deleted_at IS NULL",
        [],
        |row| {
            let winners: i32 = row.get(4)?;
            let losers: i32 = row.get(5)?;
            let decided = winners + losers;
            Ok(JournalStats {
                total_trades: row.get(0)?,
                open_trades: row.get(1)?,
                closed_trades: row.get(2)?,
                expired_trades: row.get(3)?,
                winners,
                losers,
                win_rate: if decided > 0 {
                    (winners as f64 / decided as f64) * 100.0
                } else {
                    0.0
                },
                total_realized_pl: row.get(6)?,
                best_trade: row.get(7)?,
                worst_trade: row.get(8)?,
            })
        },
    )?;

    Ok(stats)
}

pub async fn get_strategy_breakdown(db: &Database) -> Result<Vec<StrategyBreakdown>> {
    let conn = db.conn.lock()?;

    let mut stmt = conn.prepare(
        "SELECT
            COALESCE(strategy_type, 'UNCLASSIFIED') AS strategy,
            COUNT(*),
            COALESCE(SUM(realized_pl > 0), 0),
            COALESCE(SUM(realized_pl < 0), 0),
            COALESCE(SUM(realized_pl), 0.0) AS total_pl
         FROM trades
         WHERE deleted_at IS NULL
         GROUP BY strategy
         ORDER BY total_pl DESC, strategy",
    )?;

    let breakdown = stmt
        .query_map([], |row| {
            Ok(StrategyBreakdown {
                strategy_type: row.get(0)?,
                trade_count: row.get(1)?,
                winners: row.get(2)?,
                losers: row.get(3)?,
                total_realized_pl: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(breakdown)
}

pub async fn get_thesis_summaries(db: &Database) -> Result<Vec<ThesisSummary>> {
    let conn = db.conn.lock()?;

    // LEFT JOIN keeps theses with no trades yet
    let mut stmt = conn.prepare(
        "SELECT
            th.id, th.name, th.ticker, th.status,
            COUNT(t.id),
            COALESCE(SUM(t.status = 'OPEN'), 0),
            COALESCE(SUM(t.realized_pl), 0.0)
         FROM theses th
         LEFT JOIN trades t ON t.thesis_id = th.id AND t.deleted_at IS NULL
         GROUP BY th.id
         ORDER BY th.created_at DESC, th.name",
    )?;

    let summaries = stmt
        .query_map([], |row| {
            Ok(ThesisSummary {
                thesis_id: row.get(0)?,
                name: row.get(1)?,
                ticker: row.get(2)?,
                status: row.get(3)?,
                trade_count: row.get(4)?,
                open_trades: row.get(5)?,
                total_realized_pl: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(summaries)
}
