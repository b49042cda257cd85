use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{Trade, TradeFilters, UpdateTradeInput};
use chrono::Utc;
use rusqlite::{Connection, params};
use std::str::FromStr;

pub(crate) const TRADE_COLUMNS: &str = "id, thesis_id, symbol, strategy_type, strategy_name, legs, opened_on, expiration, status, \
     realized_pl, return_percent, max_loss, max_profit, notes, import_fingerprint, import_source, \
     import_batch_id, raw_row, created_at, updated_at, deleted_at";

/// Reads a TEXT column stored via `as_str()` back into its enum.
fn parse_text_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// Helper function to map a database row to a Trade struct
pub(crate) fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let strategy_type = match row.get::<_, Option<String>>(3)? {
        Some(_) => Some(parse_text_column(row, 3)?),
        None => None,
    };

    Ok(Trade {
        id: row.get(0)?,
        thesis_id: row.get(1)?,
        symbol: row.get(2)?,
        strategy_type,
        strategy_name: row.get(4)?,
        legs: row.get(5)?,
        opened_on: row.get(6)?,
        expiration: row.get(7)?,
        status: parse_text_column(row, 8)?,
        realized_pl: row.get(9)?,
        return_percent: row.get(10)?,
        max_loss: row.get(11)?,
        max_profit: row.get(12)?,
        notes: row.get(13)?,
        import_fingerprint: row.get(14)?,
        import_source: row.get(15)?,
        import_batch_id: row.get(16)?,
        raw_row: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
        deleted_at: row.get(20)?,
    })
}

pub(crate) fn insert_trade(conn: &Connection, trade: &Trade) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRADE_COLUMNS
        ),
        params![
            trade.id,
            trade.thesis_id,
            trade.symbol,
            trade.strategy_type.map(|t| t.as_str()),
            trade.strategy_name,
            trade.legs,
            trade.opened_on,
            trade.expiration,
            trade.status.as_str(),
            trade.realized_pl,
            trade.return_percent,
            trade.max_loss,
            trade.max_profit,
            trade.notes,
            trade.import_fingerprint,
            trade.import_source,
            trade.import_batch_id,
            trade.raw_row,
            trade.created_at,
            trade.updated_at,
            trade.deleted_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn read_trade(conn: &Connection, id: &str) -> Result<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
        [id],
        map_row_to_trade,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => JournalError::NotFound(format!("Trade {}", id)),
        other => other.into(),
    })
}

pub async fn get_trades(db: &Database, filters: Option<TradeFilters>) -> Result<Vec<Trade>> {
    let conn = db.conn.lock()?;

    let mut query = format!("SELECT {} FROM trades WHERE deleted_at IS NULL", TRADE_COLUMNS);
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(f) = &filters {
        if let Some(status) = f.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(symbol) = &f.symbol {
            conditions.push("symbol LIKE ?");
            params.push(Box::new(format!("%{}%", symbol)));
        }
        if let Some(strategy_type) = f.strategy_type {
            conditions.push("strategy_type = ?");
            params.push(Box::new(strategy_type.as_str()));
        }
        if let Some(thesis_id) = &f.thesis_id {
            conditions.push("thesis_id = ?");
            params.push(Box::new(thesis_id.clone()));
        }
        if let Some(start_date) = &f.start_date {
            conditions.push("opened_on >= ?");
            params.push(Box::new(start_date.clone()));
        }
        if let Some(end_date) = &f.end_date {
            conditions.push("opened_on <= ?");
            params.push(Box::new(end_date.clone()));
        }
    }

    if !conditions.is_empty() {
        query.push_str(&format!(" AND {}", conditions.join(" AND ")));
    }

    query.push_str(" ORDER BY opened_on DESC, created_at DESC");

    if let Some(f) = &filters {
        if let (Some(page), Some(limit)) = (f.page, f.limit) {
            let offset = (page.max(1) - 1) * limit;
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(limit));
            params.push(Box::new(offset));
        }
    }

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(trades)
}

pub async fn get_trade(db: &Database, id: String) -> Result<Trade> {
    let conn = db.conn.lock()?;
    read_trade(&conn, &id)
}

/// An empty `thesis_id` detaches the trade from its thesis.
pub async fn update_trade(db: &Database, id: String, input: UpdateTradeInput) -> Result<Trade> {
    let conn = db.conn.lock()?;

    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = input.status {
        updates.push("status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(pl) = input.realized_pl {
        updates.push("realized_pl = ?");
        values.push(Box::new(pl));
    }
    if let Some(notes) = input.notes {
        updates.push("notes = ?");
        values.push(Box::new(notes));
    }
    if let Some(thesis_id) = input.thesis_id {
        if thesis_id.is_empty() {
            updates.push("thesis_id = NULL");
        } else {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM theses WHERE id = ?)",
                [&thesis_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(JournalError::NotFound(format!("Thesis {}", thesis_id)));
            }
            updates.push("thesis_id = ?");
            values.push(Box::new(thesis_id));
        }
    }
    if let Some(expiration) = input.expiration {
        updates.push("expiration = ?");
        values.push(Box::new(expiration));
    }

    updates.push("updated_at = ?");
    values.push(Box::new(Utc::now().timestamp()));
    values.push(Box::new(id.clone()));

    let query = format!(
        "UPDATE trades SET {} WHERE id = ? AND deleted_at IS NULL",
        updates.join(", ")
    );
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    if conn.execute(&query, params.as_slice())? == 0 {
        return Err(JournalError::NotFound(format!("Trade {}", id)));
    }

    read_trade(&conn, &id)
}

/// Soft delete: the trade moves to the trash and can be restored.
pub async fn delete_trade(db: &Database, id: String) -> Result<()> {
    let conn = db.conn.lock()?;
    let now = Utc::now().timestamp();
    let affected = conn.execute(
        "UPDATE trades SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        params![now, now, id],
    )?;
    if affected == 0 {
        return Err(JournalError::NotFound(format!("Trade {}", id)));
    }
    log::info!("Moved trade {} to trash", id);
    Ok(())
}

pub async fn restore_trade(db: &Database, id: String) -> Result<Trade> {
    let conn = db.conn.lock()?;
    let affected = conn.execute(
        "UPDATE trades SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
        params![Utc::now().timestamp(), id],
    )?;
    if affected == 0 {
        return Err(JournalError::NotFound(format!("Deleted trade {}", id)));
    }
    read_trade(&conn, &id)
}

pub async fn get_deleted_trades(db: &Database) -> Result<Vec<Trade>> {
    let conn = db.conn.lock()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([], map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(trades)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{StrategyType, TradeStatus};

    pub(crate) fn sample_trade(id: &str, symbol: &str, opened_on: &str, pl: Option<f64>) -> Trade {
        Trade {
            id: id.to_string(),
            thesis_id: None,
            symbol: symbol.to_string(),
            strategy_type: Some(StrategyType::IronCondor),
            strategy_name: "Iron Condor".to_string(),
            legs: String::new(),
            opened_on: opened_on.to_string(),
            expiration: None,
            status: if pl.is_some() { TradeStatus::Closed } else { TradeStatus::Open },
            realized_pl: pl,
            return_percent: None,
            max_loss: None,
            max_profit: None,
            notes: String::new(),
            import_fingerprint: None,
            import_source: "USER_CREATED".to_string(),
            import_batch_id: None,
            raw_row: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            deleted_at: None,
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        {
            let conn = db.conn.lock().unwrap();
            insert_trade(&conn, &sample_trade("t1", "AAPL", "2024-01-15", Some(150.0))).unwrap();
            insert_trade(&conn, &sample_trade("t2", "MSFT", "2024-02-01", Some(-40.0))).unwrap();
            insert_trade(&conn, &sample_trade("t3", "AAPL", "2024-03-10", None)).unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_get_trades_filters() {
        let db = seeded();

        let all = get_trades(&db, None).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["t3", "t2", "t1"]
        );

        let aapl = get_trades(
            &db,
            Some(TradeFilters {
                symbol: Some("AAPL".to_string()),
                status: Some(TradeStatus::Closed),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].id, "t1");

        let range = get_trades(
            &db,
            Some(TradeFilters {
                start_date: Some("2024-02-01".to_string()),
                end_date: Some("2024-02-28".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].symbol, "MSFT");

        let page = get_trades(
            &db,
            Some(TradeFilters {
                page: Some(2),
                limit: Some(2),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "t1");
    }

    #[tokio::test]
    async fn test_trade_round_trips_through_storage() {
        let db = seeded();
        let trade = get_trade(&db, "t1".to_string()).await.unwrap();
        assert_eq!(trade.strategy_type, Some(StrategyType::IronCondor));
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.realized_pl, Some(150.0));
    }

    #[tokio::test]
    async fn test_update_trade() {
        let db = seeded();
        let updated = update_trade(
            &db,
            "t3".to_string(),
            UpdateTradeInput {
                status: Some(TradeStatus::Closed),
                realized_pl: Some(75.5),
                notes: Some("rolled out".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.status, TradeStatus::Closed);
        assert_eq!(updated.realized_pl, Some(75.5));
        assert_eq!(updated.notes, "rolled out");
        assert!(updated.updated_at > 1_700_000_000);
    }

    #[tokio::test]
    async fn test_update_with_unknown_thesis_fails() {
        let db = seeded();
        let err = update_trade(
            &db,
            "t1".to_string(),
            UpdateTradeInput {
                thesis_id: Some("missing".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let db = seeded();

        delete_trade(&db, "t2".to_string()).await.unwrap();
        assert_eq!(get_trades(&db, None).await.unwrap().len(), 2);

        let trash = get_deleted_trades(&db).await.unwrap();
        assert_eq!(trash.len(), 1);
        assert!(trash[0].deleted_at.is_some());

        assert!(matches!(
            delete_trade(&db, "t2".to_string()).await,
            Err(JournalError::NotFound(_))
        ));

        let restored = restore_trade(&db, "t2".to_string()).await.unwrap();
        assert!(restored.deleted_at.is_none());
        assert_eq!(get_trades(&db, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_trade() {
        let db = seeded();
        assert!(matches!(
            get_trade(&db, "nope".to_string()).await,
            Err(JournalError::NotFound(_))
        ));
    }
}
