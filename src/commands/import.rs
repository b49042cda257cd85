use crate::commands::settings::read_settings;
use crate::commands::theses::insert_thesis;
use crate::commands::trades::insert_trade;
use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::import::{CsvImportParser, import_fingerprint};
use crate::models::{
    CsvFormat, ParseResult, ParsedTrade, ThesisAssignment, ThesisChoice, Trade,
};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const IMPORT_SOURCE_CSV: &str = "CSV_IMPORT";

/// Trades the user picked from a preview, sent back for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmImportInput {
    pub format: CsvFormat,
    pub trades: Vec<ParsedTrade>,
    pub selected_trade_ids: Vec<String>,
    #[serde(default)]
    pub thesis_assignments: Vec<ThesisAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: String,
    pub imported: usize,
    pub duplicates: usize,
    pub skipped_invalid: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub source_format: String,
    pub imported: i64,
    pub duplicates: i64,
    pub skipped_invalid: i64,
    pub created_at: i64,
}

/// Parse an uploaded CSV for review. Nothing is written.
pub async fn preview_csv_import(db: &Database, csv_content: String) -> Result<ParseResult> {
    let settings = {
        let conn = db.conn.lock()?;
        read_settings(&conn)?
    };

    if csv_content.len() as i64 > settings.max_upload_bytes {
        log::warn!(
            "Rejected CSV upload of {} bytes (limit {})",
            csv_content.len(),
            settings.max_upload_bytes
        );
        return Err(JournalError::UploadTooLarge {
            size: csv_content.len(),
            limit: settings.max_upload_bytes,
        });
    }

    Ok(CsvImportParser::new().parse(&csv_content))
}

/// Persist the selected trades from a preview in one transaction.
pub async fn confirm_csv_import(db: &Database, input: ConfirmImportInput) -> Result<ImportResult> {
    if input.format == CsvFormat::Unknown {
        return Err(JournalError::InvalidInput(
            "Cannot import trades from an unrecognized CSV format".to_string(),
        ));
    }

    let conn = db.conn.lock()?;
    let settings = read_settings(&conn)?;

    let selected: HashSet<&str> = input.selected_trade_ids.iter().map(String::as_str).collect();
    let assignments: HashMap<&str, &ThesisChoice> = input
        .thesis_assignments
        .iter()
        .map(|a| (a.trade_id.as_str(), &a.thesis))
        .collect();

    let batch_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();
    let mut imported = 0;
    let mut duplicates = 0;
    let mut skipped_invalid = 0;
    let mut errors = Vec::new();
    // Lowercased thesis name -> id, so one confirmation creates each new thesis once
    let mut created_theses: HashMap<String, String> = HashMap::new();

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO import_batches (id, source_format, imported, duplicates, skipped_invalid, created_at)
         VALUES (?, ?, 0, 0, 0, ?)",
        params![batch_id, input.format.as_str(), now],
    )?;

    for trade in input.trades.iter().filter(|t| selected.contains(t.id.as_str())) {
        let Some(date) = trade.date.filter(|_| trade.is_valid) else {
            skipped_invalid += 1;
            errors.push(format!("Row {}: skipped, trade is not valid", trade.row_number));
            continue;
        };

        let fingerprint = import_fingerprint(input.format, trade);

        if !settings.allow_duplicate_imports && fingerprint_exists(&tx, &fingerprint)? {
            duplicates += 1;
            continue;
        }

        let thesis_id = match assignments.get(trade.id.as_str()) {
            Some(choice) => {
                match resolve_thesis(&tx, choice, &trade.symbol, &mut created_theses) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        errors.push(format!("Row {}: {}", trade.row_number, e));
                        None
                    }
                }
            }
            None => None,
        };

        let stored = Trade {
            id: uuid::Uuid::new_v4().to_string(),
            thesis_id,
            symbol: trade.symbol.clone(),
            strategy_type: trade.strategy_type,
            strategy_name: trade.strategy_name.clone(),
            legs: trade.legs.clone(),
            opened_on: date.format("%Y-%m-%d").to_string(),
            expiration: trade.expiration.clone(),
            status: trade.status,
            realized_pl: trade.realized_pl,
            return_percent: trade.return_percent,
            max_loss: trade.max_loss,
            max_profit: trade.max_profit,
            notes: String::new(),
            import_fingerprint: Some(fingerprint),
            import_source: IMPORT_SOURCE_CSV.to_string(),
            import_batch_id: Some(batch_id.clone()),
            raw_row: Some(serde_json::to_string(&trade.raw_row)?),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        insert_trade(&tx, &stored)?;
        imported += 1;
    }

    tx.execute(
        "UPDATE import_batches SET imported = ?, duplicates = ?, skipped_invalid = ? WHERE id = ?",
        params![imported as i64, duplicates as i64, skipped_invalid as i64, batch_id],
    )?;
    tx.commit()?;

    log::info!(
        "Imported {} {} trades in batch {} ({} duplicates, {} invalid skipped)",
        imported,
        input.format,
        batch_id,
        duplicates,
        skipped_invalid
    );

    Ok(ImportResult {
        batch_id,
        imported,
        duplicates,
        skipped_invalid,
        errors,
    })
}

fn fingerprint_exists(conn: &Connection, fingerprint: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM trades WHERE import_fingerprint = ? AND deleted_at IS NULL)",
        [fingerprint],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn resolve_thesis(
    conn: &Connection,
    choice: &ThesisChoice,
    ticker: &str,
    created: &mut HashMap<String, String>,
) -> Result<String> {
    match choice {
        ThesisChoice::Existing { thesis_id } => {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM theses WHERE id = ?)",
                [thesis_id],
                |row| row.get(0),
            )?;
            if exists {
                Ok(thesis_id.clone())
            } else {
                Err(JournalError::NotFound(format!("Thesis {}", thesis_id)))
            }
        }
        ThesisChoice::New { name, direction } => {
            let key = name.trim().to_lowercase();
            if let Some(id) = created.get(&key) {
                return Ok(id.clone());
            }
            let thesis = insert_thesis(conn, name, ticker, *direction)?;
            created.insert(key, thesis.id.clone());
            Ok(thesis.id)
        }
    }
}

pub async fn get_import_history(db: &Database) -> Result<Vec<ImportBatch>> {
    let conn = db.conn.lock()?;
    let mut stmt = conn.prepare(
        "SELECT id, source_format, imported, duplicates, skipped_invalid, created_at
         FROM import_batches ORDER BY created_at DESC, rowid DESC",
    )?;
    let batches = stmt
        .query_map([], |row| {
            Ok(ImportBatch {
                id: row.get(0)?,
                source_format: row.get(1)?,
                imported: row.get(2)?,
                duplicates: row.get(3)?,
                skipped_invalid: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(batches)
}

/// Permanently removes every CSV-imported trade and the import history.
pub async fn delete_csv_imported_trades(db: &Database) -> Result<usize> {
    let conn = db.conn.lock()?;
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute("DELETE FROM trades WHERE import_source = ?", [IMPORT_SOURCE_CSV])?;
    tx.execute("DELETE FROM import_batches", [])?;
    tx.commit()?;

    log::info!("Deleted {} CSV-imported trades", deleted);
    Ok(deleted)
}
