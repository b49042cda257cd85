use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{CreateThesisInput, Thesis, ThesisDirection, ThesisStatus};
use chrono::Utc;
use rusqlite::{Connection, params};

const THESIS_COLUMNS: &str = "id, name, ticker, direction, status, created_at, updated_at";

fn map_row_to_thesis(row: &rusqlite::Row) -> rusqlite::Result<Thesis> {
    let direction: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Thesis {
        id: row.get(0)?,
        name: row.get(1)?,
        ticker: row.get(2)?,
        direction: direction.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?,
        status: status.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn insert_thesis(
    conn: &Connection,
    name: &str,
    ticker: &str,
    direction: ThesisDirection,
) -> Result<Thesis> {
    let name = name.trim();
    if name.is_empty() {
        return Err(JournalError::InvalidInput("Thesis name cannot be empty".to_string()));
    }

    let now = Utc::now().timestamp();
    let thesis = Thesis {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        ticker: ticker.trim().to_uppercase(),
        direction,
        status: ThesisStatus::Active,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        &format!("INSERT INTO theses ({}) VALUES (?, ?, ?, ?, ?, ?, ?)", THESIS_COLUMNS),
        params![
            thesis.id,
            thesis.name,
            thesis.ticker,
            thesis.direction.as_str(),
            thesis.status.as_str(),
            thesis.created_at,
            thesis.updated_at,
        ],
    )?;

    Ok(thesis)
}

pub(crate) fn read_thesis(conn: &Connection, id: &str) -> Result<Thesis> {
    conn.query_row(
        &format!("SELECT {} FROM theses WHERE id = ?", THESIS_COLUMNS),
        [id],
        map_row_to_thesis,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => JournalError::NotFound(format!("Thesis {}", id)),
        other => other.into(),
    })
}

pub async fn create_thesis(db: &Database, input: CreateThesisInput) -> Result<Thesis> {
    let conn = db.conn.lock()?;
    insert_thesis(&conn, &input.name, &input.ticker, input.direction)
}

pub async fn get_theses(db: &Database, status: Option<ThesisStatus>) -> Result<Vec<Thesis>> {
    let conn = db.conn.lock()?;

    let mut query = format!("SELECT {} FROM theses", THESIS_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(status) = status {
        query.push_str(" WHERE status = ?");
        params.push(Box::new(status.as_str()));
    }
    query.push_str(" ORDER BY created_at DESC, name");

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let theses = stmt
        .query_map(param_refs.as_slice(), map_row_to_thesis)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(theses)
}

pub async fn get_thesis(db: &Database, id: String) -> Result<Thesis> {
    let conn = db.conn.lock()?;
    read_thesis(&conn, &id)
}

pub async fn update_thesis_status(db: &Database, id: String, status: ThesisStatus) -> Result<Thesis> {
    let conn = db.conn.lock()?;
    let affected = conn.execute(
        "UPDATE theses SET status = ?, updated_at = ? WHERE id = ?",
        params![status.as_str(), Utc::now().timestamp(), id],
    )?;
    if affected == 0 {
        return Err(JournalError::NotFound(format!("Thesis {}", id)));
    }
    read_thesis(&conn, &id)
}

/// Removes the thesis; its trades stay in the journal, unassigned.
pub async fn delete_thesis(db: &Database, id: String) -> Result<()> {
    let conn = db.conn.lock()?;
    let tx = conn.unchecked_transaction()?;

    let detached = tx.execute(
        "UPDATE trades SET thesis_id = NULL, updated_at = ? WHERE thesis_id = ?",
        params![Utc::now().timestamp(), id],
    )?;
    if tx.execute("DELETE FROM theses WHERE id = ?", [&id])? == 0 {
        return Err(JournalError::NotFound(format!("Thesis {}", id)));
    }
    tx.commit()?;

    log::info!("Deleted thesis {} and detached {} trades", id, detached);
    Ok(())
}
