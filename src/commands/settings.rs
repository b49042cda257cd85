use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{Settings, UpdateSettingsInput};
use rusqlite::Connection;

pub(crate) fn read_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, max_upload_bytes, allow_duplicate_imports, currency, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                max_upload_bytes: row.get(1)?,
                allow_duplicate_imports: row.get::<_, i32>(2)? == 1,
                currency: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )?;

    Ok(settings)
}

pub async fn get_settings(db: &Database) -> Result<Settings> {
    let conn = db.conn.lock()?;
    read_settings(&conn)
}

pub async fn update_settings(db: &Database, settings: UpdateSettingsInput) -> Result<Settings> {
    if let Some(limit) = settings.max_upload_bytes {
        if limit <= 0 {
            return Err(JournalError::InvalidInput(format!(
                "max_upload_bytes must be positive, got {}",
                limit
            )));
        }
    }
    if let Some(currency) = &settings.currency {
        if currency.trim().is_empty() {
            return Err(JournalError::InvalidInput("currency cannot be empty".to_string()));
        }
    }

    let conn = db.conn.lock()?;

    // Build dynamic UPDATE query
    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(val) = settings.max_upload_bytes {
        updates.push("max_upload_bytes = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = settings.allow_duplicate_imports {
        updates.push("allow_duplicate_imports = ?");
        values.push(Box::new(val as i32));
    }
    if let Some(val) = settings.currency {
        updates.push("currency = ?");
        values.push(Box::new(val.trim().to_uppercase()));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&query, params.as_slice())?;

    read_settings(&conn)
}
