use crate::db::migration_runner::MigrationRunner;
use rusqlite::{Connection, Result};
use std::sync::Mutex;

/// Shared handle to the journal database. Commands lock `conn` for the
/// duration of one operation.
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn, db_path)
    }

    /// Fully migrated database that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, ":memory:")
    }

    fn prepare(conn: Connection, db_path: &str) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let runner = MigrationRunner::new();
        log::info!("=== Starting database migration check ===");

        let applied = runner.run_pending_migrations(&conn, db_path)?;
        if applied > 0 {
            log::info!("Applied {} migrations successfully", applied);
        } else {
            log::info!("Database schema is up to date");
        }

        runner.verify_migrations(&conn)?;

        if let Some(version) = runner.get_current_version(&conn)? {
            log::info!("Final schema version: {}", version);
        }

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }
}
