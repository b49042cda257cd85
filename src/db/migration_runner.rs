use rusqlite::{Connection, OptionalExtension, Result, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

// Migrations run before a logger exists in tests; print there instead.
#[allow(unused_macros)]
macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(not(test))]
        {
            log::info!($($arg)*);
        }
        #[cfg(test)]
        {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

#[allow(unused_macros)]
macro_rules! log_error {
    ($($arg:tt)*) => {
        #[cfg(not(test))]
        {
            log::error!($($arg)*);
        }
        #[cfg(test)]
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}

#[allow(unused_macros)]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(not(test))]
        {
            log::warn!($($arg)*);
        }
        #[cfg(test)]
        {
            println!("[WARN] {}", format!($($arg)*));
        }
    };
}

const IN_MEMORY_PATH: &str = ":memory:";
const BACKUPS_TO_KEEP: usize = 5;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn new(version: u32, name: &'static str, sql: &'static str) -> Self {
        Self { version, name, sql }
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRunner {
    pub fn new() -> Self {
        Self {
            migrations: Self::collect_migrations(),
        }
    }

    fn collect_migrations() -> Vec<Migration> {
        vec![
            Migration::new(0, "bootstrap", include_str!("migrations/000_bootstrap.sql")),
            Migration::new(
                1,
                "initial_schema",
                include_str!("migrations/001_initial_schema.sql"),
            ),
            Migration::new(
                2,
                "add_import_batches",
                include_str!("migrations/002_add_import_batches.sql"),
            ),
            Migration::new(
                3,
                "add_soft_delete",
                include_str!("migrations/003_add_soft_delete.sql"),
            ),
        ]
    }

    /// Applies every migration newer than the recorded schema version and
    /// returns how many ran. File databases are backed up first.
    pub fn run_pending_migrations(&self, conn: &Connection, db_path: &str) -> Result<usize> {
        if !self.has_schema_migrations_table(conn)? {
            log_info!("No migration history found - bootstrapping migration system");
            self.bootstrap_existing_schema(conn)?;
        }

        let current_version = self.get_current_version(conn)?;
        log_info!("Current schema version: {:?}", current_version);

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| match current_version {
                Some(v) => m.version > v,
                None => m.version > 0,
            })
            .collect();

        let Some(target) = pending.last() else {
            return Ok(0);
        };

        log_info!("Found {} pending migrations", pending.len());

        let backup_path = if db_path == IN_MEMORY_PATH {
            None
        } else {
            let path = self.create_backup(db_path, target.version)?;
            log_info!("Backup created: {}", path.display());
            Some(path)
        };

        let mut applied = 0;
        for migration in pending {
            match self.apply_migration(conn, migration) {
                Ok(_) => {
                    applied += 1;
                    log_info!("Applied migration {}: {}", migration.version, migration.name);
                }
                Err(e) => {
                    log_error!("Migration {} failed: {}", migration.version, e);
                    log_error!("Migration stopped. Database rolled back to before this migration.");
                    if let Some(path) = &backup_path {
                        log_error!("Backup available at: {}", path.display());
                    }
                    return Err(e);
                }
            }
        }

        Ok(applied)
    }

    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> Result<()> {
        let start = SystemTime::now();

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;

        let execution_time = start
            .elapsed()
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, notes)
             VALUES (?, ?, ?, ?, ?, NULL)",
            params![
                migration.version,
                migration.name,
                current_timestamp(),
                migration.checksum(),
                execution_time
            ],
        )?;

        tx.commit()?;

        log_info!("Applied migration {} in {}ms", migration.name, execution_time);

        Ok(())
    }

    /// Fails if an applied migration's SQL changed since it ran.
    pub fn verify_migrations(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT version, name, checksum FROM schema_migrations WHERE checksum IS NOT NULL ORDER BY version",
        )?;

        let applied: Vec<(u32, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>>>()?;

        for (version, name, stored_checksum) in applied {
            if let Some(migration) = self.migrations.iter().find(|m| m.version == version) {
                let expected_checksum = migration.checksum();
                if stored_checksum != expected_checksum {
                    log_error!("Checksum mismatch for migration {} ({})", version, name);
                    log_error!("Expected: {}", expected_checksum);
                    log_error!("Actual:   {}", stored_checksum);
                    log_error!("Restore the original migration file or use a backup.");
                    return Err(rusqlite::Error::InvalidQuery);
                }
            }
        }

        Ok(())
    }

    pub fn get_current_version(&self, conn: &Connection) -> Result<Option<u32>> {
        if !self.has_schema_migrations_table(conn)? {
            return Ok(None);
        }

        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(version)
    }

    fn create_backup(&self, db_path: &str, target_version: u32) -> Result<PathBuf> {
        let db_path_buf = PathBuf::from(db_path);
        let db_dir = db_path_buf
            .parent()
            .ok_or_else(|| rusqlite::Error::InvalidPath(db_path_buf.clone()))?;

        let backup_dir = db_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|e| {
            log_error!("Failed to create backup directory: {}", e);
            sqlite_failure(format!("Failed to create backup directory: {}", e))
        })?;

        let backup_name = format!("pre_migration_v{}_{}.db", target_version, current_timestamp());
        let backup_path = backup_dir.join(&backup_name);

        let src = Connection::open(db_path)?;
        let mut dst = Connection::open(&backup_path)?;
        {
            let backup = rusqlite::backup::Backup::new(&src, &mut dst)?;
            backup.run_to_completion(5, std::time::Duration::from_millis(250), None)?;
        }

        let integrity: String = dst.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if integrity != "ok" {
            log_error!("Backup integrity check failed: {}", integrity);
            return Err(sqlite_failure(format!(
                "Backup integrity check failed: {}",
                integrity
            )));
        }

        self.cleanup_old_backups(&backup_dir)?;

        Ok(backup_path)
    }

    fn cleanup_old_backups(&self, backup_dir: &Path) -> Result<()> {
        let mut backups: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| {
                log_warn!("Failed to read backup directory: {}", e);
                sqlite_failure(format!("Failed to read backup directory: {}", e))
            })?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|s| s.to_str()) == Some("db")
                    && entry
                        .file_name()
                        .to_str()
                        .map(|s| s.starts_with("pre_migration_"))
                        .unwrap_or(false)
            })
            .collect();

        // Oldest first
        backups.sort_by_key(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        });

        if backups.len() > BACKUPS_TO_KEEP {
            for entry in backups.iter().take(backups.len() - BACKUPS_TO_KEEP) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log_warn!("Failed to delete old backup: {}", e);
                }
            }
        }

        Ok(())
    }

    fn has_schema_migrations_table(&self, conn: &Connection) -> Result<bool> {
        self.table_exists(conn, "schema_migrations")
    }

    fn table_exists(&self, conn: &Connection, table: &str) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// A database created before migration tracking: record the migrations
    /// its schema already reflects so they are not re-applied.
    fn bootstrap_existing_schema(&self, conn: &Connection) -> Result<()> {
        let existing_version = self.detect_existing_version(conn)?;
        log_info!("Detected existing schema version: {}", existing_version);

        self.apply_migration(conn, &self.migrations[0])?;

        let now = current_timestamp();
        for migration in self
            .migrations
            .iter()
            .filter(|m| m.version >= 1 && m.version <= existing_version)
        {
            conn.execute(
                "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, notes)
                 VALUES (?, ?, ?, NULL, 0, 'Pre-existing schema - detected via introspection')",
                params![migration.version, migration.name, now],
            )?;
            log_info!("Marked migration {} as already applied", migration.name);
        }

        let integrity: String = conn.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if integrity != "ok" {
            log_error!("Schema integrity check failed: {}", integrity);
            return Err(sqlite_failure(format!(
                "Schema integrity check failed: {}",
                integrity
            )));
        }

        Ok(())
    }

    fn detect_existing_version(&self, conn: &Connection) -> Result<u32> {
        // Newest marker first
        if self.column_exists(conn, "trades", "deleted_at")? {
            return Ok(3);
        }
        if self.column_exists(conn, "trades", "import_batch_id")? {
            return Ok(2);
        }
        if self.table_exists(conn, "trades")? {
            return Ok(1);
        }
        Ok(0)
    }

    fn column_exists(&self, conn: &Connection, table: &str, column: &str) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name=?",
            params![table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn sqlite_failure(message: String) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some(message))
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(conn: &Connection, table: &str) -> i32 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            params![table],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations_are_sequential() {
        let runner = MigrationRunner::new();
        for (i, m) in runner.migrations.iter().enumerate() {
            assert_eq!(m.version as usize, i, "Migration versions must be sequential");
        }
    }

    #[test]
    fn test_all_migrations_have_valid_sql() {
        let runner = MigrationRunner::new();
        let conn = Connection::open_in_memory().unwrap();

        for migration in &runner.migrations {
            conn.execute_batch(migration.sql)
                .unwrap_or_else(|e| panic!("Migration {} has invalid SQL: {}", migration.name, e));
        }
    }

    #[test]
    fn test_fresh_install() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();

        let runner = MigrationRunner::new();
        let applied = runner.run_pending_migrations(&conn, IN_MEMORY_PATH).unwrap();
        assert_eq!(applied, 3);
        assert_eq!(runner.get_current_version(&conn).unwrap(), Some(3));

        for table in ["schema_migrations", "settings", "theses", "trades", "import_batches"] {
            assert_eq!(table_count(&conn, table), 1, "Table {} should exist", table);
        }

        let max_upload: i64 = conn
            .query_row("SELECT max_upload_bytes FROM settings WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(max_upload, 5_242_880);
    }

    #[test]
    fn test_idempotency() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();

        assert!(runner.run_pending_migrations(&conn, IN_MEMORY_PATH).unwrap() > 0);
        assert_eq!(
            runner.run_pending_migrations(&conn, IN_MEMORY_PATH).unwrap(),
            0,
            "Should not apply any migrations on second run"
        );
    }

    #[test]
    fn test_migration_checksums() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();
        runner.run_pending_migrations(&conn, IN_MEMORY_PATH).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM schema_migrations WHERE checksum IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
        assert!(runner.verify_migrations(&conn).is_ok());

        conn.execute("UPDATE schema_migrations SET checksum = 'tampered' WHERE version = 2", [])
            .unwrap();
        assert!(runner.verify_migrations(&conn).is_err());
    }

    #[test]
    fn test_existing_schema_detection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("migrations/001_initial_schema.sql")).unwrap();
        conn.execute_batch(include_str!("migrations/002_add_import_batches.sql")).unwrap();

        let runner = MigrationRunner::new();
        assert_eq!(runner.detect_existing_version(&conn).unwrap(), 2);

        // Only the soft-delete migration remains
        assert_eq!(runner.run_pending_migrations(&conn, IN_MEMORY_PATH).unwrap(), 1);
        assert_eq!(runner.get_current_version(&conn).unwrap(), Some(3));
    }

    #[test]
    fn test_failed_migration_rollback() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();
        runner.apply_migration(&conn, &runner.migrations[0]).unwrap();
        runner.apply_migration(&conn, &runner.migrations[1]).unwrap();

        let bad_migration = Migration::new(2, "bad_migration", "INVALID SQL SYNTAX");
        assert!(runner.apply_migration(&conn, &bad_migration).is_err());

        assert_eq!(runner.get_current_version(&conn).unwrap(), Some(1));
    }

    #[test]
    fn test_file_database_gets_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("journal.db");
        let db_path = db_path.to_str().unwrap();

        let conn = Connection::open(db_path).unwrap();
        let runner = MigrationRunner::new();
        runner.run_pending_migrations(&conn, db_path).unwrap();

        let backups: Vec<_> = fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(
            backups[0]
                .file_name()
                .to_string_lossy()
                .starts_with("pre_migration_v3_")
        );
    }
}
