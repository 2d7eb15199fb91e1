//! Base schema, schema-level migrations and connection setup.
//!
//! A database's schema level is its `user_version` pragma. Level 0 is the
//! base schema; every later level is one `rusqlite_migration` step, so
//! opening a file at level `n` applies exactly the steps it is missing.

use std::path::Path;

use rusqlite::{params, Connection, Transaction};
use rusqlite_migration::{HookResult, Migrations, M};

use crate::error::StorageError;

/// Tables present at every level.
pub const BASE_SCHEMA: &str = include_str!("migrations/000_base_schema.sql");

/// First level with a `guid` column on `runs`.
pub const GUID_LEVEL: u32 = 1;

/// First level with a `run_description` column on `runs`.
pub const RUN_DESCRIPTION_LEVEL: u32 = 3;

/// First level where `runs.snapshot` exists whether or not any run has one.
pub const SNAPSHOT_COLUMN_LEVEL: u32 = 5;

/// Highest defined level.
pub const LATEST_LEVEL: u32 = 5;

/// Steps from each level to the next, applied in order via `user_version`.
///
/// Step `n` takes a database from level `n` to `n + 1`, so the list starts
/// from the base schema rather than from an empty file.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("migrations/001_runs_guid.sql")),
        M::up(include_str!("migrations/002_runs_indices.sql")),
        M::up(include_str!("migrations/003_run_description.sql")),
        M::up(include_str!("migrations/004_run_description_fix.sql")),
        M::up_with_hook("", promote_snapshot_column),
    ])
}

/// Level 5: the snapshot column may already exist, added lazily by an
/// earlier writer.
fn promote_snapshot_column(tx: &Transaction<'_>) -> HookResult {
    if !column_in_table(tx, "runs", "snapshot")? {
        tx.execute_batch("ALTER TABLE runs ADD COLUMN snapshot TEXT")?;
    }
    Ok(())
}

/// Opens (or creates) a database at `path` and brings it to `level`.
pub fn open_database(path: impl AsRef<Path>, level: u32) -> Result<Connection, StorageError> {
    check_level(level)?;
    let mut conn = Connection::open(path)?;
    configure_and_migrate(&mut conn, level)?;
    Ok(conn)
}

/// Opens an in-memory database at `level`.
pub fn open_in_memory(level: u32) -> Result<Connection, StorageError> {
    check_level(level)?;
    let mut conn = Connection::open_in_memory()?;
    configure_and_migrate(&mut conn, level)?;
    Ok(conn)
}

fn check_level(level: u32) -> Result<(), StorageError> {
    if level > LATEST_LEVEL {
        return Err(StorageError::UnsupportedLevel {
            requested: level,
            latest: LATEST_LEVEL,
        });
    }
    Ok(())
}

/// Configures pragmas, creates the base schema, and applies pending levels.
fn configure_and_migrate(conn: &mut Connection, level: u32) -> Result<(), StorageError> {
    // Fixture files ship as single files, so keep the rollback journal
    // rather than leaving WAL sidecars next to them.
    conn.pragma_update(None, "journal_mode", "DELETE")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // Enable foreign key enforcement (off by default in SQLite).
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let current = user_version(conn)?;
    if current > level {
        return Err(StorageError::SchemaTooNew {
            found: current,
            requested: level,
        });
    }

    conn.execute_batch(BASE_SCHEMA)?;

    if current < level {
        migrations()
            .to_version(conn, level as usize)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::debug!(from = current, to = level, "upgraded schema level");
    }

    Ok(())
}

/// The `user_version` pragma, i.e. the schema level.
pub fn user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Whether `table` has a column named `column`.
pub fn column_in_table(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |row| row.get(0),
    )
}
