//! Schema migrations for the user graph store.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations in one transaction.
//! - Confirm the graph tables exist before a connection is used.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult, StoreLocation};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "users_hobbies_friends",
    sql: include_str!("0001_init.sql"),
}];

/// Tables every repository query depends on.
pub const GRAPH_TABLES: &[&str] = &["users", "user_hobbies", "user_friends"];

/// Outcome of one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Names of the migrations applied, in order.
    pub applied: Vec<&'static str>,
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` to [`latest_version`] and checks the graph tables.
pub fn apply_migrations(
    conn: &mut Connection,
    location: &StoreLocation,
) -> DbResult<MigrationReport> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            location: location.clone(),
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let mut applied = Vec::new();
    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version);

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::Migration {
                location: location.clone(),
                version: migration.version,
                source,
            })?;
        applied.push(migration.name);
    }
    tx.commit()?;

    verify_graph_tables(conn, location)?;

    Ok(MigrationReport {
        from_version,
        to_version: latest,
        applied,
    })
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn verify_graph_tables(conn: &Connection, location: &StoreLocation) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
    )?;
    for &table in GRAPH_TABLES {
        let exists: i64 = stmt.query_row([table], |row| row.get(0))?;
        if exists == 0 {
            return Err(DbError::MissingTable {
                location: location.clone(),
                table,
            });
        }
    }
    Ok(())
}
