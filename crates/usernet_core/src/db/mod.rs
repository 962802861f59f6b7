//! SQLite storage bootstrap for the user graph store.
//!
//! # Responsibility
//! - Open file-backed or in-memory stores and bring them to the current schema.
//! - Report bootstrap failures together with the store they concern.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A connection is only handed out once every graph table exists.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, IN_MEMORY_PATH};

pub type DbResult<T> = Result<T, DbError>;

/// Where a store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Private in-memory store; dropped with its connection.
    Memory,
    /// SQLite file on disk.
    File(PathBuf),
}

impl StoreLocation {
    /// Resolves a configured path, treating [`IN_MEMORY_PATH`] as in-memory.
    pub fn from_path(path: &Path) -> Self {
        if path.as_os_str() == IN_MEMORY_PATH {
            Self::Memory
        } else {
            Self::File(path.to_path_buf())
        }
    }

    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "in-memory store"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Store bootstrap and statement errors.
#[derive(Debug)]
pub enum DbError {
    /// SQLite could not open the store.
    Open {
        location: StoreLocation,
        source: rusqlite::Error,
    },
    /// One migration script failed; the batch was rolled back.
    Migration {
        location: StoreLocation,
        version: u32,
        source: rusqlite::Error,
    },
    /// Store was migrated by a newer binary.
    UnsupportedSchemaVersion {
        location: StoreLocation,
        db_version: u32,
        latest_supported: u32,
    },
    /// Schema version claims to be current but a graph table is absent.
    MissingTable {
        location: StoreLocation,
        table: &'static str,
    },
    /// Statement failure after bootstrap.
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Store the error concerns, when known.
    pub fn location(&self) -> Option<&StoreLocation> {
        match self {
            Self::Open { location, .. }
            | Self::Migration { location, .. }
            | Self::UnsupportedSchemaVersion { location, .. }
            | Self::MissingTable { location, .. } => Some(location),
            Self::Sqlite(_) => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "failed to open {location}: {source}")
            }
            Self::Migration {
                location,
                version,
                source,
            } => write!(f, "migration {version} failed on {location}: {source}"),
            Self::UnsupportedSchemaVersion {
                location,
                db_version,
                latest_supported,
            } => write!(
                f,
                "{location} has schema version {db_version}, newer than supported {latest_supported}"
            ),
            Self::MissingTable { location, table } => {
                write!(f, "{location} is missing table `{table}`")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::MissingTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreLocation, IN_MEMORY_PATH};
    use std::path::{Path, PathBuf};

    #[test]
    fn memory_marker_resolves_to_memory_location() {
        assert_eq!(
            StoreLocation::from_path(Path::new(IN_MEMORY_PATH)),
            StoreLocation::Memory
        );
        assert_eq!(
            StoreLocation::from_path(Path::new("data/users.sqlite3")),
            StoreLocation::File(PathBuf::from("data/users.sqlite3"))
        );
    }
}
