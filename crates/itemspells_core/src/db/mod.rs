//! Document database bootstrap.
//!
//! The SQLite file behind `SqliteDocumentStore` holds one `documents` table:
//! world, compendium and actor-owned items as JSON rows keyed by uuid.
//!
//! # Invariants
//! - The file's schema generation lives in `PRAGMA user_version`.
//! - A store is only handed a connection whose schema is current.
//! - Files written by a newer schema generation are refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to bring a document database to the current schema.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the document store.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "document database: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "document database uses schema {found}; this build reads up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
