//! SQLite bootstrap for the `users` and `todos` tables.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the number of applied migrations.
//! - A connection handed out by this module has passed [`schema::verify_schema`],
//!   so the active-username index is known to be unique and partial.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// A table or index the repositories rely on is absent or altered.
    SchemaMismatch {
        object: &'static str,
        problem: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "database schema v{found} was written by a newer todoapp (this build knows v{supported})"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration v{version} ({name}) failed: {source}"),
            Self::SchemaMismatch { object, problem } => {
                write!(f, "schema object `{object}` {problem}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
