//! SQLite storage bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections from a [`StoreConfig`].
//! - Ensure every table of a finalized model exists with all its columns.
//!
//! # Invariants
//! - No entity data is read or written before `ensure_created` succeeds.
//! - Existing tables missing a schema column are reported, never altered.
//!
//! [`StoreConfig`]: crate::config::StoreConfig

use std::error::Error;
use std::fmt::{Display, Formatter};

mod ensure;
mod open;

pub use ensure::ensure_created;
pub use open::open_store;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    SchemaMismatch {
        table: &'static str,
        missing_column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaMismatch {
                table,
                missing_column,
            } => write!(
                f,
                "existing table {table} has no column `{missing_column}` required by the model"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
