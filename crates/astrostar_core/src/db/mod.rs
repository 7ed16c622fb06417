//! SQLite storage bootstrap and collection provisioning.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the `astrostar` store.
//! - Create one storage table per catalog collection, idempotently.
//! - Verify the on-disk layout matches the declared catalog.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Records must not be read or written before provisioning succeeds.
//! - Reference columns carry no `FOREIGN KEY` constraint; existence checks
//!   are a write-policy decision made above storage.
//! - Fields a collection does not declare live in one side table keyed by
//!   collection and record id.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod provision;

pub use open::{open_db, open_db_in_memory, open_db_with_report};
pub use provision::{provision, verify_catalog, ProvisionReport};

pub type DbResult<T> = Result<T, DbError>;

/// Side table holding undeclared fields as one JSON object per record.
pub(crate) const UNDECLARED_FIELDS_TABLE: &str = "undeclared_fields";

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A catalog collection has no storage table.
    MissingCollection(&'static str),
    /// A collection table lacks the column of a declared field.
    MissingField {
        collection: &'static str,
        field: &'static str,
    },
    /// A field column's type affinity differs from the declared type's.
    ColumnType {
        collection: &'static str,
        field: &'static str,
        expected: &'static str,
        found: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingCollection(name) => {
                write!(f, "collection `{name}` has no storage table")
            }
            Self::MissingField { collection, field } => write!(
                f,
                "collection `{collection}` has no storage column for field `{field}`"
            ),
            Self::ColumnType {
                collection,
                field,
                expected,
                found,
            } => write!(
                f,
                "collection `{collection}` stores field `{field}` as `{found}`, expected {expected} affinity"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::MissingCollection(_) => None,
            Self::MissingField { .. } => None,
            Self::ColumnType { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Quotes an SQL identifier. Needed for columns such as `type`.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
