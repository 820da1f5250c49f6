//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections from a `StoreConfig`.
//! - Bootstrap the registered entity schema in deterministic order.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Callers never see a connection whose bootstrap did not succeed.

use crate::config::ConfigError;
use crate::schema::SchemaError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_connection, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Config(ConfigError),
    Schema(SchemaError),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A previous holder of the connection panicked mid-operation.
    ConnectionPoisoned,
    /// The shared in-memory connection stayed held past the busy timeout.
    ConnectionBusy {
        waited_ms: u128,
    },
    NoSuchColumn(String),
    Conversion {
        column: String,
        message: String,
    },
    /// Merge target carries an id the store has never assigned.
    UnknownIdentity {
        table: String,
        id: i64,
    },
    MissingPrimaryKey(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ConnectionPoisoned => write!(f, "store connection is poisoned"),
            Self::ConnectionBusy { waited_ms } => write!(
                f,
                "store connection is held by another connection or session (waited {waited_ms} ms)"
            ),
            Self::NoSuchColumn(column) => write!(f, "result row has no column `{column}`"),
            Self::Conversion { column, message } => {
                write!(f, "cannot convert column `{column}`: {message}")
            }
            Self::UnknownIdentity { table, id } => {
                write!(f, "no row with id {id} exists in `{table}`")
            }
            Self::MissingPrimaryKey(table) => {
                write!(f, "insert into `{table}` did not report a primary key")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::ConnectionPoisoned
            | Self::ConnectionBusy { .. }
            | Self::NoSuchColumn(_)
            | Self::Conversion { .. }
            | Self::UnknownIdentity { .. }
            | Self::MissingPrimaryKey(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SchemaError> for DbError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}
