//! Façade error taxonomy.

use crate::db::DbError;
use crate::schema::SchemaError;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-originated failures as seen by façade callers.
///
/// The underlying `DbError` is always kept and exposed through `source()`.
#[derive(Debug)]
pub enum RepoError {
    /// Non-null, check, unique or declared length constraint rejected a write.
    ConstraintViolation(DbError),
    /// A foreign key points at a row that does not exist.
    ReferentialIntegrity(DbError),
    /// Store unreachable, unopenable, locked or the connection is unusable.
    Connectivity(DbError),
    /// Any other store failure.
    Db(DbError),
    /// Persisted rows cannot be turned into entities.
    InvalidData(String),
}

impl RepoError {
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::ConstraintViolation(err)
            | Self::ReferentialIntegrity(err)
            | Self::Connectivity(err)
            | Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::ReferentialIntegrity(_) => "referential_integrity",
            Self::Connectivity(_) => "connectivity",
            Self::Db(_) => "db_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::ReferentialIntegrity(err) => write!(f, "referential integrity error: {err}"),
            Self::Connectivity(err) => write!(f, "store connectivity error: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.db_error() {
            Some(err) => Some(err),
            None => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        classify(&value)(value)
    }
}

fn classify(err: &DbError) -> fn(DbError) -> RepoError {
    match err {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => match failure.code {
            ErrorCode::ConstraintViolation
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                RepoError::ReferentialIntegrity
            }
            ErrorCode::ConstraintViolation => RepoError::ConstraintViolation,
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::PermissionDenied => RepoError::Connectivity,
            _ => RepoError::Db,
        },
        DbError::ConnectionPoisoned | DbError::ConnectionBusy { .. } => RepoError::Connectivity,
        DbError::NoSuchColumn(_) | DbError::Conversion { .. } => {
            |err: DbError| RepoError::InvalidData(err.to_string())
        }
        _ => RepoError::Db,
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Db(DbError::Schema(value))
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;
    use crate::db::DbError;
    use rusqlite::{ffi, ErrorCode};

    fn failure(extended_code: i32) -> DbError {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(
            ffi::Error::new(extended_code),
            None,
        ))
    }

    #[test]
    fn foreign_key_failures_are_referential_integrity() {
        let err = RepoError::from(failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY));
        assert!(matches!(err, RepoError::ReferentialIntegrity(_)));
        assert_eq!(err.code(), "referential_integrity");
    }

    #[test]
    fn other_constraint_failures_are_constraint_violations() {
        for code in [
            ffi::SQLITE_CONSTRAINT_CHECK,
            ffi::SQLITE_CONSTRAINT_NOTNULL,
            ffi::SQLITE_CONSTRAINT_UNIQUE,
        ] {
            let err = RepoError::from(failure(code));
            assert!(matches!(err, RepoError::ConstraintViolation(_)), "{code}");
        }
    }

    #[test]
    fn open_and_lock_failures_are_connectivity() {
        assert!(matches!(
            RepoError::from(failure(ffi::SQLITE_CANTOPEN)),
            RepoError::Connectivity(_)
        ));
        assert!(matches!(
            RepoError::from(DbError::ConnectionPoisoned),
            RepoError::Connectivity(_)
        ));
        assert!(matches!(
            RepoError::from(DbError::ConnectionBusy { waited_ms: 50 }),
            RepoError::Connectivity(_)
        ));
    }

    #[test]
    fn classification_keeps_the_original_error() {
        let err = RepoError::from(failure(ffi::SQLITE_CONSTRAINT_CHECK));
        match err.db_error() {
            Some(DbError::Sqlite(rusqlite::Error::SqliteFailure(inner, _))) => {
                assert_eq!(inner.code, ErrorCode::ConstraintViolation);
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }
}
