//! Database failures and their machine-readable codes.

use std::fmt;
use std::io;

use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// The classes of database failure the services tell apart.
///
/// Derived from the MySQL server error number or, for failures before a
/// server answered, from the driver error.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    /// `ER_DUP_ENTRY` — a unique key already holds the value.
    DuplicateKey,
    /// `ER_NO_SUCH_TABLE`.
    NoSuchTable,
    /// The server refused the TCP connection, or the pool timed out without
    /// a single open connection.
    ConnectionRefused,
    /// `ER_BAD_DB_ERROR` — unknown database.
    BadDatabase,
    /// `ER_ACCESS_DENIED_ERROR` / `ER_DBACCESS_DENIED_ERROR`.
    AccessDenied,
    /// `ER_PARSE_ERROR`.
    ParseError,
    Other,
}

impl ErrorCode {
    /// Maps a MySQL server error number.
    pub fn from_mysql_number(number: u16) -> Self {
        match number {
            1062 => Self::DuplicateKey,
            1146 => Self::NoSuchTable,
            1049 => Self::BadDatabase,
            1044 | 1045 => Self::AccessDenied,
            1064 => Self::ParseError,
            _ => Self::Other,
        }
    }

    /// Maps a driver error.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map_or(Self::Other, |e| Self::from_mysql_number(e.number())),
            sqlx::Error::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Self::ConnectionRefused
            }
            sqlx::Error::PoolTimedOut => Self::ConnectionRefused,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateKey      => "ER_DUP_ENTRY",
            Self::NoSuchTable       => "ER_NO_SUCH_TABLE",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::BadDatabase       => "ER_BAD_DB_ERROR",
            Self::AccessDenied      => "ER_ACCESS_DENIED_ERROR",
            Self::ParseError        => "ER_PARSE_ERROR",
            Self::Other             => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed database operation.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct DbError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<sqlx::Error>,
}

impl DbError {
    /// An error with no driver error behind it.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), source: None }
    }

    /// Keeps the driver error but overrides its derived code.
    pub(crate) fn with_code(code: ErrorCode, err: sqlx::Error) -> Self {
        Self { code, message: err.to_string(), source: Some(err) }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        Self {
            code: ErrorCode::from_sqlx(&err),
            message: err.to_string(),
            source: Some(err),
        }
    }
}
