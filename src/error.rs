//! Error types for the database handle.
//!
//! Every failure that reaches the engine carries the engine's message and,
//! for query failures, the SQL text that triggered it.

use thiserror::Error;

/// Errors returned by [`Database`](crate::Database) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection could not be opened or initialised.
    #[error("database connection error{} on {database}: {message}", fmt_code(.code))]
    Connection {
        database: String,
        code: Option<i32>,
        message: String,
    },
    /// The engine rejected a statement.
    #[error("query error{}: {message} [sql: {sql}]", fmt_code(.code))]
    Query {
        sql: String,
        code: Option<i32>,
        message: String,
    },
    #[error("database handle is not connected")]
    NotConnected,
    #[error("database handle is already connected")]
    AlreadyConnected,
    #[error("no columns given for table {table}")]
    NoColumns { table: String },
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl Error {
    pub(crate) fn connection(database: &str, err: &rusqlite::Error) -> Self {
        Self::Connection {
            database: database.to_string(),
            code: extended_code(err),
            message: err.to_string(),
        }
    }

    pub(crate) fn query(sql: &str, err: &rusqlite::Error) -> Self {
        Self::Query {
            sql: sql.to_string(),
            code: extended_code(err),
            message: err.to_string(),
        }
    }

    /// SQL text that triggered the failure, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// SQLite extended result code, if the engine supplied one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Connection { code, .. } | Self::Query { code, .. } => *code,
            _ => None,
        }
    }
}

fn extended_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
