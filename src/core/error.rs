//! Error types for the storage layer
//!
//! Every failure surfaced by the crate is a [`DatabaseError`]. Variants fall
//! into five families (see [`ErrorKind`]): connection, translation, execution,
//! data and contract. Wrapping variants keep their cause reachable through
//! [`std::error::Error::source`] so callers can classify a failure at any
//! depth of the chain.

use std::num::ParseIntError;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Opaque error produced by a backend driver
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a [`DatabaseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Establishing or holding the pool failed
    Connection,
    /// A builder could not produce SQL
    Translation,
    /// The statement could not be run
    Execution,
    /// Rows came back but could not be interpreted
    Data,
    /// A statement ran but broke a caller expectation
    Contract,
}

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    // ---- connection ----
    /// Pool creation failed
    #[error("db connection failed: {0}")]
    ConnectionFailed(#[source] Box<DatabaseError>),

    /// Pool creation did not finish in time
    #[error("db connection timed out: {0}")]
    ConnectionTimeout(#[source] Box<DatabaseError>),

    /// No pool is held by the facade
    #[error("db connection is invalid")]
    ConnectionInvalid,

    // ---- translation ----
    /// A builder rejected its input
    #[error("failed to generate sql query: {0}")]
    TranslationFailed(#[source] Box<DatabaseError>),

    #[error("invalid table for sql query")]
    InvalidTable,

    #[error("invalid property for sql query")]
    InvalidProp,

    #[error("duplicated property for sql query: {0}")]
    DuplicatedProp(String),

    #[error("invalid column for sql query")]
    InvalidColumn,

    #[error("duplicated column for sql query: {0}")]
    DuplicatedColumn(String),

    #[error("no property set for sql select query")]
    NoPropInSelectQuery,

    #[error("no column set for sql insert query")]
    NoColumnInInsertQuery,

    #[error("no column set for sql update query")]
    NoColumnInUpdateQuery,

    #[error("invalid filter for sql query")]
    InvalidFilter,

    #[error("invalid script for sql query")]
    InvalidScript,

    #[error("invalid comparison key for sql query")]
    InvalidComparisonKey,

    #[error("no comparison values set for sql query")]
    NoValuesInComparison,

    /// A value could not be rendered as a SQL literal
    #[error("failed to serialize sql value: {0}")]
    Serialization(#[from] serde_json::Error),

    // ---- execution ----
    /// The query could not be built before being sent
    #[error("failed to create database request: {0}")]
    RequestCreationFailed(#[source] Box<DatabaseError>),

    /// The backend rejected or failed the statement
    #[error("failed to query data from database: {0}")]
    RequestFailed(#[source] Box<DatabaseError>),

    /// The backend did not answer in time
    #[error("database request timed out: {0}")]
    RequestTimeout(#[source] Box<DatabaseError>),

    #[error("invalid sql query")]
    InvalidQuery,

    /// The executor gave up waiting on a unit of work
    #[error("process didn't finish after {timeout_ms}ms")]
    DeadlineExceeded { timeout_ms: u64 },

    /// The caller's context was cancelled while waiting
    #[error("process was cancelled")]
    Cancelled,

    /// Driver-level failure from a custom backend
    #[error("backend error: {0}")]
    Backend(#[source] BoxError),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] tokio_postgres::Error),

    /// Pool management error
    #[error("pool error: {0}")]
    Pool(String),

    // ---- data ----
    #[error("no rows returned by database")]
    NoRowsReturned,

    #[error("multiple values for expected unique database entry")]
    MultiValuedElement,

    /// Rows could not be mapped onto the expected shape
    #[error("failed to interpret data from database: {0}")]
    CorruptedData(#[source] Box<DatabaseError>),

    /// A row parser rejected a row
    #[error("failed to parse sql row: {0}")]
    RowParsingFailed(#[source] Box<DatabaseError>),

    #[error("invalid command tag {tag:?}")]
    InvalidCommandTag {
        tag: String,
        #[source]
        source: Option<ParseIntError>,
    },

    #[error("unknown command tag {0:?}")]
    UnknownCommandTag(String),

    /// Type conversion error
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    // ---- contract ----
    #[error("expected exactly one affected row, got {affected}")]
    NotExactlyOneRowAffected { affected: u64 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Wrap a builder failure
    pub fn translation(cause: DatabaseError) -> Self {
        DatabaseError::TranslationFailed(Box::new(cause))
    }

    /// Wrap an arbitrary driver error
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DatabaseError::Backend(Box::new(err))
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        DatabaseError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// Family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        use DatabaseError::*;
        match self {
            ConnectionFailed(_) | ConnectionTimeout(_) | ConnectionInvalid => ErrorKind::Connection,
            TranslationFailed(_)
            | InvalidTable
            | InvalidProp
            | DuplicatedProp(_)
            | InvalidColumn
            | DuplicatedColumn(_)
            | NoPropInSelectQuery
            | NoColumnInInsertQuery
            | NoColumnInUpdateQuery
            | InvalidFilter
            | InvalidScript
            | InvalidComparisonKey
            | NoValuesInComparison
            | Serialization(_) => ErrorKind::Translation,
            NoRowsReturned
            | MultiValuedElement
            | CorruptedData(_)
            | RowParsingFailed(_)
            | InvalidCommandTag { .. }
            | UnknownCommandTag(_)
            | TypeMismatch { .. }
            | ColumnNotFound(_) => ErrorKind::Data,
            NotExactlyOneRowAffected { .. } => ErrorKind::Contract,
            _ => ErrorKind::Execution,
        }
    }

    /// Directly wrapped storage error, if this variant wraps one
    pub fn cause(&self) -> Option<&DatabaseError> {
        use DatabaseError::*;
        match self {
            ConnectionFailed(inner)
            | ConnectionTimeout(inner)
            | TranslationFailed(inner)
            | RequestCreationFailed(inner)
            | RequestFailed(inner)
            | RequestTimeout(inner)
            | CorruptedData(inner)
            | RowParsingFailed(inner) => Some(inner),
            _ => None,
        }
    }

    /// Innermost storage error of the wrapping chain
    pub fn root_cause(&self) -> &DatabaseError {
        let mut current = self;
        while let Some(next) = current.cause() {
            current = next;
        }
        current
    }

    /// Whether a deadline was hit anywhere in the chain
    pub fn is_timeout(&self) -> bool {
        let mut current = Some(self);
        while let Some(err) = current {
            if matches!(
                err,
                DatabaseError::DeadlineExceeded { .. }
                    | DatabaseError::ConnectionTimeout(_)
                    | DatabaseError::RequestTimeout(_)
            ) {
                return true;
            }
            current = err.cause();
        }
        false
    }
}
