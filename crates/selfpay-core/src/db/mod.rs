//! Database layer for selfpay.

mod schema;
mod patients;
mod services;
mod payments;
mod magic_links;
mod insurance;
mod audit;

pub use schema::*;
#[allow(unused_imports)]
pub use patients::*;
pub use services::*;
pub use payments::*;
#[allow(unused_imports)]
pub use magic_links::*;
#[allow(unused_imports)]
pub use insurance::*;
pub use audit::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DbError {
    /// Whether this error is a SQLite uniqueness violation. The reconciler
    /// uses this to treat a duplicate payment insert as an idempotent replay
    /// rather than a failure.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Owned SQLite connection with the selfpay schema applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (and if needed create) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database, used by the test suite.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Raw connection access, for queries the typed layer doesn't cover.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction. Dropping it without commit rolls back.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}
