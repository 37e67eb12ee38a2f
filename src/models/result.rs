//! Uniform operation outcome.
//!
//! Every engine operation returns a [`QueryResult`], success or failure,
//! connected or not. Backend exceptions are captured into the `error`
//! field instead of propagating, so no engine call ever panics or returns
//! a Rust `Err` at the operation boundary.

use crate::Error;
use std::collections::HashMap;
use std::fmt;

use super::value::SqlValue;

/// The relational backend a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Embedded `SQLite` file.
    Sqlite,
    /// Networked `PostgreSQL` server.
    Postgres,
}

impl Backend {
    /// Canonical lowercase name, as stored in the SQL-audit log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a backend name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of statement an operation executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// `SELECT` statement.
    Select,
    /// `INSERT` statement.
    Insert,
    /// `UPDATE` statement.
    Update,
    /// `DELETE` statement.
    Delete,
    /// `TRUNCATE` (or its embedded-backend equivalent).
    Truncate,
    /// Anything issued through `raw_query` without a more specific kind.
    Special,
}

impl QueryKind {
    /// Canonical uppercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result row: column name to tagged value.
pub type Row = HashMap<String, SqlValue>;

/// Uniform outcome of any engine operation.
///
/// Invariants:
/// - `row_count == rows.len()` whenever `error` is `None`;
/// - `error` present implies `rows` is empty and `last_insert_id == 0`.
#[derive(Debug)]
pub struct QueryResult {
    /// Backend the operation ran against.
    pub backend: Backend,
    /// Statement kind.
    pub kind: QueryKind,
    /// The fully generated statement text (after `$N` substitution).
    pub query: String,
    /// Number of rows returned.
    pub row_count: usize,
    /// Generated identifier after an INSERT, 0 otherwise.
    pub last_insert_id: i64,
    /// Returned rows, empty for non-SELECT statements and on failure.
    pub rows: Vec<Row>,
    /// Failure detail, `None` on success.
    pub error: Option<Error>,
}

impl QueryResult {
    /// Creates an empty successful result shell.
    #[must_use]
    pub const fn new(backend: Backend, kind: QueryKind) -> Self {
        Self {
            backend,
            kind,
            query: String::new(),
            row_count: 0,
            last_insert_id: 0,
            rows: Vec::new(),
            error: None,
        }
    }

    /// Creates a failed result carrying `error` and the statement text
    /// that was (or would have been) executed.
    #[must_use]
    pub fn failed(backend: Backend, kind: QueryKind, query: impl Into<String>, error: Error) -> Self {
        Self {
            backend,
            kind,
            query: query.into(),
            row_count: 0,
            last_insert_id: 0,
            rows: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Moves the error out, turning the result into `Result<Self>`.
    ///
    /// # Errors
    ///
    /// Returns the carried [`Error`] when the operation failed.
    pub fn into_result(mut self) -> crate::Result<Self> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_uppercase() {
        assert_eq!(QueryKind::Select.as_str(), "SELECT");
        assert_eq!(QueryKind::Special.as_str(), "SPECIAL");
    }

    #[test]
    fn backend_parse_roundtrip() {
        assert_eq!(Backend::parse("SQLite"), Some(Backend::Sqlite));
        assert_eq!(Backend::parse("postgresql"), Some(Backend::Postgres));
        assert_eq!(Backend::parse("mysql"), None);
    }

    #[test]
    fn failed_result_has_no_rows_and_zero_id() {
        let r = QueryResult::failed(
            Backend::Sqlite,
            QueryKind::Select,
            "SELECT 1",
            Error::NotConnected,
        );
        assert!(!r.is_ok());
        assert!(r.rows.is_empty());
        assert_eq!(r.row_count, 0);
        assert_eq!(r.last_insert_id, 0);
    }

    #[test]
    fn into_result_surfaces_the_error() {
        let r = QueryResult::failed(
            Backend::Sqlite,
            QueryKind::Special,
            "",
            Error::NotConnected,
        );
        assert!(matches!(r.into_result(), Err(Error::NotConnected)));

        let ok = QueryResult::new(Backend::Sqlite, QueryKind::Select);
        assert!(ok.into_result().is_ok());
    }
}
