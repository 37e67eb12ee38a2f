//! Engine contract and backends.
//!
//! One trait, two conforming implementations. The CRUD operations are
//! provided methods built on [`sql`] and [`Engine::raw_query`], so both
//! backends generate byte-identical statement text; only connection
//! handling, last-insert-id retrieval, and TRUNCATE availability differ
//! per backend.

pub mod sql;

mod postgres;
mod sqlite;

pub use postgres::PostgresEngine;
pub use sqlite::SqliteEngine;

use crate::models::{Backend, QueryKind, QueryResult, SqlValue, Where};

/// Ordered column/value pairs for INSERT and UPDATE.
pub type RowData = Vec<(String, SqlValue)>;

/// Builds [`RowData`] from ordered key/value pairs.
pub fn row_data<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> RowData
where
    K: Into<String>,
    V: Into<SqlValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A concrete binding to one relational backend.
///
/// An engine owns exactly one connection handle (or none) for the
/// lifetime of the process: created once, never pooled, never recreated
/// implicitly. Every call blocks until the backend responds; there are
/// no timeouts and no cancellation.
///
/// # Failure semantics
///
/// No operation throws past its boundary. Disconnection, malformed
/// statement text, and backend-level failures are all captured into
/// [`QueryResult::error`]. A query-level failure never flips the
/// connected flag; only [`Engine::connect`] does.
pub trait Engine {
    /// The backend this engine binds to.
    fn backend(&self) -> Backend;

    /// Whether a connection is currently live.
    fn is_connected(&self) -> bool;

    /// Attempts to open the underlying connection.
    ///
    /// Returns `true` and sets the connected flag on success; on failure
    /// records the error through `tracing` and returns `false`. Callers
    /// marking the resource required may escalate a `false` return to a
    /// process-fatal condition; that policy is theirs, not the
    /// engine's.
    fn connect(&mut self) -> bool;

    /// Executes `text` after `$0,$1,…` placeholder substitution.
    ///
    /// When not connected the result carries
    /// [`crate::Error::NotConnected`] and no backend call is attempted. Every executed statement (success
    /// or failure) is mirrored into the SQL-audit table when one is
    /// configured; audit writes are best-effort and guarded against
    /// recursing when the audit table is itself the query target.
    fn raw_query(&mut self, text: &str, args: &[SqlValue], kind: QueryKind) -> QueryResult;

    /// The identifier generated by the most recent successful INSERT
    /// executed through this engine, captured backend-appropriately
    /// before any audit mirroring runs. Best-effort: 0 when none is
    /// available.
    fn fetch_insert_id(&mut self) -> i64;

    /// Empties `table` and resets its auto-increment sequence.
    ///
    /// A true `TRUNCATE` where the backend has one; the embedded backend
    /// substitutes a full-table DELETE plus a sequence reset.
    fn truncate(&mut self, table: &str) -> QueryResult;

    /// Points SQL-audit mirroring at a physical table, or disables it
    /// with `None`.
    fn set_audit_table(&mut self, table: Option<String>);

    /// `SELECT * FROM table`, with an optional WHERE clause.
    ///
    /// `None` means select-all: no WHERE fragment is appended.
    fn select(&mut self, table: &str, clause: Option<&Where>, quote: char) -> QueryResult {
        let mut query = format!("SELECT * FROM {table}");
        if let Some(w) = clause {
            query.push_str(" WHERE ");
            query.push_str(&sql::render_where(w, quote));
        }
        self.raw_query(&query, &[], QueryKind::Select)
    }

    /// `INSERT INTO table (cols…) VALUES (vals…)`, in supplied pair
    /// order; populates `last_insert_id` on success.
    fn insert(&mut self, table: &str, row: &[(String, SqlValue)], quote: char) -> QueryResult {
        let query = sql::render_insert(table, row, quote);
        let mut result = self.raw_query(&query, &[], QueryKind::Insert);
        if result.is_ok() {
            result.last_insert_id = self.fetch_insert_id();
        }
        result
    }

    /// `UPDATE table SET col=val,… WHERE …`.
    fn update(
        &mut self,
        table: &str,
        row: &[(String, SqlValue)],
        clause: &Where,
        quote: char,
    ) -> QueryResult {
        let query = format!(
            "UPDATE {table} SET {} WHERE {}",
            sql::render_assignments(row, quote),
            sql::render_where(clause, quote)
        );
        self.raw_query(&query, &[], QueryKind::Update)
    }

    /// `DELETE FROM table WHERE …`.
    fn delete(&mut self, table: &str, clause: &Where, quote: char) -> QueryResult {
        let query = format!(
            "DELETE FROM {table} WHERE {}",
            sql::render_where(clause, quote)
        );
        self.raw_query(&query, &[], QueryKind::Delete)
    }
}
