//! Embedded-file engine over `SQLite`.

use crate::engine::{Engine, row_data, sql};
use crate::models::{Backend, DEFAULT_QUOTE, QueryKind, QueryResult, Row, SqlValue, Where};
use crate::system::db_datetime;
use crate::{Error, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::path::PathBuf;

/// Server label stored in SQL-audit rows for the embedded backend.
const AUDIT_SERVER: &str = "EMBEDDED_DB";

/// Engine over one embedded `SQLite` database file.
///
/// Owns at most one [`rusqlite::Connection`], opened by
/// [`Engine::connect`] and held for the life of the engine. With the
/// `required` flag set, a missing backing file is a connect-time failure
/// instead of being discovered lazily (`SQLite` would otherwise create
/// an empty file on open).
pub struct SqliteEngine {
    /// Path to the database file (`None` for in-memory).
    path: Option<PathBuf>,
    required: bool,
    conn: Option<Connection>,
    connected: bool,
    audit_table: Option<String>,
    in_audit: bool,
    last_id: i64,
}

impl SqliteEngine {
    /// Creates an engine over a database file. Not yet connected.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            required: false,
            conn: None,
            connected: false,
            audit_table: None,
            in_audit: false,
            last_id: 0,
        }
    }

    /// Marks the backing file required: [`Engine::connect`] fails when
    /// it does not exist instead of creating it.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Creates an in-memory engine (useful for testing).
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            path: None,
            required: false,
            conn: None,
            connected: false,
            audit_table: None,
            in_audit: false,
            last_id: 0,
        }
    }

    /// Returns the database path (`None` for in-memory).
    #[must_use]
    pub const fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Applies the connection pragmas: WAL journal mode and a busy
    /// timeout to ride out short lock contention.
    fn configure(conn: &Connection) {
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "busy_timeout", "5000");
    }

    /// Executes one fully rendered statement, collecting any returned
    /// rows. Statements that return nothing execute on the first step.
    fn run_statement(conn: &Connection, query: &str) -> Result<Vec<Row>> {
        let query_error = |e: rusqlite::Error| Error::Query {
            query: query.to_string(),
            cause: e.to_string(),
        };

        let mut stmt = conn.prepare(query).map_err(query_error)?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut rows = Vec::new();
        let mut raw = stmt.query([]).map_err(query_error)?;
        while let Some(r) = raw.next().map_err(query_error)? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = r
                    .get_ref(i)
                    .map_or(SqlValue::Null, Self::value_from_ref);
                row.insert(name.clone(), value);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn value_from_ref(value: ValueRef<'_>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Int(i),
            ValueRef::Real(f) => SqlValue::Float(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }

    /// Mirrors one executed statement into the audit table.
    ///
    /// Best-effort: write failures are swallowed (the audited statement
    /// text is interpolated unescaped, so statements containing quote
    /// characters can break the audit insert, a known limitation of the
    /// wire-compatible renderer). The `in_audit` guard stops the audit
    /// write from auditing itself.
    fn audit(&mut self, query: &str, ok: bool) {
        if self.in_audit {
            return;
        }
        let Some(table) = self.audit_table.clone() else {
            return;
        };

        self.in_audit = true;
        let row = row_data([
            ("time", SqlValue::from(db_datetime())),
            ("sgbd", SqlValue::from(Backend::Sqlite.as_str())),
            ("server", SqlValue::from(AUDIT_SERVER)),
            ("query", SqlValue::from(query)),
            ("result", SqlValue::from(if ok { "OK" } else { "ERROR" })),
        ]);
        let stmt = sql::render_insert(&table, &row, DEFAULT_QUOTE);
        if let Some(conn) = self.conn.as_ref() {
            if let Err(e) = conn.execute(&stmt, []) {
                tracing::debug!(error = %e, "sql audit write skipped");
            }
        }
        self.in_audit = false;
    }
}

impl Engine for SqliteEngine {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> bool {
        if self.required {
            let missing = self.path.as_ref().is_none_or(|p| !p.exists());
            if missing {
                tracing::error!(
                    path = ?self.path,
                    "sqlite connection failed: required database file not found"
                );
                self.connected = false;
                return false;
            }
        }

        let opened = match &self.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        };

        match opened {
            Ok(conn) => {
                Self::configure(&conn);
                self.conn = Some(conn);
                self.connected = true;
                true
            },
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "sqlite connection failed");
                self.connected = false;
                false
            },
        }
    }

    fn raw_query(&mut self, text: &str, args: &[SqlValue], kind: QueryKind) -> QueryResult {
        let mut result = QueryResult::new(Backend::Sqlite, kind);
        result.query = sql::substitute_args(text, args);

        if !self.connected {
            result.error = Some(Error::NotConnected);
            return result;
        }

        let outcome = match self.conn.as_ref() {
            Some(conn) => Self::run_statement(conn, &result.query),
            None => Err(Error::NotConnected),
        };

        match outcome {
            Ok(rows) => {
                result.row_count = rows.len();
                result.rows = rows;
            },
            Err(e) => {
                tracing::warn!(query = %result.query, error = %e, "sqlite query failed");
                result.error = Some(e);
            },
        }

        // Capture the generated id before the audit mirror runs its own
        // insert and overwrites the connection's last rowid.
        if result.is_ok() && kind == QueryKind::Insert {
            self.last_id = self.conn.as_ref().map_or(0, Connection::last_insert_rowid);
        }

        let (query, ok) = (result.query.clone(), result.is_ok());
        self.audit(&query, ok);
        result
    }

    fn fetch_insert_id(&mut self) -> i64 {
        self.last_id
    }

    fn truncate(&mut self, table: &str) -> QueryResult {
        let result = self.raw_query(&format!("DELETE FROM {table}"), &[], QueryKind::Truncate);
        if result.is_ok() {
            // Reset the auto-increment counter so the next insert starts
            // from 1 again. The row only exists for AUTOINCREMENT tables.
            let reset = self.update(
                "sqlite_sequence",
                &row_data([("seq", 0i64)]),
                &Where::pairs([("name", table)]),
                DEFAULT_QUOTE,
            );
            if let Some(e) = reset.error {
                tracing::debug!(table, error = %e, "sqlite_sequence reset skipped");
            }
        }
        result
    }

    fn set_audit_table(&mut self, table: Option<String>) {
        self.audit_table = table;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn connected() -> SqliteEngine {
        let mut engine = SqliteEngine::in_memory();
        assert!(engine.connect());
        engine
    }

    #[test]
    fn connect_in_memory() {
        let engine = connected();
        assert!(engine.is_connected());
        assert_eq!(engine.backend(), Backend::Sqlite);
    }

    #[test]
    fn required_missing_file_fails_connect() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine =
            SqliteEngine::new(dir.path().join("absent.db")).with_required(true);
        assert!(!engine.connect());
        assert!(!engine.is_connected());

        // Not required: the file is created on open.
        let mut engine = SqliteEngine::new(dir.path().join("created.db"));
        assert!(engine.connect());
        assert!(engine.is_connected());
    }

    #[test]
    fn disconnected_query_returns_error_result() {
        let mut engine = SqliteEngine::in_memory();
        let r = engine.raw_query("SELECT 1", &[], QueryKind::Special);
        assert!(matches!(r.error, Some(Error::NotConnected)));
        assert!(r.rows.is_empty());
        assert_eq!(r.row_count, 0);
    }

    #[test]
    fn select_insert_update_delete_roundtrip() {
        let mut engine = connected();
        engine
            .raw_query(
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, n INTEGER)",
                &[],
                QueryKind::Special,
            )
            .into_result()
            .unwrap();

        let r = engine.insert(
            "t",
            &row_data([("name", SqlValue::from("a")), ("n", SqlValue::Int(1))]),
            DEFAULT_QUOTE,
        );
        assert!(r.is_ok(), "{:?}", r.error);
        assert_eq!(r.last_insert_id, 1);
        assert_eq!(r.query, "INSERT INTO t (name,n) VALUES ('a',1)");

        let r = engine.select("t", None, DEFAULT_QUOTE);
        assert_eq!(r.row_count, 1);
        assert_eq!(r.query, "SELECT * FROM t");
        assert_eq!(r.rows[0].get("name"), Some(&SqlValue::from("a")));
        assert_eq!(r.rows[0].get("n"), Some(&SqlValue::Int(1)));

        let r = engine.update(
            "t",
            &row_data([("n", 2i64)]),
            &Where::pairs([("name", "a")]),
            DEFAULT_QUOTE,
        );
        assert!(r.is_ok());
        assert_eq!(r.query, "UPDATE t SET n=2 WHERE name='a'");

        let r = engine.select("t", Some(&Where::pairs([("n", 2i64)])), DEFAULT_QUOTE);
        assert_eq!(r.row_count, 1);

        let r = engine.delete("t", &Where::pairs([("n", 2i64)]), DEFAULT_QUOTE);
        assert!(r.is_ok());
        let r = engine.select("t", None, DEFAULT_QUOTE);
        assert_eq!(r.row_count, 0);
    }

    #[test]
    fn backend_failure_is_captured_not_propagated() {
        let mut engine = connected();
        let r = engine.raw_query("SELECT * FROM missing_table", &[], QueryKind::Select);
        assert!(matches!(r.error, Some(Error::Query { .. })));
        assert!(r.rows.is_empty());
        assert!(engine.is_connected(), "query failure must not disconnect");
    }

    #[test]
    fn truncate_resets_autoincrement() {
        let mut engine = connected();
        let _ = engine.raw_query(
            "CREATE TABLE logs (id INTEGER PRIMARY KEY AUTOINCREMENT, msg TEXT)",
            &[],
            QueryKind::Special,
        );
        for i in 0..3 {
            let r = engine.insert(
                "logs",
                &row_data([("msg", format!("m{i}"))]),
                DEFAULT_QUOTE,
            );
            assert!(r.is_ok());
        }

        let r = engine.truncate("logs");
        assert!(r.is_ok());
        assert_eq!(engine.select("logs", None, DEFAULT_QUOTE).row_count, 0);

        let r = engine.insert("logs", &row_data([("msg", "fresh")]), DEFAULT_QUOTE);
        assert_eq!(r.last_insert_id, 1, "sequence restarts after truncate");
    }

    #[test]
    fn placeholder_substitution_applies_before_execution() {
        let mut engine = connected();
        let _ = engine.raw_query(
            "CREATE TABLE kv (k TEXT, v INTEGER)",
            &[],
            QueryKind::Special,
        );
        let _ = engine.raw_query(
            "INSERT INTO kv (k, v) VALUES ('a', 10)",
            &[],
            QueryKind::Special,
        );

        let r = engine.raw_query(
            "SELECT v FROM $0 WHERE k = '$1'",
            &["kv".into(), "a".into()],
            QueryKind::Select,
        );
        assert_eq!(r.query, "SELECT v FROM kv WHERE k = 'a'");
        assert_eq!(r.rows[0].get("v"), Some(&SqlValue::Int(10)));
    }

    #[test]
    fn audit_mirrors_queries_without_recursing() {
        let mut engine = connected();
        let _ = engine.raw_query(
            "CREATE TABLE audit (id INTEGER PRIMARY KEY AUTOINCREMENT, time TEXT, sgbd TEXT, server TEXT, query TEXT, result TEXT)",
            &[],
            QueryKind::Special,
        );
        engine.set_audit_table(Some("audit".to_string()));

        let _ = engine.raw_query("SELECT 1 AS one", &[], QueryKind::Special);
        // Query the audit table itself: must not recurse or deadlock.
        let r = engine.select("audit", None, DEFAULT_QUOTE);
        assert!(r.is_ok());
        assert_eq!(r.row_count, 1);
        assert_eq!(
            r.rows[0].get("query"),
            Some(&SqlValue::from("SELECT 1 AS one"))
        );
        assert_eq!(r.rows[0].get("result"), Some(&SqlValue::from("OK")));
        assert_eq!(r.rows[0].get("server"), Some(&SqlValue::from(AUDIT_SERVER)));

        // Failures are audited too.
        let _ = engine.raw_query("SELECT * FROM nope", &[], QueryKind::Select);
        let r = engine.select(
            "audit",
            Some(&Where::pairs([("result", "ERROR")])),
            DEFAULT_QUOTE,
        );
        assert_eq!(r.row_count, 1);
    }

    #[test]
    fn insert_id_survives_audit_mirroring() {
        let mut engine = connected();
        let _ = engine.raw_query(
            "CREATE TABLE audit (id INTEGER PRIMARY KEY AUTOINCREMENT, time TEXT, sgbd TEXT, server TEXT, query TEXT, result TEXT)",
            &[],
            QueryKind::Special,
        );
        let _ = engine.raw_query(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
            &[],
            QueryKind::Special,
        );
        engine.set_audit_table(Some("audit".to_string()));

        // Each audit row consumes a rowid of its own; the reported id
        // must stay the caller's.
        for expected in 1..=3 {
            let r = engine.insert("t", &row_data([("name", "x")]), DEFAULT_QUOTE);
            assert!(r.is_ok());
            assert_eq!(r.last_insert_id, expected);
        }
    }

    #[test]
    fn audit_write_failure_is_swallowed() {
        let mut engine = connected();
        let _ = engine.raw_query("CREATE TABLE t (x TEXT)", &[], QueryKind::Special);
        // Point auditing at a table that does not exist: the audited
        // operation must still succeed.
        engine.set_audit_table(Some("no_such_audit_table".to_string()));
        let r = engine.raw_query("SELECT * FROM t", &[], QueryKind::Select);
        assert!(r.is_ok());
    }
}
