//! Networked engine over a blocking `PostgreSQL` client.

use crate::config::NetworkDsn;
use crate::engine::{Engine, row_data, sql};
use crate::models::{Backend, DEFAULT_QUOTE, QueryKind, QueryResult, Row, SqlValue};
use crate::system::db_datetime;
use crate::{Error, Result};
use postgres::{Client, NoTls, SimpleQueryMessage};

/// Engine over one blocking `PostgreSQL` connection.
///
/// Holds exactly one [`postgres::Client`] for the life of the engine,
/// no pool, no reconnect loop. Connecting validates the session with
/// `SELECT 1` and then drops the password from memory; statements are
/// executed through the simple-query protocol (string-built text, no
/// parameter binding), so every returned value is textual or NULL.
pub struct PostgresEngine {
    dsn: NetworkDsn,
    client: Option<Client>,
    connected: bool,
    audit_table: Option<String>,
    in_audit: bool,
    last_id: i64,
}

impl PostgresEngine {
    /// Creates an engine for the given DSN. Not yet connected.
    #[must_use]
    pub const fn new(dsn: NetworkDsn) -> Self {
        Self {
            dsn,
            client: None,
            connected: false,
            audit_table: None,
            in_audit: false,
            last_id: 0,
        }
    }

    /// Host this engine targets (also the SQL-audit server label).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.dsn.host
    }

    fn run_statement(client: &mut Client, query: &str) -> Result<Vec<Row>> {
        let messages = client
            .simple_query(query)
            .map_err(|e| Error::Query {
                query: query.to_string(),
                cause: e.to_string(),
            })?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(r) = message {
                let mut row = Row::new();
                for (i, column) in r.columns().iter().enumerate() {
                    let value = r
                        .get(i)
                        .map_or(SqlValue::Null, |text| SqlValue::Text(text.to_string()));
                    row.insert(column.name().to_string(), value);
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Session-scoped follow-up on the same connection as the insert.
    /// The simple-query protocol returns the value as text.
    fn current_insert_id(client: &mut Client) -> i64 {
        Self::run_statement(client, "SELECT lastval() AS id")
            .ok()
            .and_then(|rows| rows.first().and_then(|row| row.get("id")).cloned())
            .map_or(0, |v| match v {
                SqlValue::Int(i) => i,
                SqlValue::Text(s) => s.parse().unwrap_or(0),
                _ => 0,
            })
    }

    /// Best-effort audit mirror; see the embedded engine for the
    /// rationale behind the guard and the swallowed failures.
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
            ("sgbd", SqlValue::from(Backend::Postgres.as_str())),
            ("server", SqlValue::from(self.dsn.host.as_str())),
            ("query", SqlValue::from(query)),
            ("result", SqlValue::from(if ok { "OK" } else { "ERROR" })),
        ]);
        let stmt = sql::render_insert(&table, &row, DEFAULT_QUOTE);
        if let Some(client) = self.client.as_mut() {
            if let Err(e) = client.simple_query(&stmt) {
                tracing::debug!(error = %e, "sql audit write skipped");
            }
        }
        self.in_audit = false;
    }
}

impl Engine for PostgresEngine {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> bool {
        let mut config = Client::configure();
        config
            .host(&self.dsn.host)
            .port(self.dsn.port)
            .user(&self.dsn.user)
            .dbname(&self.dsn.database);
        if let Some(password) = &self.dsn.password {
            config.password(password);
        }

        match config.connect(NoTls) {
            Ok(mut client) => {
                // Validate the session before declaring the engine live.
                if let Err(e) = client.simple_query("SELECT 1") {
                    tracing::error!(
                        host = %self.dsn.host,
                        port = self.dsn.port,
                        user = %self.dsn.user,
                        database = %self.dsn.database,
                        error = %e,
                        "postgres connection validation failed"
                    );
                    self.connected = false;
                    return false;
                }
                self.client = Some(client);
                self.connected = true;
                // Credential no longer needed once the session is open.
                self.dsn.password = None;
                true
            },
            Err(e) => {
                tracing::error!(
                    host = %self.dsn.host,
                    port = self.dsn.port,
                    user = %self.dsn.user,
                    database = %self.dsn.database,
                    error = %e,
                    "postgres connection failed"
                );
                self.connected = false;
                false
            },
        }
    }

    fn raw_query(&mut self, text: &str, args: &[SqlValue], kind: QueryKind) -> QueryResult {
        let mut result = QueryResult::new(Backend::Postgres, kind);
        result.query = sql::substitute_args(text, args);

        if !self.connected {
            result.error = Some(Error::NotConnected);
            return result;
        }

        let outcome = match self.client.as_mut() {
            Some(client) => Self::run_statement(client, &result.query),
            None => Err(Error::NotConnected),
        };

        match outcome {
            Ok(rows) => {
                result.row_count = rows.len();
                result.rows = rows;
            },
            Err(e) => {
                tracing::warn!(query = %result.query, error = %e, "postgres query failed");
                result.error = Some(e);
            },
        }

        // Capture the generated id before the audit mirror runs its own
        // insert and advances the session's lastval().
        if result.is_ok() && kind == QueryKind::Insert {
            self.last_id = self.client.as_mut().map_or(0, Self::current_insert_id);
        }

        let (query, ok) = (result.query.clone(), result.is_ok());
        self.audit(&query, ok);
        result
    }

    fn fetch_insert_id(&mut self) -> i64 {
        self.last_id
    }

    fn truncate(&mut self, table: &str) -> QueryResult {
        self.raw_query(
            &format!("TRUNCATE TABLE {table} RESTART IDENTITY"),
            &[],
            QueryKind::Truncate,
        )
    }

    fn set_audit_table(&mut self, table: Option<String>) {
        self.audit_table = table;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_dsn() -> NetworkDsn {
        NetworkDsn {
            host: "127.0.0.1".to_string(),
            // Nothing listens here.
            port: 1,
            user: "sysdb".to_string(),
            password: Some("secret".to_string()),
            database: "sysdb".to_string(),
        }
    }

    #[test]
    fn connect_failure_returns_false() {
        let mut engine = PostgresEngine::new(unreachable_dsn());
        assert!(!engine.connect());
        assert!(!engine.is_connected());
    }

    #[test]
    fn disconnected_query_returns_error_result() {
        let mut engine = PostgresEngine::new(unreachable_dsn());
        let r = engine.raw_query("SELECT 1", &[], QueryKind::Special);
        assert!(matches!(r.error, Some(Error::NotConnected)));
        assert_eq!(r.backend, Backend::Postgres);
        assert!(r.rows.is_empty());
    }

    #[test]
    fn query_text_is_substituted_even_when_disconnected() {
        let mut engine = PostgresEngine::new(unreachable_dsn());
        let r = engine.raw_query(
            "SELECT * FROM $0",
            &["users".into()],
            QueryKind::Select,
        );
        assert_eq!(r.query, "SELECT * FROM users");
    }

    #[test]
    fn truncate_uses_native_statement() {
        let mut engine = PostgresEngine::new(unreachable_dsn());
        let r = engine.truncate("zf101_log_system");
        assert_eq!(
            r.query,
            "TRUNCATE TABLE zf101_log_system RESTART IDENTITY"
        );
        assert_eq!(r.kind, QueryKind::Truncate);
    }
}
