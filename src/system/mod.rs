//! System facade: one engine plus config/registry/message/log semantics.
//!
//! [`SystemDb`] is an explicit context object: construct one per
//! process (or one per test with an in-memory engine) instead of
//! reaching for global state. It binds at most one [`Engine`] for its
//! lifetime; there is no unbind or close path, matching the layer it
//! replaces, where the connection was released only at process exit.

mod coerce;

pub use coerce::{ConfigKind, ConfigValue, coerce};

use crate::config::SysDbConfig;
use crate::engine::{Engine, PostgresEngine, RowData, SqliteEngine, row_data};
use crate::models::{Backend, DEFAULT_QUOTE, Row, SqlValue, Where};
use crate::{Error, Result};
use tracing::instrument;

/// Date as stored in database rows, `YYYY-MM-DD`.
#[must_use]
pub fn db_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Timestamp as stored in database rows, `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn db_datetime() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Extracts the `id` column of a result row.
fn row_id(row: &Row) -> i64 {
    match row.get("id") {
        Some(SqlValue::Int(i)) => *i,
        Some(SqlValue::Text(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Textual content of a column, empty for NULL or absent columns.
fn text_of(value: Option<&SqlValue>) -> String {
    match value {
        Some(SqlValue::Null) | None => String::new(),
        Some(v) => v.raw(),
    }
}

/// The system database facade.
///
/// Coordinates exactly one [`Engine`] with table-name resolution,
/// typed configuration, the registry key-value store, the message
/// catalogue, and categorized append-only logs. Every operation routes
/// table access through [`SystemDb::table_name`] and fails with
/// [`Error::UnknownTable`] rather than querying an empty-named table.
///
/// All operations issued while not connected return
/// [`Error::NotConnected`] without touching the engine.
pub struct SystemDb {
    config: SysDbConfig,
    engine: Option<Box<dyn Engine>>,
}

impl SystemDb {
    /// Creates an unbound facade over `config`.
    #[must_use]
    pub const fn new(config: SysDbConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Builds and connects the engine named by the configuration.
    ///
    /// Returns `true` on success. On failure the engine stays bound but
    /// disconnected; every subsequent operation reports
    /// [`Error::NotConnected`]. Escalating a failed connect on a
    /// required resource to a fatal condition is the caller's policy.
    #[instrument(skip(self), fields(backend = %self.config.backend))]
    pub fn connect(&mut self) -> bool {
        let engine: Box<dyn Engine> = match self.config.backend {
            Backend::Sqlite => Box::new(
                SqliteEngine::new(self.config.sqlite.path.clone())
                    .with_required(self.config.sqlite.required),
            ),
            Backend::Postgres => Box::new(PostgresEngine::new(self.config.postgres.clone())),
        };
        self.connect_with(engine)
    }

    /// Binds a caller-supplied engine, connecting it if it is not
    /// connected already.
    ///
    /// This is how tests bind a fresh in-memory engine per case.
    pub fn connect_with(&mut self, mut engine: Box<dyn Engine>) -> bool {
        let ok = engine.is_connected() || engine.connect();
        if ok && self.config.log_queries {
            let audit = self.table_name("log_sql");
            if !audit.is_empty() {
                engine.set_audit_table(Some(audit));
            }
        }
        self.engine = Some(engine);
        ok
    }

    /// Whether an engine is bound and its connection is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.is_connected())
    }

    /// Resolves a logical table name to its prefixed physical name.
    ///
    /// Returns an empty string for unknown logical names.
    #[must_use]
    pub fn table_name(&self, logical: &str) -> String {
        self.config.tables.get(logical).map_or_else(String::new, |suffix| {
            format!("{}{suffix}", self.config.table_prefix)
        })
    }

    fn resolve(&self, logical: &str) -> Result<String> {
        let physical = self.table_name(logical);
        if physical.is_empty() {
            return Err(Error::UnknownTable {
                name: logical.to_string(),
            });
        }
        Ok(physical)
    }

    fn engine_mut(&mut self) -> Result<&mut dyn Engine> {
        match self.engine.as_deref_mut() {
            Some(engine) if engine.is_connected() => Ok(engine),
            _ => Err(Error::NotConnected),
        }
    }

    /// Insert-if-absent, else update, keyed by `key`. Returns the
    /// existing row's id on update and the generated id on insert.
    fn upsert(
        &mut self,
        logical: &str,
        key: &Where,
        update_row: RowData,
        insert_row: RowData,
    ) -> Result<i64> {
        let table = self.resolve(logical)?;
        let engine = self.engine_mut()?;

        let existing = engine.select(&table, Some(key), DEFAULT_QUOTE).into_result()?;
        if let Some(row) = existing.rows.first() {
            let id = row_id(row);
            engine
                .update(&table, &update_row, key, DEFAULT_QUOTE)
                .into_result()?;
            Ok(id)
        } else {
            let inserted = engine
                .insert(&table, &insert_row, DEFAULT_QUOTE)
                .into_result()?;
            Ok(inserted.last_insert_id)
        }
    }

    /// Reads a configuration value, coerced under its declared type.
    ///
    /// Missing rows are `Ok(None)`. See [`coerce`] for the coercion
    /// policy.
    pub fn get_config(&mut self, name: &str) -> Result<Option<ConfigValue>> {
        let table = self.resolve("configuration")?;
        let engine = self.engine_mut()?;

        let result = engine
            .select(&table, Some(&Where::pairs([("name", name)])), DEFAULT_QUOTE)
            .into_result()?;
        let Some(row) = result.rows.first() else {
            return Ok(None);
        };

        let declared = text_of(row.get("type"));
        let value = text_of(row.get("value"));
        coerce(name, &declared, &value).map(Some)
    }

    /// Writes a configuration value, upserting by unique `name`.
    #[instrument(skip(self, value, description))]
    pub fn set_config(
        &mut self,
        name: &str,
        kind: ConfigKind,
        value: &str,
        description: &str,
    ) -> Result<i64> {
        let key = Where::pairs([("name", name)]);
        let update = row_data([
            ("type", kind.as_str()),
            ("value", value),
            ("description", description),
        ]);
        let insert = row_data([
            ("name", name),
            ("type", kind.as_str()),
            ("value", value),
            ("description", description),
        ]);
        self.upsert("configuration", &key, update, insert)
    }

    /// Reads a registry value. Missing rows are `Ok(None)`.
    pub fn get_registry(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self
            .registry_row(name)?
            .map(|row| text_of(row.get("value"))))
    }

    /// Reads a registry value together with its write date.
    pub fn get_registry_dated(&mut self, name: &str) -> Result<Option<(String, String)>> {
        Ok(self
            .registry_row(name)?
            .map(|row| (text_of(row.get("date")), text_of(row.get("value")))))
    }

    fn registry_row(&mut self, name: &str) -> Result<Option<Row>> {
        let table = self.resolve("registry")?;
        let engine = self.engine_mut()?;
        let mut result = engine
            .select(&table, Some(&Where::pairs([("name", name)])), DEFAULT_QUOTE)
            .into_result()?;
        Ok(if result.rows.is_empty() {
            None
        } else {
            Some(result.rows.remove(0))
        })
    }

    /// Writes a registry value, upserting by unique `name`.
    ///
    /// The `date` column is refreshed on every write, updates included.
    /// The stored `locked` flag is not consulted before overwriting:
    /// rows written with `locked=1` are overwritten like any other, as
    /// in the layer this one replaces.
    #[instrument(skip(self, value))]
    pub fn set_registry(&mut self, name: &str, value: &str) -> Result<i64> {
        let now = db_datetime();
        let key = Where::pairs([("name", name)]);
        let update = row_data([("date", now.as_str()), ("value", value)]);
        let insert = row_data([
            ("date", now.as_str()),
            ("name", name),
            ("value", value),
        ]);
        self.upsert("registry", &key, update, insert)
    }

    /// Reads a catalogue message by code and language.
    pub fn get_message(&mut self, code: &str, lang: &str) -> Result<Option<String>> {
        let table = self.resolve("message")?;
        let engine = self.engine_mut()?;
        let result = engine
            .select(
                &table,
                Some(&Where::pairs([("code", code), ("lang", lang)])),
                DEFAULT_QUOTE,
            )
            .into_result()?;
        Ok(result
            .rows
            .first()
            .map(|row| text_of(row.get("message"))))
    }

    /// Writes a catalogue message, upserting by (code, lang).
    pub fn set_message(&mut self, code: &str, lang: &str, message: &str) -> Result<i64> {
        let key = Where::pairs([("code", code), ("lang", lang)]);
        let update = row_data([("lang", lang), ("message", message)]);
        let insert = row_data([("code", code), ("lang", lang), ("message", message)]);
        self.upsert("message", &key, update, insert)
    }

    fn append_log(&mut self, logical: &str, row: RowData) -> Result<i64> {
        let table = self.resolve(logical)?;
        let engine = self.engine_mut()?;
        let result = engine.insert(&table, &row, DEFAULT_QUOTE).into_result()?;
        Ok(result.last_insert_id)
    }

    /// Appends a system log entry.
    pub fn add_log_system(
        &mut self,
        kind: &str,
        message: &str,
        extra: &serde_json::Value,
    ) -> Result<i64> {
        self.append_log(
            "log_system",
            row_data([
                ("time", db_datetime()),
                ("type", kind.to_string()),
                ("message", message.to_string()),
                ("additional_data", extra.to_string()),
            ]),
        )
    }

    /// Appends an error log entry with its serialized backtrace.
    pub fn add_log_error(
        &mut self,
        code: &str,
        message: &str,
        backtrace: &[String],
        extra: &serde_json::Value,
    ) -> Result<i64> {
        self.append_log(
            "log_error",
            row_data([
                ("time", db_datetime()),
                ("code", code.to_string()),
                ("message", message.to_string()),
                (
                    "backtrace",
                    serde_json::to_string(backtrace).unwrap_or_default(),
                ),
                ("additional_data", extra.to_string()),
            ]),
        )
    }

    /// Appends a server access log entry.
    pub fn add_log_server(
        &mut self,
        kind: &str,
        method: &str,
        origin: &str,
        request: &str,
        status: i64,
    ) -> Result<i64> {
        self.append_log(
            "log_server",
            row_data([
                ("time", SqlValue::from(db_datetime())),
                ("type", SqlValue::from(kind)),
                ("method", SqlValue::from(method)),
                ("origin", SqlValue::from(origin)),
                ("request", SqlValue::from(request)),
                ("status", SqlValue::Int(status)),
            ]),
        )
    }

    /// Appends a SQL-audit log entry.
    ///
    /// Engines mirror their own statements automatically when auditing
    /// is enabled; this entry point exists for collaborators recording
    /// statements executed elsewhere.
    pub fn add_log_sql(
        &mut self,
        backend: Backend,
        server: &str,
        query: &str,
        outcome: &str,
    ) -> Result<i64> {
        self.append_log(
            "log_sql",
            row_data([
                ("time", db_datetime()),
                ("sgbd", backend.as_str().to_string()),
                ("server", server.to_string()),
                ("query", query.to_string()),
                ("result", outcome.to_string()),
            ]),
        )
    }
}
