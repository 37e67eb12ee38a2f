//! # sysdb
//!
//! Synchronous, backend-agnostic system database layer.
//!
//! `sysdb` is the data-access core of an embedded application framework:
//! a small query builder that expresses CRUD operations and boolean
//! predicate trees independently of the underlying SQL engine, plus a
//! facade that persists configuration values, a registry key-value store,
//! and structured logs on top of it.
//!
//! ## Architecture
//!
//! - [`models`]: the predicate tree ([`Criterion`], [`CriterionGroup`]),
//!   the tagged literal type ([`SqlValue`]), and the uniform operation
//!   outcome ([`QueryResult`]).
//! - [`engine`]: the [`Engine`] contract with two conforming backends,
//!   an embedded `SQLite` file ([`SqliteEngine`]) and a networked
//!   `PostgreSQL` server ([`PostgresEngine`]).
//! - [`system`]: the [`SystemDb`] facade with table-name resolution,
//!   typed configuration, registry upsert, message catalogue, and
//!   append-only categorized logs.
//! - [`config`]: [`SysDbConfig`] with defaults and a TOML overlay.
//!
//! Execution is strictly single-threaded and blocking: one live
//! connection per engine, one operation at a time, no pooling, no
//! transactions, no timeouts. Engine operations never panic and never
//! propagate backend errors as Rust errors; every call returns a
//! [`QueryResult`] carrying its own [`Error`] on failure.
//!
//! ## Security note
//!
//! Statement text is built by string concatenation with a
//! quote-iff-textual rule and **no escaping** of quote characters inside
//! values. This reproduces the wire-compatible behavior of the system
//! this crate replaces; callers are responsible for the provenance of
//! every column name, operator, and value they pass in. All rendering
//! funnels through [`engine::sql`] so a parameterized implementation can
//! be substituted without touching call sites.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sysdb::{SysDbConfig, SystemDb, ConfigKind};
//!
//! let mut db = SystemDb::new(SysDbConfig::default());
//! if db.connect() {
//!     db.set_config("timezone", ConfigKind::String, "UTC", "")?;
//! }
//! ```

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod engine;
pub mod models;
pub mod system;

// Re-exports for convenience
pub use config::{NetworkDsn, SysDbConfig};
pub use engine::{Engine, PostgresEngine, SqliteEngine};
pub use models::{
    Backend, Criterion, CriterionGroup, QueryKind, QueryResult, Row, SqlValue, Where,
};
pub use system::{ConfigKind, ConfigValue, SystemDb};

/// Error type for sysdb operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Connection` | Backend unreachable, bad credentials, required file missing |
/// | `NotConnected` | Any operation attempted on an unbound or disconnected engine |
/// | `Query` | Backend rejected or failed a generated statement |
/// | `UnknownTable` | A logical table name has no entry in the table map |
/// | `Coercion` | A stored configuration value does not parse under its declared type |
/// | `Config` | The TOML configuration file cannot be read or parsed |
///
/// `Connection` is surfaced through `connect() -> bool` plus a log entry;
/// everything else is carried inside [`QueryResult`] or returned from
/// facade methods. Nothing in this crate terminates the process;
/// escalating a connection failure to a fatal condition is caller policy.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The backend could not be reached or opened.
    #[error("{backend} connection failed: {cause}")]
    Connection {
        /// Backend the connection was attempted against.
        backend: models::Backend,
        /// The underlying driver error.
        cause: String,
    },

    /// An operation was attempted while no connection is live.
    #[error("database not connected")]
    NotConnected,

    /// The backend rejected or failed an executed statement.
    #[error("query error, query: {query}: {cause}")]
    Query {
        /// The fully generated statement text.
        query: String,
        /// The underlying driver error.
        cause: String,
    },

    /// A logical table name resolved to nothing.
    ///
    /// Raised by facade operations instead of silently querying an
    /// empty-named table.
    #[error("unknown logical table name: {name}")]
    UnknownTable {
        /// The logical name that was looked up.
        name: String,
    },

    /// A stored configuration value failed to parse under its declared
    /// type.
    #[error("configuration '{name}' does not parse as {declared}: {cause}")]
    Coercion {
        /// Configuration row name.
        name: String,
        /// The declared type tag stored with the row.
        declared: String,
        /// Parse failure detail.
        cause: String,
    },

    /// The configuration file could not be loaded.
    #[error("configuration load failed: {cause}")]
    Config {
        /// I/O or deserialization detail.
        cause: String,
    },
}

/// Result type alias for sysdb operations.
pub type Result<T> = std::result::Result<T, Error>;
