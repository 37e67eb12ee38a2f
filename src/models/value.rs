//! Tagged SQL literal values.
//!
//! The system this layer replaces decided quoting by inspecting the
//! runtime type of each value. Here the kind is an explicit tag chosen at
//! the call site: textual values are quoted, everything else renders
//! bare. The rendering contract is load-bearing: generated statement
//! text is compared byte-for-byte by the test suite and by downstream
//! audit tooling.

use std::fmt;

/// Default quote character for textual literals.
pub const DEFAULT_QUOTE: char = '\'';

/// A SQL literal with an explicit kind.
///
/// Quoting is decided by the variant, never by runtime inspection:
/// only [`SqlValue::Text`] is quoted when rendered.
///
/// # Examples
///
/// ```
/// use sysdb::SqlValue;
///
/// assert_eq!(SqlValue::from("UTC").render('\''), "'UTC'");
/// assert_eq!(SqlValue::from(42).render('\''), "42");
/// assert_eq!(SqlValue::Null.render('\''), "NULL");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean literal, rendered as `true`/`false`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// Textual literal, wrapped in the quote character when rendered.
    Text(String),
}

impl SqlValue {
    /// Whether this value renders quoted.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Renders the value as a SQL literal.
    ///
    /// Textual values are wrapped in `quote` with no escaping applied to
    /// the content (see the crate-level security note). All other kinds
    /// render bare.
    #[must_use]
    pub fn render(&self, quote: char) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("{quote}{s}{quote}"),
        }
    }

    /// Renders the value without quoting, for `$N` placeholder
    /// substitution where the caller controls surrounding syntax.
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            other => other.render(DEFAULT_QUOTE),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_QUOTE))
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for SqlValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<Self>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
