//! Typed configuration values and coercion.
//!
//! Configuration rows store their value as text plus a declared type
//! tag. Reads coerce the text back into a typed value. Policy:
//! - `string` → text as stored;
//! - `int` / `float` / `json` → parsed, a parse failure is a hard
//!   [`Error::Coercion`];
//! - any other tag falls through to raw text.

use crate::{Error, Result};
use std::fmt;

/// Declared type tag of a configuration row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// Plain text.
    String,
    /// Integer, parsed on read.
    Int,
    /// Floating-point, parsed on read.
    Float,
    /// JSON document, decoded on read.
    Json,
    /// Uninterpreted text.
    Raw,
}

impl ConfigKind {
    /// Canonical lowercase tag, as stored in the `type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Json => "json",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value after coercion under its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Declared `string`.
    Str(String),
    /// Declared `int`.
    Int(i64),
    /// Declared `float`.
    Float(f64),
    /// Declared `json`, decoded.
    Json(serde_json::Value),
    /// Unrecognized declared type; text as stored.
    Raw(String),
}

impl ConfigValue {
    /// The textual content for `Str` and `Raw` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content for `Int` values.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float content for `Float` values.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The decoded document for `Json` values.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Coerces stored text under its declared type tag.
///
/// `name` only feeds error reporting. Tag matching is
/// case-insensitive, as the reader of the original store was.
///
/// # Errors
///
/// Returns [`Error::Coercion`] when a declared `int`, `float`, or
/// `json` value does not parse.
pub fn coerce(name: &str, declared: &str, value: &str) -> Result<ConfigValue> {
    let coercion_error = |cause: String| Error::Coercion {
        name: name.to_string(),
        declared: declared.to_string(),
        cause,
    };

    match declared.to_lowercase().as_str() {
        "string" => Ok(ConfigValue::Str(value.to_string())),
        "int" => value
            .parse::<i64>()
            .map(ConfigValue::Int)
            .map_err(|e| coercion_error(e.to_string())),
        "float" => value
            .parse::<f64>()
            .map(ConfigValue::Float)
            .map_err(|e| coercion_error(e.to_string())),
        "json" => serde_json::from_str(value)
            .map(ConfigValue::Json)
            .map_err(|e| coercion_error(e.to_string())),
        _ => Ok(ConfigValue::Raw(value.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("string", "UTC" => ConfigValue::Str("UTC".to_string()); "string as-is")]
    #[test_case("int", "42" => ConfigValue::Int(42); "int parses")]
    #[test_case("float", "2.5" => ConfigValue::Float(2.5); "float parses")]
    #[test_case("INT", "7" => ConfigValue::Int(7); "tag is case-insensitive")]
    #[test_case("blob", "abc" => ConfigValue::Raw("abc".to_string()); "unknown tag falls through to raw")]
    fn coercion_matrix(declared: &str, value: &str) -> ConfigValue {
        coerce("k", declared, value).unwrap()
    }

    #[test]
    fn json_decodes_structures() {
        let v = coerce("k", "json", r#"{"a":[1,2]}"#).unwrap();
        assert_eq!(
            v.as_json().and_then(|j| j["a"][1].as_i64()),
            Some(2)
        );
    }

    #[test]
    fn declared_parse_failures_are_hard_errors() {
        assert!(matches!(
            coerce("k", "int", "forty-two"),
            Err(Error::Coercion { .. })
        ));
        assert!(matches!(
            coerce("k", "float", ""),
            Err(Error::Coercion { .. })
        ));
        assert!(matches!(
            coerce("k", "json", "{broken"),
            Err(Error::Coercion { .. })
        ));
    }
}
