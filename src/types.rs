use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as statement parameters.
///
/// The same enum is used for every backend, both when binding parameters and when reading
/// result cells:
/// ```rust
/// use sql_unify::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Text/string value
    Text(String),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

/// The engine family behind a handle. Dialect decisions dispatch on this tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// MySQL / MariaDB (MySQL wire protocol)
    Mysql,
    /// `PostgreSQL` row-store network engine
    Postgres,
    /// Embedded single-file `SQLite`
    Sqlite,
    /// `LibSQL`, the edge-replicated `SQLite` variant (local file or remote endpoint)
    Libsql,
}

impl EngineKind {
    /// True for the `SQLite` family (embedded file and its edge-replicated variant).
    #[must_use]
    pub fn is_sqlite_family(self) -> bool {
        matches!(self, EngineKind::Sqlite | EngineKind::Libsql)
    }

    /// Table options appended to CREATE TABLE when the caller supplies none.
    #[must_use]
    pub fn default_table_options(self) -> &'static str {
        match self {
            EngineKind::Mysql => "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            EngineKind::Postgres | EngineKind::Sqlite | EngineKind::Libsql => "",
        }
    }

    /// Whether `CREATE INDEX IF NOT EXISTS` is accepted.
    #[must_use]
    pub fn supports_index_if_not_exists(self) -> bool {
        !matches!(self, EngineKind::Mysql)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineKind::Mysql => "mysql",
            EngineKind::Postgres => "postgres",
            EngineKind::Sqlite => "sqlite",
            EngineKind::Libsql => "libsql",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_defaults_deserialize_untagged() {
        let values: Vec<RowValues> = serde_json::from_str(r#"["x", 3, 1.5, true, null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                RowValues::Text("x".into()),
                RowValues::Int(3),
                RowValues::Float(1.5),
                RowValues::Bool(true),
                RowValues::Null,
            ]
        );
    }

    #[test]
    fn only_mysql_has_table_options() {
        assert!(!EngineKind::Mysql.default_table_options().is_empty());
        assert!(EngineKind::Sqlite.default_table_options().is_empty());
        assert!(EngineKind::Libsql.is_sqlite_family());
        assert!(!EngineKind::Postgres.is_sqlite_family());
    }
}
