//! Structured table descriptions consumed by the statement synthesizer.

use serde::{Deserialize, Serialize};

use crate::types::RowValues;

/// Referential action for ON UPDATE / ON DELETE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// A foreign-key reference from one column to `table(column)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            on_update: None,
            on_delete: None,
        }
    }

    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// Column description for CREATE TABLE.
///
/// ```rust
/// use sql_unify::prelude::*;
///
/// let owner = Column::new("owner_id", "integer")
///     .not_null()
///     .references(ForeignKey::new("users", "id").on_delete(ReferentialAction::Cascade));
/// let email = Column::new("email", "varchar(255)").unique();
/// let active = Column::new("active", "boolean").default(true);
/// # let _ = (owner, email, active);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<RowValues>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub foreign_key: Option<ForeignKey>,
}

fn nullable_by_default() -> bool {
    true
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            default: None,
            unique: false,
            foreign_key: None,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<RowValues>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }
}

/// Kind of secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Index,
    Unique,
}

impl IndexKind {
    /// Prefix used when deriving index names.
    #[must_use]
    pub fn name_prefix(self) -> &'static str {
        match self {
            IndexKind::Index => "idx",
            IndexKind::Unique => "uniq",
        }
    }

    #[must_use]
    pub fn create_keyword(self) -> &'static str {
        match self {
            IndexKind::Index => "CREATE INDEX",
            IndexKind::Unique => "CREATE UNIQUE INDEX",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_json_uses_defaults() {
        let col: Column = serde_json::from_str(
            r#"{"name": "c1", "type": "varchar(255)", "foreign_key": {"table": "p", "column": "id", "on_delete": "SET_NULL"}}"#,
        )
        .unwrap();
        assert!(col.nullable);
        assert!(!col.unique);
        assert_eq!(col.default, None);
        let fk = col.foreign_key.unwrap();
        assert_eq!(fk.on_delete, Some(ReferentialAction::SetNull));
        assert_eq!(fk.on_update, None);
    }
}
