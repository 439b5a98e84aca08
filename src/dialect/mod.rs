//! Per-engine escaping and client-side parameter interpolation.
//!
//! Everything here is pure and dispatches on [`EngineKind`] only. Output of
//! [`escape_identifier`] and [`escape_literal`] is safe to splice directly into SQL text.

mod literal;

pub use literal::escape_literal;

use crate::error::SqlUnifyError;
use crate::statement::Statement;
use crate::translation::rewrite_placeholders;
use crate::types::EngineKind;

/// Quote an identifier for `kind`.
///
/// Dotted names (`schema.table`) are quoted per segment. Embedded quote characters are
/// doubled.
#[must_use]
pub fn escape_identifier(kind: EngineKind, name: &str) -> String {
    let quote = identifier_quote(kind);
    let mut out = String::with_capacity(name.len() + 2);
    for (i, segment) in name.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push(quote);
        for ch in segment.chars() {
            if ch == quote {
                out.push(quote);
            }
            out.push(ch);
        }
        out.push(quote);
    }
    out
}

/// Quote every identifier and join them with `", "`.
#[must_use]
pub fn escape_identifier_list<S: AsRef<str>>(kind: EngineKind, names: &[S]) -> String {
    names
        .iter()
        .map(|name| escape_identifier(kind, name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn identifier_quote(kind: EngineKind) -> char {
    match kind {
        EngineKind::Mysql => '`',
        EngineKind::Postgres | EngineKind::Sqlite | EngineKind::Libsql => '"',
    }
}

/// Substitute every placeholder of `statement` with an escaped literal.
///
/// Used where the engine cannot take bound parameters: DDL (column defaults) and the
/// `LibSQL` batch endpoint.
///
/// # Errors
/// Returns [`SqlUnifyError::ParameterError`] when the placeholder count and the parameter
/// count disagree.
pub fn interpolate(kind: EngineKind, statement: &Statement) -> Result<Statement, SqlUnifyError> {
    let mut highest = 0;
    let sql = rewrite_placeholders(&statement.sql, |ordinal| {
        highest = highest.max(ordinal);
        statement
            .params
            .get(ordinal - 1)
            .map(|value| escape_literal(kind, value))
            .ok_or_else(|| {
                SqlUnifyError::ParameterError(format!(
                    "placeholder {ordinal} has no parameter ({} supplied)",
                    statement.params.len()
                ))
            })
    })?
    .into_owned();

    if highest != statement.params.len() {
        return Err(SqlUnifyError::ParameterError(format!(
            "statement uses {highest} placeholders but {} parameters were supplied",
            statement.params.len()
        )));
    }

    Ok(Statement {
        sql,
        params: Vec::new(),
        tolerate_failure: statement.tolerate_failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    #[test]
    fn identifiers_per_dialect() {
        assert_eq!(escape_identifier(EngineKind::Mysql, "users"), "`users`");
        assert_eq!(escape_identifier(EngineKind::Mysql, "we`ird"), "`we``ird`");
        assert_eq!(escape_identifier(EngineKind::Postgres, "a\"b"), "\"a\"\"b\"");
        assert_eq!(
            escape_identifier(EngineKind::Sqlite, "main.users"),
            "\"main\".\"users\""
        );
        assert_eq!(
            escape_identifier_list(EngineKind::Libsql, &["a", "b"]),
            "\"a\", \"b\""
        );
    }

    #[test]
    fn interpolates_defaults() {
        let stmt = Statement::new(
            "CREATE TABLE t (a TEXT DEFAULT ?, b INTEGER DEFAULT ?)",
            vec![RowValues::Text("it's".into()), RowValues::Int(4)],
        );
        let out = interpolate(EngineKind::Sqlite, &stmt).unwrap();
        assert_eq!(
            out.sql,
            "CREATE TABLE t (a TEXT DEFAULT 'it''s', b INTEGER DEFAULT 4)"
        );
        assert!(out.params.is_empty());
    }

    #[test]
    fn interpolation_rejects_arity_mismatch() {
        let missing = Statement::new("SELECT ?, ?", vec![RowValues::Int(1)]);
        assert!(matches!(
            interpolate(EngineKind::Mysql, &missing),
            Err(SqlUnifyError::ParameterError(_))
        ));
        let extra = Statement::new("SELECT ?", vec![RowValues::Int(1), RowValues::Int(2)]);
        assert!(matches!(
            interpolate(EngineKind::Postgres, &extra),
            Err(SqlUnifyError::ParameterError(_))
        ));
    }

    #[test]
    fn interpolation_ignores_quoted_question_marks() {
        let stmt = Statement::new("SELECT '?' WHERE a = ?", vec![RowValues::Bool(true)]);
        let out = interpolate(EngineKind::Postgres, &stmt).unwrap();
        assert_eq!(out.sql, "SELECT '?' WHERE a = TRUE");
    }
}
