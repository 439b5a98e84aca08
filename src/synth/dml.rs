use crate::dialect::{escape_identifier, escape_identifier_list};
use crate::error::SqlUnifyError;
use crate::statement::Statement;
use crate::types::{EngineKind, RowValues};

use super::{require_name, require_names};

/// Build INSERT statements for `rows`.
///
/// The `SQLite` family gets one statement per row; the other engines get a single
/// multi-row VALUES statement. An empty `columns` slice omits the column list and takes the
/// arity from the first row.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] when `rows` is empty, a row's arity does not
/// match, or a name is blank.
pub fn build_multi_insert<S: AsRef<str>>(
    kind: EngineKind,
    table: &str,
    columns: &[S],
    rows: &[Vec<RowValues>],
) -> Result<Vec<Statement>, SqlUnifyError> {
    require_name("table", table)?;
    require_names("column", columns)?;
    let Some(first) = rows.first() else {
        return Err(SqlUnifyError::ValidationError(format!(
            "insert into {table} needs at least one row"
        )));
    };
    let arity = if columns.is_empty() {
        first.len()
    } else {
        columns.len()
    };
    if arity == 0 {
        return Err(SqlUnifyError::ValidationError(format!(
            "insert into {table} has no values"
        )));
    }
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != arity) {
        return Err(SqlUnifyError::ValidationError(format!(
            "row {index} has {} values, expected {arity}",
            row.len()
        )));
    }

    let head = if columns.is_empty() {
        format!("INSERT INTO {} VALUES ", escape_identifier(kind, table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ",
            escape_identifier(kind, table),
            escape_identifier_list(kind, columns)
        )
    };
    let tuple = format!("({})", vec!["?"; arity].join(", "));

    if kind.is_sqlite_family() {
        return Ok(rows
            .iter()
            .map(|row| Statement::new(format!("{head}{tuple}"), row.clone()))
            .collect());
    }

    let mut sql = head;
    sql.push_str(&vec![tuple.as_str(); rows.len()].join(", "));
    let params = rows.iter().flatten().cloned().collect();
    Ok(vec![Statement::new(sql, params)])
}

/// Build upserts: the inserts of [`build_multi_insert`] with a conflict clause that
/// overwrites every non-key column.
///
/// When every column is a key column the conflict is ignored instead.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] when `columns` or `primary_key` is empty, a
/// key column is missing from `columns`, or the insert itself fails validation.
pub fn build_multi_update<S: AsRef<str>, K: AsRef<str>>(
    kind: EngineKind,
    table: &str,
    primary_key: &[K],
    columns: &[S],
    rows: &[Vec<RowValues>],
) -> Result<Vec<Statement>, SqlUnifyError> {
    if columns.is_empty() {
        return Err(SqlUnifyError::ValidationError(format!(
            "upsert into {table} needs explicit columns"
        )));
    }
    if primary_key.is_empty() {
        return Err(SqlUnifyError::ValidationError(format!(
            "upsert into {table} needs primary key columns"
        )));
    }
    for key in primary_key {
        let key = key.as_ref();
        if !columns.iter().any(|c| c.as_ref() == key) {
            return Err(SqlUnifyError::ValidationError(format!(
                "primary key column {key} is not among the upserted columns"
            )));
        }
    }

    let mut statements = build_multi_insert(kind, table, columns, rows)?;
    let clause = conflict_clause(kind, primary_key, columns);
    for statement in &mut statements {
        statement.sql.push(' ');
        statement.sql.push_str(&clause);
    }
    Ok(statements)
}

fn conflict_clause<S: AsRef<str>, K: AsRef<str>>(
    kind: EngineKind,
    primary_key: &[K],
    columns: &[S],
) -> String {
    let updated: Vec<String> = columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !primary_key.iter().any(|k| k.as_ref() == *c))
        .map(|c| escape_identifier(kind, c))
        .collect();

    match kind {
        EngineKind::Mysql => {
            if updated.is_empty() {
                let key = escape_identifier(kind, primary_key[0].as_ref());
                format!("ON DUPLICATE KEY UPDATE {key} = {key}")
            } else {
                let sets: Vec<String> = updated
                    .iter()
                    .map(|c| format!("{c} = VALUES({c})"))
                    .collect();
                format!("ON DUPLICATE KEY UPDATE {}", sets.join(", "))
            }
        }
        EngineKind::Postgres | EngineKind::Sqlite | EngineKind::Libsql => {
            let target = escape_identifier_list(kind, primary_key);
            if updated.is_empty() {
                format!("ON CONFLICT ({target}) DO NOTHING")
            } else {
                let sets: Vec<String> = updated
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect();
                format!("ON CONFLICT ({target}) DO UPDATE SET {}", sets.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<RowValues>> {
        vec![
            vec![RowValues::Text("a".into()), RowValues::Int(1)],
            vec![RowValues::Text("b".into()), RowValues::Int(2)],
        ]
    }

    #[test]
    fn sqlite_family_inserts_one_row_per_statement() {
        let stmts = build_multi_insert(EngineKind::Sqlite, "t", &["c1", "c2"], &rows()).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].sql, r#"INSERT INTO "t" ("c1", "c2") VALUES (?, ?)"#);
        assert_eq!(stmts[1].params, rows()[1]);
    }

    #[test]
    fn network_engines_insert_all_rows_at_once() {
        let stmts = build_multi_insert(EngineKind::Mysql, "t", &["c1", "c2"], &rows()).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(
            stmts[0].sql,
            "INSERT INTO `t` (`c1`, `c2`) VALUES (?, ?), (?, ?)"
        );
        assert_eq!(stmts[0].params.len(), 4);
        assert_eq!(stmts[0].params[2], RowValues::Text("b".into()));
    }

    #[test]
    fn empty_columns_omit_column_list() {
        let none: &[&str] = &[];
        let stmts = build_multi_insert(EngineKind::Postgres, "t", none, &rows()).unwrap();
        assert_eq!(stmts[0].sql, r#"INSERT INTO "t" VALUES (?, ?), (?, ?)"#);

        let ragged = vec![vec![RowValues::Int(1)], vec![RowValues::Int(1), RowValues::Int(2)]];
        assert!(matches!(
            build_multi_insert(EngineKind::Postgres, "t", none, &ragged),
            Err(SqlUnifyError::ValidationError(_))
        ));
    }

    #[test]
    fn insert_validation() {
        let empty: Vec<Vec<RowValues>> = Vec::new();
        assert!(matches!(
            build_multi_insert(EngineKind::Sqlite, "t", &["a"], &empty),
            Err(SqlUnifyError::ValidationError(_))
        ));
        assert!(matches!(
            build_multi_insert(EngineKind::Sqlite, "t", &["a"], &rows()),
            Err(SqlUnifyError::ValidationError(_))
        ));
    }

    #[test]
    fn upsert_clauses() {
        let pg = build_multi_update(EngineKind::Postgres, "t", &["c1"], &["c1", "c2"], &rows())
            .unwrap();
        assert!(
            pg[0]
                .sql
                .ends_with(r#"ON CONFLICT ("c1") DO UPDATE SET "c2" = excluded."c2""#)
        );

        let my = build_multi_update(EngineKind::Mysql, "t", &["c1"], &["c1", "c2"], &rows())
            .unwrap();
        assert!(my[0].sql.ends_with("ON DUPLICATE KEY UPDATE `c2` = VALUES(`c2`)"));

        let lite = build_multi_update(EngineKind::Sqlite, "t", &["c1"], &["c1", "c2"], &rows())
            .unwrap();
        assert_eq!(lite.len(), 2);
        assert!(lite.iter().all(|s| s.sql.contains("ON CONFLICT")));
    }

    #[test]
    fn upsert_with_only_key_columns() {
        let keys = vec![vec![RowValues::Int(1)]];
        let pg = build_multi_update(EngineKind::Postgres, "t", &["id"], &["id"], &keys).unwrap();
        assert!(pg[0].sql.ends_with(r#"ON CONFLICT ("id") DO NOTHING"#));
        let my = build_multi_update(EngineKind::Mysql, "t", &["id"], &["id"], &keys).unwrap();
        assert!(my[0].sql.ends_with("ON DUPLICATE KEY UPDATE `id` = `id`"));
    }

    #[test]
    fn upsert_validation() {
        let none: &[&str] = &[];
        assert!(matches!(
            build_multi_update(EngineKind::Sqlite, "t", &["c1"], none, &rows()),
            Err(SqlUnifyError::ValidationError(_))
        ));
        assert!(matches!(
            build_multi_update(EngineKind::Sqlite, "t", none, &["c1", "c2"], &rows()),
            Err(SqlUnifyError::ValidationError(_))
        ));
        assert!(matches!(
            build_multi_update(EngineKind::Sqlite, "t", &["id"], &["c1", "c2"], &rows()),
            Err(SqlUnifyError::ValidationError(_))
        ));
    }
}
