use std::sync::Arc;

use rusqlite::types::Value;

use crate::error::SqlUnifyError;
use crate::results::ResultSet;
use crate::statement::{Statement, StatementMetadata, StatementResult};

use super::params::{Params, sqlite_value_to_row_value};

/// Build a result set from a prepared `SQLite` statement.
///
/// # Errors
/// Returns `SqlUnifyError::SqliteError` if stepping the statement or reading a cell fails.
pub fn build_result_set(
    stmt: &mut rusqlite::Statement<'_>,
    params: &Params,
) -> Result<ResultSet, SqlUnifyError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows = stmt.query(&params.as_refs()[..])?;
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value: Value = row.get(i)?;
            row_values.push(sqlite_value_to_row_value(value));
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

/// Run one statement on `conn`.
///
/// Statements that produce columns return their rows; everything else is executed and
/// reports the change count, plus the last rowid for inserts.
///
/// # Errors
/// Returns `SqlUnifyError::SqliteError` on prepare or execution failure.
pub fn execute_statement(
    conn: &rusqlite::Connection,
    statement: &Statement,
) -> Result<StatementResult, SqlUnifyError> {
    let params = Params::convert(&statement.params);
    let mut stmt = conn.prepare(&statement.sql)?;
    if stmt.column_count() > 0 {
        let rows = build_result_set(&mut stmt, &params)?;
        return Ok(StatementResult::from_rows(rows, statement.clone()));
    }

    let affected = stmt.execute(&params.as_refs()[..])? as u64;
    let last_insert_id = (affected > 0 && statement.is_insert())
        .then(|| conn.last_insert_rowid());
    Ok(StatementResult::mutation(
        StatementMetadata::mutation(affected, last_insert_id),
        statement.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    #[test]
    fn selects_return_rows_and_inserts_report_rowid() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        execute_statement(&conn, &"CREATE TABLE t (a INTEGER, b TEXT)".into()).unwrap();

        let insert = Statement::new(
            "INSERT INTO t VALUES (?, ?)",
            vec![RowValues::Int(5), RowValues::Text("five".into())],
        );
        let result = execute_statement(&conn, &insert).unwrap();
        assert_eq!(result.metadata.affected_rows, 1);
        assert_eq!(result.metadata.last_insert_id, Some(1));
        assert!(result.rows.is_empty());

        let select = execute_statement(&conn, &"select a, b from t".into()).unwrap();
        assert_eq!(select.metadata.row_count, 1);
        assert_eq!(select.metadata.affected_rows, 0);
        assert_eq!(select.rows.results[0].get("b"), Some(&RowValues::Text("five".into())));
    }

    #[test]
    fn updates_do_not_report_an_insert_id() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1), (2);")
            .unwrap();
        let result = execute_statement(&conn, &"UPDATE t SET a = a + 1".into()).unwrap();
        assert_eq!(result.metadata.changed_rows, 2);
        assert_eq!(result.metadata.last_insert_id, None);
    }
}
