use std::sync::Arc;

use deadpool_libsql::libsql::{Row, Rows, Value};

use crate::error::SqlUnifyError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Drain `rows` into a result set.
///
/// # Errors
/// Returns `SqlUnifyError::LibsqlError` if stepping or reading a cell fails.
pub async fn build_result_set(mut rows: Rows) -> Result<ResultSet, SqlUnifyError> {
    let column_count = rows.column_count();
    let column_names: Vec<String> = (0..column_count)
        .map(|i| {
            rows.column_name(i)
                .map_or_else(|| format!("column_{i}"), str::to_string)
        })
        .collect();
    let width = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    while let Some(row) = rows.next().await? {
        let mut row_values = Vec::with_capacity(width);
        for i in 0..column_count {
            row_values.push(libsql_extract_value(&row, i)?);
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

fn libsql_extract_value(row: &Row, idx: i32) -> Result<RowValues, SqlUnifyError> {
    Ok(match row.get_value(idx)? {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(bytes) => RowValues::Blob(bytes),
    })
}
