use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlColumn, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::SqlUnifyError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set from fetched rows, naming columns from the prepared statement.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    columns: &[MySqlColumn],
    rows: &[MySqlRow],
) -> Result<ResultSet, SqlUnifyError> {
    let column_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(mysql_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

/// Extracts a `RowValues` from a MySQL row at the given index.
///
/// # Errors
/// Returns `SqlUnifyError::MysqlError` when the cell cannot be decoded.
pub fn mysql_extract_value(row: &MySqlRow, idx: usize) -> Result<RowValues, SqlUnifyError> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(RowValues::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => RowValues::Bool(row.try_get::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            RowValues::Int(row.try_get::<i64, _>(idx)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let value = row.try_get::<u64, _>(idx)?;
            i64::try_from(value).map_or_else(|_| RowValues::Text(value.to_string()), RowValues::Int)
        }
        "FLOAT" => RowValues::Float(f64::from(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => RowValues::Float(row.try_get::<f64, _>(idx)?),
        "DATETIME" | "TIMESTAMP" => RowValues::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)?
            .and_hms_opt(0, 0, 0)
            .map_or(RowValues::Null, RowValues::Timestamp),
        "TIME" => RowValues::Text(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "JSON" => RowValues::JSON(row.try_get::<serde_json::Value, _>(idx)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            RowValues::Blob(row.try_get::<Vec<u8>, _>(idx)?)
        }
        // char/varchar/text, enum/set and decimals travel as text.
        _ => RowValues::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}
