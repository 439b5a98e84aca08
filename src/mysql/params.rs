use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;

use crate::types::RowValues;

/// Bind `params` positionally onto `query`.
pub fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[RowValues],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            RowValues::Int(value) => query.bind(*value),
            RowValues::Float(value) => query.bind(*value),
            RowValues::Text(value) => query.bind(value.clone()),
            RowValues::Bool(value) => query.bind(*value),
            RowValues::Timestamp(value) => query.bind(*value),
            RowValues::Null => query.bind(None::<String>),
            RowValues::JSON(value) => query.bind(value.clone()),
            RowValues::Blob(value) => query.bind(value.clone()),
        };
    }
    query
}
