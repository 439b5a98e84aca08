use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// Rows returned by a statement.
///
/// Empty for mutations. Column names are stored once and shared by all rows.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the statement
    pub results: Vec<CustomDbRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
            column_index: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row; ignored until column names are set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(column_index)) = (&self.column_names, &self.column_index)
        {
            self.results.push(CustomDbRow {
                column_names: Arc::clone(column_names),
                rows: row_values,
                column_index: Arc::clone(column_index),
            });
        }
    }

    /// Append all rows of `other`, adopting its column names if this set has none.
    pub fn extend(&mut self, other: ResultSet) {
        if self.column_names.is_none() {
            self.column_names = other.column_names;
            self.column_index = other.column_index;
        }
        self.results.extend(other.results);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// First cell of the first row, handy for `COUNT(*)` style queries.
    #[must_use]
    pub fn scalar(&self) -> Option<&RowValues> {
        self.results.first().and_then(|row| row.get_by_index(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_lookup() {
        let mut rs = ResultSet::with_capacity(2);
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty(), "rows before column names are dropped");

        rs.set_column_names(Arc::new(vec!["c1".into(), "C2".into()]));
        rs.add_row_values(vec![RowValues::Text("a".into()), RowValues::Int(1)]);
        rs.add_row_values(vec![RowValues::Text("b".into()), RowValues::Int(2)]);
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[1].get("c1"), Some(&RowValues::Text("b".into())));
        assert_eq!(rs.results[0].get("c2"), Some(&RowValues::Int(1)));
        assert_eq!(rs.scalar(), Some(&RowValues::Text("a".into())));
    }
}
