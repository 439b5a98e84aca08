use serde::{Deserialize, Serialize};

use crate::results::ResultSet;
use crate::types::RowValues;

/// A SQL template with positional `?` placeholders and its bound values.
///
/// Values are substituted left-to-right. `tolerate_failure` only matters inside a
/// multi-statement transaction: a failing tolerant statement is skipped instead of aborting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<RowValues>,
    #[serde(default)]
    pub tolerate_failure: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            params,
            tolerate_failure: false,
        }
    }

    pub fn without_params(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// True for INSERT/REPLACE, the statements that report a meaningful last insert id.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        let head = self.sql.trim_start();
        ["INSERT", "REPLACE"].iter().any(|kw| {
            head.get(..kw.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw))
        })
    }

    /// Mark this statement as failure-tolerant.
    #[must_use]
    pub fn tolerant(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Statement::without_params(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Statement::without_params(sql)
    }
}

/// Execution metadata reported by a backend.
///
/// Embedded engines report real change counts; network engines distinguish mutation
/// acknowledgements from row sets. For pure selects only `row_count` is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementMetadata {
    pub changed_rows: u64,
    pub affected_rows: u64,
    pub last_insert_id: Option<i64>,
    pub row_count: usize,
}

impl StatementMetadata {
    #[must_use]
    pub fn mutation(affected_rows: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            changed_rows: affected_rows,
            affected_rows,
            last_insert_id,
            row_count: 0,
        }
    }

    #[must_use]
    pub fn rows(row_count: usize) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }

    /// Sum counters from `other` into `self`; the latest insert id wins.
    pub fn accumulate(&mut self, other: &StatementMetadata) {
        self.changed_rows += other.changed_rows;
        self.affected_rows += other.affected_rows;
        self.row_count += other.row_count;
        if other.last_insert_id.is_some() {
            self.last_insert_id = other.last_insert_id;
        }
    }
}

/// Rows, metadata and the statement that produced them.
#[derive(Debug, Clone)]
pub struct StatementResult {
    pub rows: ResultSet,
    pub metadata: StatementMetadata,
    pub statement: Statement,
}

impl StatementResult {
    #[must_use]
    pub fn new(rows: ResultSet, metadata: StatementMetadata, statement: Statement) -> Self {
        Self {
            rows,
            metadata,
            statement,
        }
    }

    /// Result for a mutation: no rows.
    #[must_use]
    pub fn mutation(metadata: StatementMetadata, statement: Statement) -> Self {
        Self::new(ResultSet::default(), metadata, statement)
    }

    /// Result for a row-returning statement.
    #[must_use]
    pub fn from_rows(rows: ResultSet, statement: Statement) -> Self {
        let metadata = StatementMetadata::rows(rows.len());
        Self::new(rows, metadata, statement)
    }

    /// Fold several results into one, summing metadata and concatenating rows.
    ///
    /// The originating statement of the aggregate is the first statement; `None` when the
    /// input is empty.
    #[must_use]
    pub fn aggregate(results: Vec<StatementResult>) -> Option<StatementResult> {
        let mut iter = results.into_iter();
        let mut total = iter.next()?;
        for result in iter {
            total.metadata.accumulate(&result.metadata);
            total.rows.extend(result.rows);
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_sums_metadata() {
        let a = StatementResult::mutation(
            StatementMetadata::mutation(2, Some(10)),
            Statement::without_params("INSERT 1"),
        );
        let b = StatementResult::mutation(
            StatementMetadata::mutation(3, Some(13)),
            Statement::without_params("INSERT 2"),
        );
        let total = StatementResult::aggregate(vec![a, b]).unwrap();
        assert_eq!(total.metadata.affected_rows, 5);
        assert_eq!(total.metadata.changed_rows, 5);
        assert_eq!(total.metadata.last_insert_id, Some(13));
        assert_eq!(total.statement.sql, "INSERT 1");
        assert!(StatementResult::aggregate(Vec::new()).is_none());
    }
}
