//! Schema, data and transaction operations shared by every engine.

use tracing::{debug, warn};

use super::EngineHandle;
use crate::dialect::{self, interpolate};
use crate::error::SqlUnifyError;
use crate::schema::{Column, IndexKind};
use crate::statement::{Statement, StatementResult};
use crate::synth::{self, TABLE_NAME_COLUMN};
use crate::types::RowValues;

#[cfg(feature = "sqlite")]
use crate::sqlite::SerializerStats;

impl EngineHandle {
    /// Names of the tables in the current database, or in `database` when given.
    ///
    /// `PostgreSQL` reads `database` as a schema name and the `SQLite` family as the name of
    /// an attached database.
    ///
    /// # Errors
    /// `ClosedError` after close; the driver error otherwise.
    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<String>, SqlUnifyError> {
        let statement = synth::build_list_tables(self.kind(), database);
        let result = self.execute_one(statement, true).await?;
        result
            .rows
            .results
            .iter()
            .map(|row| match row.get(TABLE_NAME_COLUMN) {
                Some(RowValues::Text(name)) => Ok(name.clone()),
                other => Err(SqlUnifyError::ExecutionError(format!(
                    "catalog row has no text {TABLE_NAME_COLUMN}: {other:?}"
                ))),
            })
            .collect()
    }

    /// Create `name` with `columns`; an empty `primary_key` creates a table without one.
    ///
    /// Unique columns get their own unique index in the same batch.
    ///
    /// # Errors
    /// `ValidationError` for malformed input (nothing is executed); a `TransactionError`
    /// when a statement fails inside the transaction.
    pub async fn create_table<S: AsRef<str>>(
        &self,
        name: &str,
        columns: &[Column],
        primary_key: &[S],
        table_options: Option<&str>,
        use_transaction: bool,
    ) -> Result<(), SqlUnifyError> {
        let kind = self.kind();
        let statements =
            synth::build_create_table(kind, name, columns, primary_key, table_options)?;
        let statements = self.inline_params(statements)?;
        debug!(%kind, table = name, statements = statements.len(), "creating table");
        self.execute_all(statements, use_transaction).await?;
        Ok(())
    }

    /// Create an index over `fields`. Creating an index that already exists is not an error.
    ///
    /// # Errors
    /// `ValidationError` for an empty field list; the driver error otherwise.
    pub async fn create_index<S: AsRef<str>>(
        &self,
        table: &str,
        fields: &[S],
        index_kind: IndexKind,
        use_transaction: bool,
    ) -> Result<(), SqlUnifyError> {
        let statement = synth::build_create_index(self.kind(), table, fields, index_kind)?;
        self.execute_all(vec![statement], use_transaction).await?;
        Ok(())
    }

    /// Drop each table if it exists, in one transaction.
    ///
    /// # Errors
    /// `ValidationError` for an empty list; a `TransactionError` if a drop fails.
    pub async fn drop_table<S: AsRef<str>>(
        &self,
        tables: &[S],
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        let statements = synth::build_drop_table(self.kind(), tables)?;
        self.execute_all(statements, true).await
    }

    /// Remove every row from each table. Failures are logged and reported as `false`.
    ///
    /// The `SQLite` family deletes rows instead of truncating, so autoincrement counters
    /// are kept there.
    pub async fn truncate<S: AsRef<str>>(&self, tables: &[S], use_transaction: bool) -> bool {
        let outcome = match synth::build_truncate(self.kind(), tables) {
            Ok(statements) => self.execute_all(statements, use_transaction).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(_) => true,
            Err(err) => {
                warn!(kind = %self.kind(), error = %err, "truncate failed");
                false
            }
        }
    }

    /// Run one statement and return its rows and metadata.
    ///
    /// `sql` uses `?` placeholders regardless of engine.
    ///
    /// # Errors
    /// `ClosedError` after close; the driver error otherwise.
    pub async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, SqlUnifyError> {
        self.execute_one(Statement::new(sql, params.to_vec()), true)
            .await
    }

    /// Run one statement for its side effects; the result carries metadata only.
    ///
    /// # Errors
    /// `ClosedError` after close; the driver error otherwise.
    pub async fn run(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, SqlUnifyError> {
        self.execute_one(Statement::new(sql, params.to_vec()), false)
            .await
    }

    /// Insert `rows` into `table`.
    ///
    /// The returned result aggregates every statement's metadata.
    ///
    /// # Errors
    /// `ValidationError` for empty or ragged rows (nothing is executed); a
    /// `TransactionError` if an insert fails, after which no row of the call is kept when
    /// `use_transaction` is set.
    pub async fn multi_insert<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        rows: &[Vec<RowValues>],
        use_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        let statements = synth::build_multi_insert(self.kind(), table, columns, rows)?;
        self.aggregate(statements, use_transaction).await
    }

    /// Upsert `rows` keyed by `primary_key`: existing rows get their non-key columns
    /// overwritten, missing rows are inserted.
    ///
    /// # Errors
    /// As [`multi_insert`](Self::multi_insert); additionally `ValidationError` when
    /// `primary_key` is empty or names a column absent from `columns`.
    pub async fn multi_update<S: AsRef<str>, K: AsRef<str>>(
        &self,
        table: &str,
        primary_key: &[K],
        columns: &[S],
        rows: &[Vec<RowValues>],
        use_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        let statements =
            synth::build_multi_update(self.kind(), table, primary_key, columns, rows)?;
        self.aggregate(statements, use_transaction).await
    }

    /// Run `statements` atomically, in order.
    ///
    /// Statements marked tolerant may fail without aborting; their results are omitted.
    ///
    /// # Errors
    /// A `TransactionError` naming the failing statement's index. The transaction has been
    /// rolled back by the time it is returned.
    pub async fn transaction(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        self.execute_all(statements, true).await
    }

    /// Render `value` as a literal for this engine.
    #[must_use]
    pub fn escape(&self, value: &RowValues) -> String {
        dialect::escape_literal(self.kind(), value)
    }

    /// Quote `name` as an identifier for this engine.
    #[must_use]
    pub fn escape_identifier(&self, name: &str) -> String {
        dialect::escape_identifier(self.kind(), name)
    }

    /// Read a pragma. Only the embedded `SQLite` engine has pragmas.
    ///
    /// # Errors
    /// `Unimplemented` on other engines; `ValidationError` for a malformed name.
    pub async fn pragma_get(&self, name: &str) -> Result<Option<RowValues>, SqlUnifyError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.pragma_get(name).await,
            #[allow(unreachable_patterns)]
            _ => Err(self.no_pragmas()),
        }
    }

    /// Set a pragma and return the value it reports afterwards.
    ///
    /// # Errors
    /// As [`pragma_get`](Self::pragma_get).
    pub async fn pragma_set(
        &self,
        name: &str,
        value: RowValues,
    ) -> Result<Option<RowValues>, SqlUnifyError> {
        match self {
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.pragma_set(name, value).await,
            #[allow(unreachable_patterns)]
            _ => Err(self.no_pragmas()),
        }
    }

    /// Queue counters of the embedded engine's write serializer.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn serializer_stats(&self) -> Option<SerializerStats> {
        match self {
            EngineHandle::Sqlite(engine) => Some(engine.serializer_stats()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn no_pragmas(&self) -> SqlUnifyError {
        SqlUnifyError::Unimplemented(format!("{} has no pragmas", self.kind()))
    }

    /// DDL cannot take bound parameters on every engine, so values are inlined as literals.
    fn inline_params(&self, statements: Vec<Statement>) -> Result<Vec<Statement>, SqlUnifyError> {
        let kind = self.kind();
        statements
            .into_iter()
            .map(|statement| {
                if statement.params.is_empty() {
                    Ok(statement)
                } else {
                    interpolate(kind, &statement)
                }
            })
            .collect()
    }

    async fn aggregate(
        &self,
        statements: Vec<Statement>,
        use_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        let results = self.execute_all(statements, use_transaction).await?;
        StatementResult::aggregate(results).ok_or_else(|| {
            SqlUnifyError::ExecutionError("no statement produced a result".into())
        })
    }
}
