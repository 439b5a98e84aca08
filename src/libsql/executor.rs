use async_trait::async_trait;
use deadpool_libsql::{Object, Pool};
use tracing::{debug, warn};

use crate::dialect::interpolate;
use crate::error::SqlUnifyError;
use crate::orchestrator::{TransactionalBackend, run_statements};
use crate::statement::{Statement, StatementMetadata, StatementResult};
use crate::types::EngineKind;

use super::params::Params;
use super::query::build_result_set;

/// Orchestrator backend over a deadpool of libsql connections.
#[derive(Clone)]
pub struct LibsqlBackend {
    pool: Pool,
    transactions_supported: bool,
}

impl LibsqlBackend {
    #[must_use]
    pub fn new(pool: Pool, transactions_supported: bool) -> Self {
        Self {
            pool,
            transactions_supported,
        }
    }

    #[must_use]
    pub fn transactions_supported(&self) -> bool {
        self.transactions_supported
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run `statements`, falling back to one atomic batch when the endpoint cannot hold a
    /// transaction open.
    ///
    /// # Errors
    /// As [`run_statements`]; in batch mode any failure is a `TransactionError` at index 0.
    pub async fn execute(
        &self,
        statements: &[Statement],
        use_transaction: bool,
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        if use_transaction && !self.transactions_supported {
            return self.execute_batch_fallback(statements).await;
        }
        run_statements(self, statements, use_transaction).await
    }

    /// All-or-nothing batch with every parameter interpolated client side.
    ///
    /// The endpoint reports neither per-statement rows nor which statement failed, so results
    /// carry zeroed metadata and tolerance flags are not honored.
    async fn execute_batch_fallback(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        let batch = build_batch(statements)?;

        let conn = self.acquire_connection().await?;
        debug!(statements = statements.len(), "libsql transactional batch");
        let _ = conn
            .execute_transactional_batch(&batch)
            .await
            .map_err(|e| SqlUnifyError::from(e).in_transaction(0))?;

        Ok(statements
            .iter()
            .map(|s| StatementResult::mutation(StatementMetadata::default(), s.clone()))
            .collect())
    }
}

/// Render `statements` as one `;`-separated script with parameters inlined.
///
/// # Errors
/// Returns `SqlUnifyError::ParameterError` when a statement's placeholders and parameters
/// disagree.
pub(crate) fn build_batch(statements: &[Statement]) -> Result<String, SqlUnifyError> {
    let interpolated = statements
        .iter()
        .map(|s| interpolate(EngineKind::Libsql, s))
        .collect::<Result<Vec<_>, _>>()?;
    if interpolated.iter().any(|s| s.tolerate_failure) {
        warn!("failure tolerance is ignored in libsql batch mode");
    }
    Ok(interpolated
        .iter()
        .map(|s| s.sql.trim_end().trim_end_matches(';'))
        .collect::<Vec<_>>()
        .join(";\n"))
}

/// Prepare and run one statement; statements with result columns return rows.
///
/// # Errors
/// Returns `SqlUnifyError::LibsqlError` on prepare or execution failure.
pub async fn execute_on_connection(
    conn: &Object,
    statement: &Statement,
) -> Result<StatementResult, SqlUnifyError> {
    let mut prepared = conn.prepare(&statement.sql).await?;
    let params = Params::convert(&statement.params).into_vec();

    if prepared.column_count() == 0 {
        let affected = prepared.execute(params).await? as u64;
        let last_insert_id = (affected > 0 && statement.is_insert())
            .then(|| conn.last_insert_rowid());
        return Ok(StatementResult::mutation(
            StatementMetadata::mutation(affected, last_insert_id),
            statement.clone(),
        ));
    }

    let rows = prepared.query(params).await?;
    let result_set = build_result_set(rows).await?;
    Ok(StatementResult::from_rows(result_set, statement.clone()))
}

#[async_trait]
impl TransactionalBackend for LibsqlBackend {
    type Conn = Object;

    async fn acquire_connection(&self) -> Result<Object, SqlUnifyError> {
        self.pool.get().await.map_err(|e| {
            SqlUnifyError::ConnectionError(format!("Failed to get libsql connection: {e}"))
        })
    }

    async fn begin_transaction(&self, conn: &mut Object) -> Result<(), SqlUnifyError> {
        conn.execute("BEGIN", ()).await?;
        Ok(())
    }

    async fn commit_transaction(&self, conn: &mut Object) -> Result<(), SqlUnifyError> {
        conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    async fn rollback_transaction(&self, conn: &mut Object) -> Result<(), SqlUnifyError> {
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute("ROLLBACK", ()).await?;
        Ok(())
    }

    async fn execute_statement(
        &self,
        conn: &mut Object,
        statement: &Statement,
        _in_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "libsql execute");
        execute_on_connection(conn, statement).await
    }
}
