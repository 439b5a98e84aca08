use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, MySql, MySqlConnection, Statement as _};
use tracing::debug;

use crate::error::SqlUnifyError;
use crate::orchestrator::TransactionalBackend;
use crate::statement::{Statement, StatementMetadata, StatementResult};

use super::params::bind_values;
use super::query::build_result_set;

/// Orchestrator backend over an sqlx MySQL pool.
#[derive(Clone)]
pub struct MysqlBackend {
    pool: MySqlPool,
}

impl MysqlBackend {
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Prepare and run one statement; a statement without result columns is a mutation.
///
/// # Errors
/// Returns `SqlUnifyError::MysqlError` on prepare or execution failure.
pub async fn execute_on_connection(
    conn: &mut MySqlConnection,
    statement: &Statement,
) -> Result<StatementResult, SqlUnifyError> {
    let prepared = (&mut *conn).prepare(statement.sql.as_str()).await?;
    let query = bind_values(prepared.query(), &statement.params);

    if prepared.columns().is_empty() {
        let done = query.execute(&mut *conn).await?;
        let last_insert_id = i64::try_from(done.last_insert_id())
            .ok()
            .filter(|id| *id > 0 && done.rows_affected() > 0);
        return Ok(StatementResult::mutation(
            StatementMetadata::mutation(done.rows_affected(), last_insert_id),
            statement.clone(),
        ));
    }

    let rows = query.fetch_all(&mut *conn).await?;
    let result_set = build_result_set(prepared.columns(), &rows)?;
    Ok(StatementResult::from_rows(result_set, statement.clone()))
}

#[async_trait]
impl TransactionalBackend for MysqlBackend {
    type Conn = PoolConnection<MySql>;

    async fn acquire_connection(&self) -> Result<Self::Conn, SqlUnifyError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| SqlUnifyError::ConnectionError(format!("mysql checkout error: {e}")))
    }

    async fn begin_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        (&mut **conn).execute("BEGIN").await?;
        Ok(())
    }

    async fn commit_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        (&mut **conn).execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        (&mut **conn).execute("ROLLBACK").await?;
        Ok(())
    }

    async fn execute_statement(
        &self,
        conn: &mut Self::Conn,
        statement: &Statement,
        _in_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "mysql execute");
        execute_on_connection(conn, statement).await
    }
}
