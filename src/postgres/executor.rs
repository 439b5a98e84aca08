use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tracing::debug;

use crate::error::SqlUnifyError;
use crate::orchestrator::TransactionalBackend;
use crate::statement::{Statement, StatementMetadata, StatementResult};
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::EngineKind;

use super::config::PgManager;
use super::params::Params;
use super::query::build_result_set;

const TOLERANT_SAVEPOINT: &str = "sql_unify_tolerant";

/// Orchestrator backend over a bb8 pool of tokio-postgres clients.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: Pool<PgManager>,
}

impl PostgresBackend {
    #[must_use]
    pub fn new(pool: Pool<PgManager>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<PgManager> {
        &self.pool
    }
}

/// Prepare and run one statement; the prepared columns decide rows vs. mutation.
///
/// # Errors
/// Returns `SqlUnifyError::PostgresError` on prepare or execution failure.
pub async fn execute_on_client(
    client: &tokio_postgres::Client,
    statement: &Statement,
) -> Result<StatementResult, SqlUnifyError> {
    let sql = translate_placeholders(
        &statement.sql,
        PlaceholderStyle::for_engine(EngineKind::Postgres),
    );
    let prepared = client.prepare(&sql).await?;
    let params = Params::convert(&statement.params);

    if prepared.columns().is_empty() {
        let affected = client.execute(&prepared, params.as_refs()).await?;
        return Ok(StatementResult::mutation(
            StatementMetadata::mutation(affected, None),
            statement.clone(),
        ));
    }

    let rows = client.query(&prepared, params.as_refs()).await?;
    let result_set = build_result_set(&prepared, &rows)?;
    Ok(StatementResult::from_rows(result_set, statement.clone()))
}

#[async_trait]
impl TransactionalBackend for PostgresBackend {
    type Conn = PooledConnection<'static, PgManager>;

    async fn acquire_connection(&self) -> Result<Self::Conn, SqlUnifyError> {
        self.pool.get_owned().await.map_err(|e| {
            SqlUnifyError::ConnectionError(format!("postgres checkout error: {e}"))
        })
    }

    async fn begin_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        conn.simple_query("BEGIN").await?;
        Ok(())
    }

    async fn commit_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        conn.simple_query("COMMIT").await?;
        Ok(())
    }

    async fn rollback_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError> {
        conn.simple_query("ROLLBACK").await?;
        Ok(())
    }

    /// A failing statement aborts a Postgres transaction, so tolerant statements inside one
    /// run under a savepoint that is rolled back on failure.
    async fn execute_statement(
        &self,
        conn: &mut Self::Conn,
        statement: &Statement,
        in_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "postgres execute");
        if !(in_transaction && statement.tolerate_failure) {
            return execute_on_client(conn, statement).await;
        }

        conn.simple_query(&format!("SAVEPOINT {TOLERANT_SAVEPOINT}"))
            .await?;
        match execute_on_client(conn, statement).await {
            Ok(result) => {
                conn.simple_query(&format!("RELEASE SAVEPOINT {TOLERANT_SAVEPOINT}"))
                    .await?;
                Ok(result)
            }
            Err(err) => {
                conn.simple_query(&format!("ROLLBACK TO SAVEPOINT {TOLERANT_SAVEPOINT}"))
                    .await?;
                Err(err)
            }
        }
    }
}
