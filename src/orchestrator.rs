//! Begin/commit/rollback choreography shared by every backend.
//!
//! A backend only knows how to hand out a connection and run one statement on it; the
//! functions here decide ordering, failure tolerance and cleanup.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SqlUnifyError;
use crate::statement::{Statement, StatementResult};

/// Minimal set of primitives a backend exposes to the orchestrator.
///
/// Connections are released by dropping `Conn`, so every exit path of the orchestrator
/// returns the connection to its pool.
#[async_trait]
pub trait TransactionalBackend: Send + Sync {
    type Conn: Send;

    async fn acquire_connection(&self) -> Result<Self::Conn, SqlUnifyError>;

    async fn begin_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError>;

    async fn commit_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError>;

    async fn rollback_transaction(&self, conn: &mut Self::Conn) -> Result<(), SqlUnifyError>;

    /// Run one statement. `in_transaction` tells the backend whether a BEGIN is active so it
    /// can protect a failure-tolerant statement (e.g. with a savepoint).
    async fn execute_statement(
        &self,
        conn: &mut Self::Conn,
        statement: &Statement,
        in_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError>;
}

/// Run `statements` in order inside one transaction.
///
/// A failing statement marked `tolerate_failure` is logged and skipped, so the result list
/// can be shorter than the input. Any other failure rolls back and is returned as
/// [`SqlUnifyError::TransactionError`] carrying the statement's index; a failed rollback is
/// logged and never replaces that error.
///
/// # Errors
/// Returns the acquisition or BEGIN error unchanged, a `TransactionError` for a failed
/// statement, or a `TransactionError` indexed past the last statement when COMMIT fails.
pub async fn run_transaction<B: TransactionalBackend>(
    backend: &B,
    statements: &[Statement],
) -> Result<Vec<StatementResult>, SqlUnifyError> {
    let mut conn = backend.acquire_connection().await?;
    backend.begin_transaction(&mut conn).await?;
    debug!(statements = statements.len(), "transaction started");

    let mut results = Vec::with_capacity(statements.len());
    for (index, statement) in statements.iter().enumerate() {
        match backend.execute_statement(&mut conn, statement, true).await {
            Ok(result) => results.push(result),
            Err(err) if tolerated(statement, &err) => {
                warn!(index, error = %err, "tolerated statement failure");
            }
            Err(err) => {
                rollback_quietly(backend, &mut conn).await;
                return Err(err.in_transaction(index));
            }
        }
    }

    if let Err(err) = backend.commit_transaction(&mut conn).await {
        rollback_quietly(backend, &mut conn).await;
        return Err(err.in_transaction(statements.len()));
    }
    debug!(results = results.len(), "transaction committed");
    Ok(results)
}

/// Run `statements` in order on one connection without BEGIN/COMMIT.
///
/// Statements that succeeded before a failure stay applied.
///
/// # Errors
/// Returns the first untolerated failure as-is.
pub async fn run_sequence<B: TransactionalBackend>(
    backend: &B,
    statements: &[Statement],
) -> Result<Vec<StatementResult>, SqlUnifyError> {
    let mut conn = backend.acquire_connection().await?;
    let mut results = Vec::with_capacity(statements.len());
    for (index, statement) in statements.iter().enumerate() {
        match backend.execute_statement(&mut conn, statement, false).await {
            Ok(result) => results.push(result),
            Err(err) if tolerated(statement, &err) => {
                warn!(index, error = %err, "tolerated statement failure");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(results)
}

/// Acquire a connection, run one statement, release.
///
/// # Errors
/// Returns acquisition or execution failures unchanged.
pub async fn run_single<B: TransactionalBackend>(
    backend: &B,
    statement: &Statement,
) -> Result<StatementResult, SqlUnifyError> {
    let mut conn = backend.acquire_connection().await?;
    backend.execute_statement(&mut conn, statement, false).await
}

/// Dispatch on `use_transaction`.
///
/// # Errors
/// See [`run_transaction`] and [`run_sequence`].
pub async fn run_statements<B: TransactionalBackend>(
    backend: &B,
    statements: &[Statement],
    use_transaction: bool,
) -> Result<Vec<StatementResult>, SqlUnifyError> {
    if use_transaction {
        run_transaction(backend, statements).await
    } else {
        run_sequence(backend, statements).await
    }
}

fn tolerated(statement: &Statement, err: &SqlUnifyError) -> bool {
    statement.tolerate_failure && err.is_execution_error()
}

async fn rollback_quietly<B: TransactionalBackend>(backend: &B, conn: &mut B::Conn) {
    if let Err(err) = backend.rollback_transaction(conn).await {
        warn!(error = %err, "rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::statement::StatementMetadata;

    /// Records every call; statements whose SQL starts with `FAIL` fail.
    #[derive(Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        fail_rollback: bool,
        fail_commit: bool,
    }

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct FakeConn {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Drop for FakeConn {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("release".into());
        }
    }

    #[async_trait]
    impl TransactionalBackend for Recorder {
        type Conn = FakeConn;

        async fn acquire_connection(&self) -> Result<FakeConn, SqlUnifyError> {
            self.push("acquire");
            Ok(FakeConn {
                log: Arc::clone(&self.log),
            })
        }

        async fn begin_transaction(&self, _conn: &mut FakeConn) -> Result<(), SqlUnifyError> {
            self.push("BEGIN");
            Ok(())
        }

        async fn commit_transaction(&self, _conn: &mut FakeConn) -> Result<(), SqlUnifyError> {
            self.push("COMMIT");
            if self.fail_commit {
                return Err(SqlUnifyError::ExecutionError("commit refused".into()));
            }
            Ok(())
        }

        async fn rollback_transaction(&self, _conn: &mut FakeConn) -> Result<(), SqlUnifyError> {
            self.push("ROLLBACK");
            if self.fail_rollback {
                return Err(SqlUnifyError::ConnectionError("socket gone".into()));
            }
            Ok(())
        }

        async fn execute_statement(
            &self,
            _conn: &mut FakeConn,
            statement: &Statement,
            _in_transaction: bool,
        ) -> Result<StatementResult, SqlUnifyError> {
            self.push(statement.sql.clone());
            if statement.sql.starts_with("FAIL") {
                return Err(SqlUnifyError::ExecutionError(statement.sql.clone()));
            }
            Ok(StatementResult::mutation(
                StatementMetadata::mutation(1, None),
                statement.clone(),
            ))
        }
    }

    fn stmts(sql: &[&str]) -> Vec<Statement> {
        sql.iter().map(|s| Statement::from(*s)).collect()
    }

    #[tokio::test]
    async fn commits_in_order_and_releases() {
        let backend = Recorder::default();
        let results = run_transaction(&backend, &stmts(&["A", "B", "C"]))
            .await
            .unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.statement.sql.as_str()).collect();
        assert_eq!(order, ["A", "B", "C"]);
        assert_eq!(
            backend.log(),
            ["acquire", "BEGIN", "A", "B", "C", "COMMIT", "release"]
        );
    }

    #[tokio::test]
    async fn failure_rolls_back_with_index() {
        let backend = Recorder::default();
        let err = run_transaction(&backend, &stmts(&["A", "FAIL", "C"]))
            .await
            .unwrap_err();
        match err {
            SqlUnifyError::TransactionError { index, source } => {
                assert_eq!(index, 1);
                assert!(source.is_execution_error());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            backend.log(),
            ["acquire", "BEGIN", "A", "FAIL", "ROLLBACK", "release"]
        );
    }

    #[tokio::test]
    async fn rollback_failure_does_not_mask_original_error() {
        let backend = Recorder {
            fail_rollback: true,
            ..Recorder::default()
        };
        let err = run_transaction(&backend, &stmts(&["FAIL"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlUnifyError::TransactionError { index: 0, .. }));
    }

    #[tokio::test]
    async fn tolerated_failures_leave_no_result_entry() {
        let backend = Recorder::default();
        let mut statements = stmts(&["A", "FAIL", "C"]);
        statements[1].tolerate_failure = true;
        let results = run_transaction(&backend, &statements).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].statement.sql, "C");
        assert!(backend.log().contains(&"COMMIT".to_string()));
    }

    #[tokio::test]
    async fn commit_failure_is_reported_past_the_last_statement() {
        let backend = Recorder {
            fail_commit: true,
            ..Recorder::default()
        };
        let err = run_transaction(&backend, &stmts(&["A", "B"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlUnifyError::TransactionError { index: 2, .. }));
        assert!(backend.log().contains(&"ROLLBACK".to_string()));
    }

    #[tokio::test]
    async fn sequence_skips_begin_and_stops_at_failure() {
        let backend = Recorder::default();
        let err = run_sequence(&backend, &stmts(&["A", "FAIL", "C"]))
            .await
            .unwrap_err();
        assert!(err.is_execution_error());
        assert_eq!(backend.log(), ["acquire", "A", "FAIL", "release"]);
    }

    #[tokio::test]
    async fn single_statement_releases_connection() {
        let backend = Recorder::default();
        let result = run_single(&backend, &Statement::from("A")).await.unwrap();
        assert_eq!(result.metadata.affected_rows, 1);
        assert_eq!(backend.log(), ["acquire", "A", "release"]);
    }
}
