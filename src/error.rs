use thiserror::Error;

#[cfg(feature = "libsql")]
use deadpool_libsql::libsql;
#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "mysql")]
use sqlx;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SqlUnifyError {
    /// Malformed structured input; raised before any statement reaches a backend.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// An execution failure inside a transaction. The transaction was rolled back
    /// before this error was returned.
    #[error("Transaction aborted at statement {index}: {source}")]
    TransactionError {
        index: usize,
        #[source]
        source: Box<SqlUnifyError>,
    },

    /// The engine handle has been closed.
    #[error("Engine handle closed: {0}")]
    ClosedError(String),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] sqlx::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "libsql")]
    #[error(transparent)]
    LibsqlError(#[from] libsql::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl SqlUnifyError {
    /// True for failures reported by a driver while running a statement.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        match self {
            SqlUnifyError::ExecutionError(_) => true,
            #[cfg(feature = "mysql")]
            SqlUnifyError::MysqlError(_) => true,
            #[cfg(feature = "postgres")]
            SqlUnifyError::PostgresError(_) => true,
            #[cfg(feature = "sqlite")]
            SqlUnifyError::SqliteError(_) => true,
            #[cfg(feature = "libsql")]
            SqlUnifyError::LibsqlError(_) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, SqlUnifyError::ClosedError(_))
    }

    /// Wrap an error raised while running statement `index` of a transaction.
    ///
    /// Errors that are already transaction errors pass through unchanged.
    #[must_use]
    pub fn in_transaction(self, index: usize) -> Self {
        match self {
            err @ SqlUnifyError::TransactionError { .. } => err,
            other => SqlUnifyError::TransactionError {
                index,
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_wrapping_is_not_nested() {
        let err = SqlUnifyError::ExecutionError("boom".into()).in_transaction(2);
        let again = err.in_transaction(5);
        match again {
            SqlUnifyError::TransactionError { index, source } => {
                assert_eq!(index, 2);
                assert!(source.is_execution_error());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_is_not_execution() {
        assert!(!SqlUnifyError::ValidationError("rows".into()).is_execution_error());
        assert!(SqlUnifyError::ClosedError("gone".into()).is_closed());
    }
}
