use std::sync::mpsc::Receiver;
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use regex::Regex;
use rusqlite::OptionalExtension;
use rusqlite::types::Value;
use tokio::runtime::Runtime;
use tracing::{debug, trace, warn};

use crate::error::SqlUnifyError;
use crate::orchestrator::{TransactionalBackend, run_statements};
use crate::results::ResultSet;
use crate::sqlite::params::{row_value_to_sqlite_value, sqlite_value_to_row_value};
use crate::sqlite::query::execute_statement;
use crate::statement::{Statement, StatementResult};
use crate::types::RowValues;

use super::channel::{Command, WorkerStats};

static PRAGMA_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("failed to compile pragma name regex")
});

type SharedConnection = Arc<Mutex<rusqlite::Connection>>;

/// The worker-owned connection seen through the orchestrator's primitives.
///
/// Only the worker thread ever touches the mutex, so locking never contends.
struct WorkerBackend {
    conn: SharedConnection,
}

fn with_conn<T>(
    conn: &SharedConnection,
    action: impl FnOnce(&rusqlite::Connection) -> Result<T, SqlUnifyError>,
) -> Result<T, SqlUnifyError> {
    let guard = conn.lock().map_err(|err| {
        SqlUnifyError::ExecutionError(format!("SQLite connection poisoned: {err}"))
    })?;
    action(&guard)
}

#[async_trait]
impl TransactionalBackend for WorkerBackend {
    type Conn = SharedConnection;

    async fn acquire_connection(&self) -> Result<SharedConnection, SqlUnifyError> {
        Ok(Arc::clone(&self.conn))
    }

    async fn begin_transaction(&self, conn: &mut SharedConnection) -> Result<(), SqlUnifyError> {
        with_conn(conn, |c| Ok(c.execute_batch("BEGIN")?))
    }

    async fn commit_transaction(&self, conn: &mut SharedConnection) -> Result<(), SqlUnifyError> {
        with_conn(conn, |c| Ok(c.execute_batch("COMMIT")?))
    }

    async fn rollback_transaction(
        &self,
        conn: &mut SharedConnection,
    ) -> Result<(), SqlUnifyError> {
        with_conn(conn, |c| {
            if c.is_autocommit() {
                // SQLite already rolled back on its own (e.g. after SQLITE_FULL).
                return Ok(());
            }
            Ok(c.execute_batch("ROLLBACK")?)
        })
    }

    async fn execute_statement(
        &self,
        conn: &mut SharedConnection,
        statement: &Statement,
        _in_transaction: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        with_conn(conn, |c| execute_statement(c, statement))
    }
}

/// Drain `receiver` until a `Shutdown` arrives or every sender is gone.
pub(super) fn run_sqlite_worker(
    conn: rusqlite::Connection,
    receiver: &Receiver<Command>,
    stats: &WorkerStats,
    runtime: &Runtime,
) {
    let backend = WorkerBackend {
        conn: Arc::new(Mutex::new(conn)),
    };

    while let Ok(command) = receiver.recv() {
        stats.dequeued();
        trace!(command = command.label(), "sqlite worker dequeued");

        let _active = (!matches!(command, Command::Shutdown { .. })).then(|| stats.begin());
        match command {
            Command::Shutdown { respond_to } => {
                let _ = respond_to.send(close_connection(backend));
                return;
            }
            Command::Run {
                statement,
                respond_to,
            } => {
                let result = with_conn(&backend.conn, |c| execute_statement(c, &statement))
                    .map(|mut result| {
                        result.rows = ResultSet::default();
                        result
                    });
                let _ = respond_to.send(result);
            }
            Command::All {
                statement,
                respond_to,
            } => {
                let _ = respond_to.send(with_conn(&backend.conn, |c| {
                    execute_statement(c, &statement)
                }));
            }
            Command::Transaction {
                statements,
                use_transaction,
                respond_to,
            } => {
                let result =
                    runtime.block_on(run_statements(&backend, &statements, use_transaction));
                let _ = respond_to.send(result);
            }
            Command::Pragma {
                name,
                value,
                respond_to,
            } => {
                let _ = respond_to.send(with_conn(&backend.conn, |c| {
                    pragma(c, &name, value.as_ref())
                }));
            }
        }
    }
    debug!("sqlite worker exiting: all senders dropped");
}

/// Read a pragma, or set it and read back the value it now reports.
fn pragma(
    conn: &rusqlite::Connection,
    name: &str,
    value: Option<&RowValues>,
) -> Result<Option<RowValues>, SqlUnifyError> {
    if !PRAGMA_NAME.is_match(name) {
        return Err(SqlUnifyError::ValidationError(format!(
            "invalid pragma name: {name:?}"
        )));
    }
    if let Some(value) = value {
        conn.pragma_update(None, name, row_value_to_sqlite_value(value))?;
    }
    let current: Option<Value> = conn
        .pragma_query_value(None, name, |row| row.get(0))
        .optional()?;
    Ok(current.map(sqlite_value_to_row_value))
}

fn close_connection(backend: WorkerBackend) -> Result<(), SqlUnifyError> {
    let Ok(mutex) = Arc::try_unwrap(backend.conn) else {
        warn!("sqlite connection still shared at shutdown; dropping instead of closing");
        return Ok(());
    };
    let conn = mutex.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
    conn.close().map_err(|(_, err)| SqlUnifyError::SqliteError(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_names_are_validated() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        assert!(matches!(
            pragma(&conn, "user_version; DROP TABLE x", None),
            Err(SqlUnifyError::ValidationError(_))
        ));
        let set = pragma(&conn, "user_version", Some(&RowValues::Int(7))).unwrap();
        assert_eq!(set, Some(RowValues::Int(7)));
    }
}
