use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use tokio::runtime;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error};

use crate::error::SqlUnifyError;
use crate::statement::{Statement, StatementResult};
use crate::types::RowValues;

use super::channel::{Command, Reply, WorkerStats};
use super::dispatcher::run_sqlite_worker;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const CLOSED: u8 = 2;

/// Snapshot of a serializer's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerStats {
    /// Entries waiting in the queue.
    pub queued: usize,
    /// Entries the worker has taken up since it started.
    pub executed: u64,
    /// Highest number of entries ever executing at the same instant.
    pub peak_in_flight: usize,
}

/// Front end of the single-writer queue for one database file.
///
/// Every statement, standalone or transactional, is executed by the worker thread in FIFO
/// order. After [`close`](Self::close) starts, new work fails with
/// [`SqlUnifyError::ClosedError`]; work already queued still runs.
pub struct SqliteSerializer {
    sender: Sender<Command>,
    state: AtomicU8,
    close_lock: Mutex<()>,
    stats: Arc<WorkerStats>,
    label: String,
}

impl SqliteSerializer {
    /// Move `conn` onto a new worker thread.
    ///
    /// # Errors
    /// Returns [`SqlUnifyError::ConnectionError`] if the thread cannot be spawned.
    pub(crate) fn spawn(conn: rusqlite::Connection, label: String) -> Result<Self, SqlUnifyError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let stats = Arc::new(WorkerStats::default());
        let worker_stats = Arc::clone(&stats);
        let thread_label = label.clone();
        thread::Builder::new()
            .name("sqlite-serializer".into())
            .spawn(move || {
                match runtime::Builder::new_current_thread().build() {
                    Ok(rt) => run_sqlite_worker(conn, &receiver, &worker_stats, &rt),
                    Err(err) => {
                        error!(db = %thread_label, error = %err, "sqlite worker runtime failed");
                    }
                }
            })
            .map_err(|err| {
                SqlUnifyError::ConnectionError(format!(
                    "failed to spawn SQLite worker thread: {err}"
                ))
            })?;

        debug!(db = %label, "sqlite serializer started");
        Ok(Self {
            sender,
            state: AtomicU8::new(RUNNING),
            close_lock: Mutex::new(()),
            stats,
            label,
        })
    }

    #[must_use]
    pub fn stats(&self) -> SerializerStats {
        SerializerStats {
            queued: self.stats.queued.load(Ordering::SeqCst),
            executed: self.stats.executed.load(Ordering::SeqCst),
            peak_in_flight: self.stats.peak_in_flight.load(Ordering::SeqCst),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CLOSED
    }

    fn closed_error(&self) -> SqlUnifyError {
        SqlUnifyError::ClosedError(format!("SQLite database {} is closed", self.label))
    }

    fn send_command(&self, command: Command) -> Result<(), SqlUnifyError> {
        if self.state.load(Ordering::SeqCst) != RUNNING {
            return Err(self.closed_error());
        }
        self.stats.enqueued();
        self.sender.send(command).map_err(|_| {
            self.stats.dequeued();
            self.closed_error()
        })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SqlUnifyError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(build(tx))?;
        match rx.await {
            Ok(result) => result,
            Err(_) if self.state.load(Ordering::SeqCst) != RUNNING => Err(self.closed_error()),
            Err(_) => Err(SqlUnifyError::ConnectionError(format!(
                "SQLite worker for {} stopped unexpectedly",
                self.label
            ))),
        }
    }

    /// Execute one statement; rows are discarded.
    ///
    /// # Errors
    /// Returns the driver error, or `ClosedError` once closing has begun.
    pub async fn run(&self, statement: Statement) -> Result<StatementResult, SqlUnifyError> {
        self.request(|respond_to| Command::Run {
            statement,
            respond_to,
        })
        .await
    }

    /// Execute one statement and return its rows.
    ///
    /// # Errors
    /// Returns the driver error, or `ClosedError` once closing has begun.
    pub async fn all(&self, statement: Statement) -> Result<StatementResult, SqlUnifyError> {
        self.request(|respond_to| Command::All {
            statement,
            respond_to,
        })
        .await
    }

    /// Execute `statements` as one queue entry, inside BEGIN/COMMIT when `use_transaction`.
    ///
    /// # Errors
    /// See [`crate::orchestrator::run_transaction`]; `ClosedError` once closing has begun.
    pub async fn transaction(
        &self,
        statements: Vec<Statement>,
        use_transaction: bool,
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        self.request(|respond_to| Command::Transaction {
            statements,
            use_transaction,
            respond_to,
        })
        .await
    }

    /// Read (`value == None`) or set a pragma, returning its current value.
    ///
    /// # Errors
    /// `ValidationError` for a malformed name, the driver error otherwise.
    pub async fn pragma(
        &self,
        name: &str,
        value: Option<RowValues>,
    ) -> Result<Option<RowValues>, SqlUnifyError> {
        let name = name.to_string();
        self.request(|respond_to| Command::Pragma {
            name,
            value,
            respond_to,
        })
        .await
    }

    /// Stop accepting work, wait for the queue to drain, close the native connection.
    ///
    /// Safe to call repeatedly and concurrently; later calls wait for the first to finish.
    ///
    /// # Errors
    /// Returns the native close error, if any. The serializer is closed either way.
    pub async fn close(&self) -> Result<(), SqlUnifyError> {
        let _guard = self.close_lock.lock().await;
        if self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        self.stats.enqueued();
        let result = match self.sender.send(Command::Shutdown { respond_to: tx }) {
            Ok(()) => rx.await.unwrap_or(Ok(())),
            Err(_) => {
                self.stats.dequeued();
                Ok(())
            }
        };
        self.state.store(CLOSED, Ordering::SeqCst);
        debug!(db = %self.label, "sqlite serializer closed");
        result
    }
}

impl std::fmt::Debug for SqliteSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSerializer")
            .field("db", &self.label)
            .field("state", &self.state.load(Ordering::SeqCst))
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serializer() -> SqliteSerializer {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        SqliteSerializer::spawn(conn, ":memory:".into()).unwrap()
    }

    #[tokio::test]
    async fn concurrent_entries_never_overlap() {
        let s = serializer();
        s.run("CREATE TABLE t (n INTEGER)".into()).await.unwrap();
        let insert = |n: i64| {
            s.run(Statement::new(
                "INSERT INTO t VALUES (?)",
                vec![RowValues::Int(n)],
            ))
        };
        let (a, b, c, d) = tokio::join!(insert(0), insert(1), insert(2), insert(3));
        for result in [a, b, c, d] {
            assert_eq!(result.unwrap().metadata.affected_rows, 1);
        }
        let rows = s.all("SELECT count(*) AS n FROM t".into()).await.unwrap();
        assert_eq!(rows.rows.scalar(), Some(&RowValues::Int(4)));

        let stats = s.stats();
        assert_eq!(stats.peak_in_flight, 1);
        assert_eq!(stats.executed, 6);
        assert_eq!(stats.queued, 0);
    }

    #[tokio::test]
    async fn close_drains_queued_entries_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drain.db");
        let s = SqliteSerializer::spawn(
            rusqlite::Connection::open(&path).unwrap(),
            path.display().to_string(),
        )
        .unwrap();
        s.run("CREATE TABLE t (n INTEGER)".into()).await.unwrap();

        let bulk: Vec<Statement> = (0..10_000)
            .map(|n| Statement::new("INSERT INTO t VALUES (?)", vec![RowValues::Int(n)]))
            .collect();
        let insert = |n: i64| {
            s.run(Statement::new(
                "INSERT INTO t VALUES (?)",
                vec![RowValues::Int(n)],
            ))
        };
        let (bulk, a, b, c, closed) = tokio::join!(
            s.transaction(bulk, true),
            insert(-1),
            insert(-2),
            insert(-3),
            async {
                tokio::task::yield_now().await;
                let result = s.close().await;
                (result, s.stats())
            }
        );
        assert_eq!(bulk.unwrap().len(), 10_000);
        for result in [a, b, c] {
            assert_eq!(result.unwrap().metadata.affected_rows, 1);
        }
        let (result, stats) = closed;
        result.unwrap();
        assert!(s.is_closed());
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.executed, 5);

        let conn = rusqlite::Connection::open(&path).unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 10_003);
    }

    #[tokio::test]
    async fn work_after_close_is_rejected() {
        let s = serializer();
        s.run("CREATE TABLE t (n INTEGER)".into()).await.unwrap();
        s.close().await.unwrap();
        s.close().await.unwrap();
        assert!(s.is_closed());
        let err = s.run("SELECT 1".into()).await.unwrap_err();
        assert!(err.is_closed());
    }
}
