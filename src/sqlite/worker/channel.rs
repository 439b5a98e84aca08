use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::oneshot;

use crate::error::SqlUnifyError;
use crate::statement::{Statement, StatementResult};
use crate::types::RowValues;

pub(super) type Reply<T> = oneshot::Sender<Result<T, SqlUnifyError>>;

/// Queue entries; each reply sender is consumed exactly once by the worker.
pub(super) enum Command {
    /// Execute, keeping metadata only.
    Run {
        statement: Statement,
        respond_to: Reply<StatementResult>,
    },
    /// Execute and return rows.
    All {
        statement: Statement,
        respond_to: Reply<StatementResult>,
    },
    Transaction {
        statements: Vec<Statement>,
        use_transaction: bool,
        respond_to: Reply<Vec<StatementResult>>,
    },
    Pragma {
        name: String,
        value: Option<RowValues>,
        respond_to: Reply<Option<RowValues>>,
    },
    /// Close the native connection and stop the worker.
    Shutdown { respond_to: Reply<()> },
}

impl Command {
    pub(super) fn label(&self) -> &'static str {
        match self {
            Command::Run { .. } => "run",
            Command::All { .. } => "all",
            Command::Transaction { .. } => "transaction",
            Command::Pragma { .. } => "pragma",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}

/// Counters shared by the handle side and the worker thread.
#[derive(Debug, Default)]
pub(super) struct WorkerStats {
    pub(super) queued: AtomicUsize,
    pub(super) in_flight: AtomicUsize,
    pub(super) peak_in_flight: AtomicUsize,
    pub(super) executed: AtomicU64,
}

impl WorkerStats {
    pub(super) fn enqueued(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn dequeued(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    /// Mark one entry as executing until the returned guard drops.
    ///
    /// `executed` counts at start so it is current before the entry's reply is sent.
    pub(super) fn begin(&self) -> ActiveEntry<'_> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        ActiveEntry { stats: self }
    }
}

pub(super) struct ActiveEntry<'a> {
    stats: &'a WorkerStats,
}

impl Drop for ActiveEntry<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
