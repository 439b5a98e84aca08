use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::SqlUnifyError;
use crate::statement::{Statement, StatementResult};
use crate::types::RowValues;

use super::config::SqliteOptions;
use super::registry::SqliteRegistry;
use super::worker::{SerializerStats, SqliteSerializer};

struct Inner {
    serializer: Arc<SqliteSerializer>,
    registry: SqliteRegistry,
    key: Option<PathBuf>,
    options: SqliteOptions,
    closed: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            return;
        }
        if let Some(key) = &self.key {
            // Dropping the last share drops the queue sender; the worker then exits on its own.
            if let Some(serializer) = self.registry.release(key) {
                self.registry.finish_close(key, &serializer);
            }
        }
    }
}

/// An embedded `SQLite` database seen through its write serializer.
///
/// Clones share the same handle (and its closed state); [`SqliteEngine::open`] on the same
/// path through the same registry shares the serializer but gets an independent handle.
#[derive(Clone)]
pub struct SqliteEngine {
    inner: Arc<Inner>,
}

impl SqliteEngine {
    /// Open (or share) the database at `options.path`.
    ///
    /// # Errors
    /// Returns the native open error or a `ConfigError` for an unresolvable path.
    pub fn open(registry: &SqliteRegistry, options: SqliteOptions) -> Result<Self, SqlUnifyError> {
        let (serializer, key) = registry.acquire(&options)?;
        Ok(Self {
            inner: Arc::new(Inner {
                serializer,
                registry: registry.clone(),
                key,
                options,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// A new handle for another file, sharing this handle's registry and options.
    ///
    /// # Errors
    /// See [`SqliteEngine::open`]; `ClosedError` if this handle is closed.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Result<Self, SqlUnifyError> {
        self.ensure_open()?;
        Self::open(&self.inner.registry, self.inner.options.with_path(path))
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.inner.options
    }

    /// Resolved path this handle is registered under; `None` for in-memory databases.
    #[must_use]
    pub fn resolved_path(&self) -> Option<&Path> {
        self.inner.key.as_deref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), SqlUnifyError> {
        if self.is_closed() {
            Err(SqlUnifyError::ClosedError(format!(
                "SQLite handle for {} is closed",
                self.inner.options.path.display()
            )))
        } else {
            Ok(())
        }
    }

    /// Execute one statement, discarding any rows.
    ///
    /// # Errors
    /// `ClosedError` after close; the driver error otherwise.
    pub async fn run(&self, statement: Statement) -> Result<StatementResult, SqlUnifyError> {
        self.ensure_open()?;
        self.inner.serializer.run(statement).await
    }

    /// Execute one statement and return its rows.
    ///
    /// # Errors
    /// `ClosedError` after close; the driver error otherwise.
    pub async fn all(&self, statement: Statement) -> Result<StatementResult, SqlUnifyError> {
        self.ensure_open()?;
        self.inner.serializer.all(statement).await
    }

    /// Execute `statements` as a single queue entry.
    ///
    /// # Errors
    /// `ClosedError` after close; otherwise as [`crate::orchestrator::run_transaction`].
    pub async fn execute(
        &self,
        statements: Vec<Statement>,
        use_transaction: bool,
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        self.ensure_open()?;
        self.inner
            .serializer
            .transaction(statements, use_transaction)
            .await
    }

    /// # Errors
    /// `ValidationError` for a malformed pragma name; `ClosedError` after close.
    pub async fn pragma_get(&self, name: &str) -> Result<Option<RowValues>, SqlUnifyError> {
        self.ensure_open()?;
        self.inner.serializer.pragma(name, None).await
    }

    /// Set a pragma and return the value it reports afterwards.
    ///
    /// # Errors
    /// `ValidationError` for a malformed pragma name; `ClosedError` after close.
    pub async fn pragma_set(
        &self,
        name: &str,
        value: RowValues,
    ) -> Result<Option<RowValues>, SqlUnifyError> {
        self.ensure_open()?;
        self.inner.serializer.pragma(name, Some(value)).await
    }

    #[must_use]
    pub fn serializer_stats(&self) -> SerializerStats {
        self.inner.serializer.stats()
    }

    /// Release this handle. The file is closed once its last handle is released; queued
    /// work finishes first and the path cannot be reopened until it has.
    ///
    /// # Errors
    /// Returns the native close error of the last handle.
    pub async fn close(&self) -> Result<(), SqlUnifyError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match &self.inner.key {
            Some(key) => match self.inner.registry.release(key) {
                Some(serializer) => {
                    let result = serializer.close().await;
                    self.inner.registry.finish_close(key, &serializer);
                    result
                }
                None => {
                    debug!(path = %key.display(), "sqlite handle released; file still shared");
                    Ok(())
                }
            },
            None => self.inner.serializer.close().await,
        }
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("path", &self.inner.options.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
