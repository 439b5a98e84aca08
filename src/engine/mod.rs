//! The uniform engine handle.
//!
//! [`EngineHandle`] hides which backend is behind it: schema management, bulk mutation and
//! transactions look the same for every engine, and only SQL dialect differs.

mod ops;

#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
use std::sync::Arc;
#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SqlUnifyError;
use crate::statement::{Statement, StatementResult};
use crate::types::EngineKind;

#[cfg(feature = "libsql")]
use crate::libsql::{LibsqlBackend, LibsqlOptions};
#[cfg(feature = "mysql")]
use crate::mysql::{MysqlBackend, MysqlOptions};
#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
use crate::orchestrator::{run_single, run_statements};
#[cfg(feature = "postgres")]
use crate::postgres::{PostgresBackend, PostgresOptions};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteEngine, SqliteOptions, SqliteRegistry};

/// A pooled backend together with the options it was built from.
///
/// Clones share the pool and the closed flag.
#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
#[derive(Clone)]
pub struct Pooled<B, O> {
    pub(crate) backend: B,
    pub(crate) options: O,
    closed: Arc<AtomicBool>,
}

#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
impl<B, O> Pooled<B, O> {
    fn new(backend: B, options: O) -> Self {
        Self {
            backend,
            options,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &O {
        &self.options
    }

    fn ensure_open(&self, kind: EngineKind) -> Result<(), SqlUnifyError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SqlUnifyError::ClosedError(format!("{kind} handle is closed")))
        } else {
            Ok(())
        }
    }

    /// Flip to closed; false if it already was.
    fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

/// One configured connection to a database backend.
#[derive(Clone)]
pub enum EngineHandle {
    #[cfg(feature = "mysql")]
    Mysql(Pooled<MysqlBackend, MysqlOptions>),
    #[cfg(feature = "postgres")]
    Postgres(Pooled<PostgresBackend, PostgresOptions>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteEngine),
    #[cfg(feature = "libsql")]
    Libsql(Pooled<LibsqlBackend, LibsqlOptions>),
}

impl EngineHandle {
    /// MySQL-family engine over a lazily connecting sqlx pool.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::ConfigError` for invalid pool settings.
    #[cfg(feature = "mysql")]
    pub fn mysql(options: MysqlOptions) -> Result<Self, SqlUnifyError> {
        let pool = options.build_pool()?;
        Ok(EngineHandle::Mysql(Pooled::new(
            MysqlBackend::new(pool),
            options,
        )))
    }

    /// `PostgreSQL` engine over a bb8 pool.
    ///
    /// # Errors
    /// `ConfigError` for missing connection fields; `ConnectionError` if the pool fails.
    #[cfg(feature = "postgres")]
    pub async fn postgres(options: PostgresOptions) -> Result<Self, SqlUnifyError> {
        let pool = options.build_pool().await?;
        Ok(EngineHandle::Postgres(Pooled::new(
            PostgresBackend::new(pool),
            options,
        )))
    }

    /// Embedded `SQLite` engine; handles for the same file opened through `registry` share
    /// one write serializer.
    ///
    /// # Errors
    /// Returns the native open error or a `ConfigError` for an unresolvable path.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(
        registry: &SqliteRegistry,
        options: SqliteOptions,
    ) -> Result<Self, SqlUnifyError> {
        SqliteEngine::open(registry, options).map(EngineHandle::Sqlite)
    }

    /// `LibSQL` engine, local file or remote endpoint.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::ConnectionError` if the database or pool cannot be created.
    #[cfg(feature = "libsql")]
    pub async fn libsql(options: LibsqlOptions) -> Result<Self, SqlUnifyError> {
        let pool = options.build_pool().await?;
        let backend = LibsqlBackend::new(pool, options.transactions_supported());
        Ok(EngineHandle::Libsql(Pooled::new(backend, options)))
    }

    #[must_use]
    pub fn kind(&self) -> EngineKind {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(_) => EngineKind::Mysql,
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(_) => EngineKind::Postgres,
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(_) => EngineKind::Sqlite,
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(_) => EngineKind::Libsql,
        }
    }

    /// Table options CREATE TABLE uses when the caller passes none.
    #[must_use]
    pub fn default_table_options(&self) -> &'static str {
        self.kind().default_table_options()
    }

    /// Release the handle's resources. Repeated and concurrent calls are safe.
    ///
    /// # Errors
    /// Returns the native close error of an embedded database.
    pub async fn close(&self) -> Result<(), SqlUnifyError> {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(p) => {
                if p.mark_closed() {
                    p.backend.pool().close().await;
                }
                Ok(())
            }
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(p) => {
                // bb8 has no explicit close; idle clients go away with the last pool clone.
                p.mark_closed();
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.close().await,
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(p) => {
                if p.mark_closed() {
                    p.backend.pool().close();
                }
                Ok(())
            }
        }
    }

    /// True once [`close`](Self::close) has been called on this handle or a clone of it.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(p) => p.closed.load(Ordering::SeqCst),
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(p) => p.closed.load(Ordering::SeqCst),
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.is_closed(),
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(p) => p.closed.load(Ordering::SeqCst),
        }
    }

    /// A new handle for another database (network engines) or file (embedded engines),
    /// sharing this handle's configuration.
    ///
    /// # Errors
    /// `ClosedError` if this handle is closed; `ConfigError` for remote `LibSQL` endpoints;
    /// otherwise the constructor's errors.
    pub async fn use_database(&self, target: &str) -> Result<EngineHandle, SqlUnifyError> {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(p) => {
                p.ensure_open(EngineKind::Mysql)?;
                EngineHandle::mysql(p.options.with_database(target))
            }
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(p) => {
                p.ensure_open(EngineKind::Postgres)?;
                EngineHandle::postgres(p.options.with_database(target)).await
            }
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.with_path(target).map(EngineHandle::Sqlite),
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(p) => {
                p.ensure_open(EngineKind::Libsql)?;
                EngineHandle::libsql(p.options.with_database(target)?).await
            }
        }
    }

    /// Run `statements` in order, inside one transaction when `use_transaction`.
    pub(crate) async fn execute_all(
        &self,
        statements: Vec<Statement>,
        use_transaction: bool,
    ) -> Result<Vec<StatementResult>, SqlUnifyError> {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(p) => {
                p.ensure_open(EngineKind::Mysql)?;
                run_statements(&p.backend, &statements, use_transaction).await
            }
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(p) => {
                p.ensure_open(EngineKind::Postgres)?;
                run_statements(&p.backend, &statements, use_transaction).await
            }
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => engine.execute(statements, use_transaction).await,
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(p) => {
                p.ensure_open(EngineKind::Libsql)?;
                p.backend.execute(&statements, use_transaction).await
            }
        }
    }

    /// Run one statement outside any explicit transaction.
    pub(crate) async fn execute_one(
        &self,
        statement: Statement,
        keep_rows: bool,
    ) -> Result<StatementResult, SqlUnifyError> {
        match self {
            #[cfg(feature = "mysql")]
            EngineHandle::Mysql(p) => {
                p.ensure_open(EngineKind::Mysql)?;
                let result = run_single(&p.backend, &statement).await?;
                Ok(shape_rows(result, keep_rows))
            }
            #[cfg(feature = "postgres")]
            EngineHandle::Postgres(p) => {
                p.ensure_open(EngineKind::Postgres)?;
                let result = run_single(&p.backend, &statement).await?;
                Ok(shape_rows(result, keep_rows))
            }
            #[cfg(feature = "sqlite")]
            EngineHandle::Sqlite(engine) => {
                if keep_rows {
                    engine.all(statement).await
                } else {
                    engine.run(statement).await
                }
            }
            #[cfg(feature = "libsql")]
            EngineHandle::Libsql(p) => {
                p.ensure_open(EngineKind::Libsql)?;
                let result = run_single(&p.backend, &statement).await?;
                Ok(shape_rows(result, keep_rows))
            }
        }
    }
}

#[cfg(any(feature = "mysql", feature = "postgres", feature = "libsql"))]
fn shape_rows(mut result: StatementResult, keep_rows: bool) -> StatementResult {
    if !keep_rows {
        result.rows = crate::results::ResultSet::default();
    }
    result
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("kind", &self.kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}
