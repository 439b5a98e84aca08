use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SqlUnifyError;

/// Options for opening an embedded `SQLite` database.
///
/// Only the first handle for a given file applies these options; later handles share the
/// already-open connection.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub path: PathBuf,
    /// `PRAGMA journal_mode` applied at open; ignored for in-memory databases.
    pub journal_mode: Option<String>,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            journal_mode: Some("WAL".to_string()),
            busy_timeout: Some(Duration::from_secs(5)),
            foreign_keys: true,
        }
    }

    /// A private in-memory database; never shared through the registry.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        is_memory_path(&self.path)
    }

    #[must_use]
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn journal_mode(mut self, mode: Option<&str>) -> Self {
        self.journal_mode = mode.map(str::to_string);
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Open a native connection configured from these options.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::SqliteError` if the file cannot be opened or a pragma fails.
    pub(crate) fn open_connection(&self) -> Result<rusqlite::Connection, SqlUnifyError> {
        let conn = if self.is_in_memory() {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(&self.path)?
        };
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if let Some(mode) = self.journal_mode.as_deref().filter(|_| !self.is_in_memory()) {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
            tracing::debug!(path = %self.path.display(), journal_mode = %applied, "sqlite opened");
        }
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)?;
        Ok(conn)
    }
}

pub(crate) fn is_memory_path(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|p| p == ":memory:" || p.starts_with("file::memory:"))
}

/// Resolve `path` to the absolute key the registry shares handles by.
///
/// Existing files are canonicalized (symlinks resolved); for a file that does not exist yet
/// the parent directory is canonicalized instead.
///
/// # Errors
/// Returns `SqlUnifyError::ConfigError` when the path cannot be made absolute.
pub(crate) fn canonical_path(path: &Path) -> Result<PathBuf, SqlUnifyError> {
    let config_err =
        |err: std::io::Error| SqlUnifyError::ConfigError(format!("{}: {err}", path.display()));
    if path.exists() {
        return std::fs::canonicalize(path).map_err(config_err);
    }
    let absolute = std::path::absolute(path).map_err(config_err)?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => std::fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .map_err(config_err),
        _ => Ok(absolute),
    }
}
