use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::SqlUnifyError;

use super::config::{SqliteOptions, canonical_path};
use super::worker::SqliteSerializer;

struct Entry {
    serializer: Arc<SqliteSerializer>,
    handles: usize,
    closing: bool,
}

/// Canonical-handle registry: at most one serializer per resolved database path.
///
/// Cloning is cheap and clones share the same map. Handles opened through different
/// registries do not see each other.
#[derive(Clone, Default)]
pub struct SqliteRegistry {
    entries: Arc<Mutex<HashMap<PathBuf, Entry>>>,
}

impl SqliteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, Entry>>, SqlUnifyError> {
        self.entries.lock().map_err(|err| {
            SqlUnifyError::ConnectionError(format!("SQLite registry poisoned: {err}"))
        })
    }

    /// Share the serializer for `options.path`, opening it on first use.
    ///
    /// In-memory databases are private: they get a fresh serializer and no registry key.
    ///
    /// # Errors
    /// Returns the open error for a new file, `ConfigError` for an unresolvable path, or
    /// `ClosedError` while the file's last handle is still draining its queue.
    pub(crate) fn acquire(
        &self,
        options: &SqliteOptions,
    ) -> Result<(Arc<SqliteSerializer>, Option<PathBuf>), SqlUnifyError> {
        if options.is_in_memory() {
            let conn = options.open_connection()?;
            let serializer = SqliteSerializer::spawn(conn, options.path.display().to_string())?;
            return Ok((Arc::new(serializer), None));
        }

        let key = canonical_path(&options.path)?;
        let mut entries = self.lock()?;
        let serializer = match entries.entry(key.clone()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.closing {
                    return Err(SqlUnifyError::ClosedError(format!(
                        "SQLite database {} is closing",
                        key.display()
                    )));
                }
                entry.handles += 1;
                debug!(path = %key.display(), handles = entry.handles, "sqlite handle shared");
                Arc::clone(&entry.serializer)
            }
            MapEntry::Vacant(vacant) => {
                let conn = options.with_path(&key).open_connection()?;
                let serializer = Arc::new(SqliteSerializer::spawn(
                    conn,
                    key.display().to_string(),
                )?);
                vacant.insert(Entry {
                    serializer: Arc::clone(&serializer),
                    handles: 1,
                    closing: false,
                });
                serializer
            }
        };
        Ok((serializer, Some(key)))
    }

    fn lock_for_release(&self) -> MutexGuard<'_, HashMap<PathBuf, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Drop one handle's share; returns the serializer once the last share is gone so the
    /// caller can close it.
    ///
    /// The entry stays registered, marked closing, until [`finish_close`](Self::finish_close)
    /// so the file never has two serializers at once.
    pub(crate) fn release(&self, key: &Path) -> Option<Arc<SqliteSerializer>> {
        let mut entries = self.lock_for_release();
        let entry = entries.get_mut(key)?;
        entry.handles = entry.handles.saturating_sub(1);
        if entry.handles > 0 || entry.closing {
            return None;
        }
        entry.closing = true;
        Some(Arc::clone(&entry.serializer))
    }

    /// Forget `serializer` once it has closed, making the path openable again.
    pub(crate) fn finish_close(&self, key: &Path, serializer: &Arc<SqliteSerializer>) {
        let mut entries = self.lock_for_release();
        let current = entries
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(&entry.serializer, serializer));
        if current {
            entries.remove(key);
            debug!(path = %key.display(), "sqlite file unregistered");
        }
    }

    /// Number of distinct database files currently open.
    #[must_use]
    pub fn open_files(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or_default()
    }

    /// Number of live handles sharing `path`.
    #[must_use]
    pub fn handle_count(&self, path: impl AsRef<Path>) -> usize {
        let Ok(key) = canonical_path(path.as_ref()) else {
            return 0;
        };
        self.lock()
            .ok()
            .and_then(|entries| entries.get(&key).map(|entry| entry.handles))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry")
            .field("open_files", &self.open_files())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_file_shares_one_serializer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SqliteRegistry::new();
        let options = SqliteOptions::new(dir.path().join("shared.db"));

        let (first, key) = registry.acquire(&options).unwrap();
        let (second, _) = registry
            .acquire(&options.with_path(dir.path().join(".").join("shared.db")))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.open_files(), 1);
        assert_eq!(registry.handle_count(dir.path().join("shared.db")), 2);

        let key = key.unwrap();
        assert!(registry.release(&key).is_none());
        let last = registry.release(&key).unwrap();
        last.close().await.unwrap();
        registry.finish_close(&key, &last);
        assert_eq!(registry.open_files(), 0);
    }

    #[tokio::test]
    async fn closing_file_cannot_be_reopened_until_drained() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SqliteRegistry::new();
        let options = SqliteOptions::new(dir.path().join("closing.db"));

        let (serializer, key) = registry.acquire(&options).unwrap();
        let key = key.unwrap();
        let last = registry.release(&key).unwrap();
        assert!(Arc::ptr_eq(&serializer, &last));
        assert!(registry.release(&key).is_none());

        let err = registry.acquire(&options).unwrap_err();
        assert!(err.is_closed(), "{err:?}");
        assert_eq!(registry.open_files(), 1);

        last.close().await.unwrap();
        registry.finish_close(&key, &last);
        assert_eq!(registry.open_files(), 0);

        let (reopened, _) = registry.acquire(&options).unwrap();
        assert!(!Arc::ptr_eq(&reopened, &last));
        // A stale finish_close must not evict the new serializer.
        registry.finish_close(&key, &last);
        assert_eq!(registry.open_files(), 1);
        assert!(registry.release(&key).is_some());
    }

    #[tokio::test]
    async fn memory_databases_bypass_the_registry() {
        let registry = SqliteRegistry::new();
        let (a, key_a) = registry.acquire(&SqliteOptions::in_memory()).unwrap();
        let (b, key_b) = registry.acquire(&SqliteOptions::in_memory()).unwrap();
        assert!(key_a.is_none() && key_b.is_none());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.open_files(), 0);
    }
}
