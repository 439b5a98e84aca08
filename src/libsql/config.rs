use std::path::PathBuf;

use deadpool_libsql::libsql::Builder;
use deadpool_libsql::{Manager, Pool};
use tracing::warn;

use crate::error::SqlUnifyError;

/// Where a `LibSQL` engine lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibsqlTarget {
    Local(PathBuf),
    Remote { url: String, auth_token: String },
}

/// Options for a `LibSQL` engine.
#[derive(Debug, Clone)]
pub struct LibsqlOptions {
    pub target: LibsqlTarget,
    pub max_connections: usize,
}

impl LibsqlOptions {
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            target: LibsqlTarget::Local(path.into()),
            max_connections: 4,
        }
    }

    #[must_use]
    pub fn remote(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            target: LibsqlTarget::Remote {
                url: url.into(),
                auth_token: auth_token.into(),
            },
            max_connections: 4,
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Stateless HTTP endpoints cannot hold a transaction open across requests.
    #[must_use]
    pub fn transactions_supported(&self) -> bool {
        match &self.target {
            LibsqlTarget::Local(_) => true,
            LibsqlTarget::Remote { url, .. } => {
                let url = url.to_ascii_lowercase();
                !(url.starts_with("http://") || url.starts_with("https://"))
            }
        }
    }

    /// Same settings, another local file.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::ConfigError` for remote targets, which are bound to one
    /// database by their URL.
    pub fn with_database(&self, database: &str) -> Result<Self, SqlUnifyError> {
        match &self.target {
            LibsqlTarget::Local(_) => Ok(Self {
                target: LibsqlTarget::Local(PathBuf::from(database)),
                max_connections: self.max_connections,
            }),
            LibsqlTarget::Remote { url, .. } => Err(SqlUnifyError::ConfigError(format!(
                "remote libsql endpoint {url} cannot switch database"
            ))),
        }
    }

    /// Open the database and build its connection pool.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::ConnectionError` if the database or pool cannot be created.
    pub async fn build_pool(&self) -> Result<Pool, SqlUnifyError> {
        let builder = match &self.target {
            LibsqlTarget::Local(path) => Builder::new_local(path).build().await,
            LibsqlTarget::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
            }
        };
        let db = builder.map_err(|e| {
            SqlUnifyError::ConnectionError(format!("Failed to create libsql database: {e}"))
        })?;

        let pool = Pool::builder(Manager::from_libsql_database(db))
            .max_size(self.max_connections.max(1))
            .build()
            .map_err(|e| {
                SqlUnifyError::ConnectionError(format!("Failed to create libsql pool: {e}"))
            })?;

        if let LibsqlTarget::Local(path) = &self.target {
            let conn = pool.get().await.map_err(|e| {
                SqlUnifyError::ConnectionError(format!("Failed to get libsql connection: {e}"))
            })?;
            if let Err(e) = conn.query("PRAGMA journal_mode = WAL", ()).await {
                warn!(path = %path.display(), error = %e, "libsql WAL mode not applied");
            }
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateless_http_endpoints_cannot_hold_transactions() {
        assert!(LibsqlOptions::local("a.db").transactions_supported());
        assert!(LibsqlOptions::remote("libsql://db.example", "t").transactions_supported());
        assert!(!LibsqlOptions::remote("https://db.example", "t").transactions_supported());
        assert!(!LibsqlOptions::remote("HTTP://db.example", "t").transactions_supported());
    }

    #[test]
    fn only_local_targets_switch_database() {
        let other = LibsqlOptions::local("a.db").with_database("b.db").unwrap();
        assert_eq!(other.target, LibsqlTarget::Local(PathBuf::from("b.db")));
        assert!(matches!(
            LibsqlOptions::remote("https://x", "t").with_database("b"),
            Err(SqlUnifyError::ConfigError(_))
        ));
    }
}
