use std::future::Future;
use std::str::FromStr;

use bb8::{ManageConnection, Pool};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::error::SqlUnifyError;

/// Options for a pooled `PostgreSQL` engine.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
    pub max_connections: u32,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            max_connections: 10,
        }
    }

    /// Parse a `postgres://` URL or a key/value connection string.
    ///
    /// # Errors
    /// Returns `SqlUnifyError::ConfigError` when the string does not parse.
    pub fn from_url(url: &str) -> Result<Self, SqlUnifyError> {
        tokio_postgres::Config::from_str(url)
            .map(Self::new)
            .map_err(|e| SqlUnifyError::ConfigError(format!("invalid postgres url: {e}")))
    }

    #[must_use]
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Same server and credentials, another database.
    #[must_use]
    pub fn with_database(&self, database: &str) -> Self {
        let mut options = self.clone();
        options.config.dbname(database);
        options
    }

    fn validate(&self) -> Result<(), SqlUnifyError> {
        if self.config.get_dbname().is_none() {
            return Err(SqlUnifyError::ConfigError("dbname is required".to_string()));
        }
        if self.config.get_hosts().is_empty() {
            return Err(SqlUnifyError::ConfigError("host is required".to_string()));
        }
        if self.config.get_user().is_none() {
            return Err(SqlUnifyError::ConfigError("user is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(SqlUnifyError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and build the connection pool. Connections are opened lazily.
    ///
    /// # Errors
    /// `ConfigError` for missing fields; `ConnectionError` if the pool cannot be built.
    pub async fn build_pool(&self) -> Result<Pool<PgManager>, SqlUnifyError> {
        self.validate()?;
        Pool::builder()
            .max_size(self.max_connections)
            .build(PgManager::new(self.config.clone()))
            .await
            .map_err(|e| SqlUnifyError::ConnectionError(format!("postgres pool error: {e}")))
    }
}

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    warn!(error = %e, "postgres connection task ended");
                }
            });
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}
