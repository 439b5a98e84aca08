// PostgreSQL module: pooled tokio-postgres clients behind the orchestrator.
//
// - config: connection options and the bb8 connection manager
// - params: RowValues -> ToSql
// - query: row extraction
// - executor: the orchestrator backend

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PgManager, PostgresOptions};
pub use executor::PostgresBackend;
pub use query::build_result_set;
