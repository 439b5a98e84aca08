// MySQL-family module (MySQL, MariaDB): an sqlx pool behind the orchestrator.
//
// - config: connection options and pool construction
// - params: binding RowValues onto sqlx queries
// - query: row extraction
// - executor: the orchestrator backend

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::MysqlOptions;
pub use executor::MysqlBackend;
pub use query::build_result_set;
