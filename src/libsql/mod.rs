//! `LibSQL` backend glue (local file or remote endpoint).
//!
//! - `config`: connection target and pool setup
//! - `params`: parameter conversion between `RowValues` and `LibSQL` values
//! - `query`: result extraction and building
//! - `executor`: the orchestrator backend and the stateless batch fallback

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{LibsqlOptions, LibsqlTarget};
pub use executor::LibsqlBackend;
pub use params::Params;
pub use query::build_result_set;
