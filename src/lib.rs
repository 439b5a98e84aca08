//! One async contract for schema management, bulk mutation and transactions over
//! MySQL, `PostgreSQL`, `SQLite` and `LibSQL`.
//!
//! Callers describe tables with [`schema::Column`], write `?` placeholders everywhere, and
//! get the same [`statement::StatementResult`] shape back from every engine. Engine
//! differences are confined to [`dialect`] and [`synth`], which are pure and usable without
//! any backend feature.

pub mod dialect;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod statement;
pub mod synth;
pub mod translation;
pub mod types;

#[cfg(any(
    feature = "mysql",
    feature = "postgres",
    feature = "sqlite",
    feature = "libsql"
))]
pub mod engine;

#[cfg(feature = "libsql")]
pub mod libsql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::SqlUnifyError;
pub use statement::{Statement, StatementMetadata, StatementResult};
pub use types::{EngineKind, RowValues};
