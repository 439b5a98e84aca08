//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_unify::prelude::*;
//!
//! let stmt = Statement::new("SELECT * FROM t WHERE c1 = ?", vec![RowValues::from("a")]);
//! # let _ = stmt;
//! ```

pub use crate::error::SqlUnifyError;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::schema::{Column, ForeignKey, IndexKind, ReferentialAction};
pub use crate::statement::{Statement, StatementMetadata, StatementResult};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{EngineKind, RowValues};

#[cfg(any(
    feature = "mysql",
    feature = "postgres",
    feature = "sqlite",
    feature = "libsql"
))]
pub use crate::engine::EngineHandle;

#[cfg(feature = "libsql")]
pub use crate::libsql::{LibsqlOptions, LibsqlTarget};
#[cfg(feature = "mysql")]
pub use crate::mysql::MysqlOptions;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresOptions;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SerializerStats, SqliteOptions, SqliteRegistry};
