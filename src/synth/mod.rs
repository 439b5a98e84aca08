//! Statement synthesis.
//!
//! Turns structured requests (columns, rows, key lists) into [`Statement`]s for one
//! [`EngineKind`]. Nothing in here performs I/O; the output is deterministic for a given
//! engine kind and input.
//!
//! [`Statement`]: crate::statement::Statement
//! [`EngineKind`]: crate::types::EngineKind

mod catalog;
mod ddl;
mod dml;

pub use catalog::{TABLE_NAME_COLUMN, build_list_tables};
pub use ddl::{
    build_create_index, build_create_table, build_drop_table, build_truncate,
    foreign_key_name, index_name,
};
pub use dml::{build_multi_insert, build_multi_update};

use crate::error::SqlUnifyError;

pub(crate) fn require_name(what: &str, name: &str) -> Result<(), SqlUnifyError> {
    if name.trim().is_empty() {
        Err(SqlUnifyError::ValidationError(format!(
            "{what} name must not be empty"
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn require_names<S: AsRef<str>>(what: &str, names: &[S]) -> Result<(), SqlUnifyError> {
    names
        .iter()
        .try_for_each(|name| require_name(what, name.as_ref()))
}
