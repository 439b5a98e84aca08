//! Single-writer serializer: one OS thread per database file owns the native connection
//! and drains a command queue.

mod channel;
mod dispatcher;
mod manager;

pub use manager::{SerializerStats, SqliteSerializer};
