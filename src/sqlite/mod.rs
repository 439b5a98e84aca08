// SQLite module: every statement runs on the write serializer owned by one worker thread.
//
// - config: open options and path resolution
// - params: conversion between RowValues and rusqlite values
// - query: statement execution and result extraction
// - worker: the single-writer queue
// - registry: one serializer per resolved file path
// - engine: the handle the engine layer talks to

pub mod config;
pub mod engine;
pub mod params;
pub mod query;
pub mod registry;
pub mod worker;

pub use config::SqliteOptions;
pub use engine::SqliteEngine;
pub use query::build_result_set;
pub use registry::SqliteRegistry;
pub use worker::{SerializerStats, SqliteSerializer};
