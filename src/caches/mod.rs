//! Key-value storage.
//!
//! ## Architecture
//!
//! [`KeyValueDb`] is the low-level ordered key-value interface the
//! [`crate::store::Store`] is built on:
//!
//! - [`LmdbKeyValueDb`] - persistent, LMDB-backed implementation
//! - [`MemoryKeyValueDb`] - ordered in-memory map for tests and `--in-memory` runs

mod key_value_db;
mod lmdb_key_value_db;
mod memory_key_value_db;

pub use key_value_db::{
    KeyValueDb, KeyValueDbError, KeyValueDbWrites, KeyValueEntry, Result, WriteOp,
};
pub use lmdb_key_value_db::LmdbKeyValueDb;
pub use memory_key_value_db::MemoryKeyValueDb;
