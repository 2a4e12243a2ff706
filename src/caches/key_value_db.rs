//! Key-value database trait and types.
//!
//! This module defines the ordered key-value storage interface the store is built on.

use std::fmt;

use async_trait::async_trait;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during key-value database operations.
#[derive(Debug)]
pub enum KeyValueDbError {
    /// An I/O error occurred.
    Io(std::io::Error),
    /// Database error (e.g., from LMDB).
    Database(String),
}

impl fmt::Display for KeyValueDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValueDbError::Io(e) => write!(f, "I/O error: {}", e),
            KeyValueDbError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for KeyValueDbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyValueDbError::Io(e) => Some(e),
            KeyValueDbError::Database(_) => None,
        }
    }
}

impl From<std::io::Error> for KeyValueDbError {
    fn from(e: std::io::Error) -> Self {
        KeyValueDbError::Io(e)
    }
}

/// Result type for key-value database operations.
pub type Result<T> = std::result::Result<T, KeyValueDbError>;

// =============================================================================
// Entries
// =============================================================================

/// A key and its value, as returned by prefix listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// =============================================================================
// KeyValueDb Trait
// =============================================================================

/// An ordered key-value database.
///
/// Keys are compared bytewise; prefix listings come back in key order.
#[async_trait]
pub trait KeyValueDb: Send + Sync {
    /// Check if a key exists in the database.
    async fn exists(&self, key: &[u8]) -> Result<bool>;

    /// Get the value for a key, returning `None` if not found.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// List every entry whose key starts with `prefix`, in ascending key order.
    async fn list_entries(&self, prefix: &[u8]) -> Result<Vec<KeyValueEntry>>;

    /// Count the entries whose key starts with `prefix`.
    async fn count_prefix(&self, prefix: &[u8]) -> Result<u64>;

    /// The entry with the greatest key starting with `prefix`, if any.
    async fn last_entry(&self, prefix: &[u8]) -> Result<Option<KeyValueEntry>>;

    /// Get a write handle for buffered writes.
    ///
    /// Nothing is visible to readers until the handle is flushed, and a flush
    /// applies all of its writes atomically.
    async fn write(&self) -> Result<Box<dyn KeyValueDbWrites + Send>>;
}

// =============================================================================
// KeyValueDbWrites Trait
// =============================================================================

/// A write handle for buffered writes to a key-value database.
#[async_trait]
pub trait KeyValueDbWrites: Send {
    /// Set a key-value pair (buffered).
    fn set(&mut self, key: Vec<u8>, val: Vec<u8>);

    /// Delete a key (buffered).
    fn del(&mut self, key: Vec<u8>);

    /// Flush all buffered writes to the database.
    async fn flush(self: Box<Self>) -> Result<()>;
}

// =============================================================================
// Write Operation Enum
// =============================================================================

/// A pending write operation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Set a key to a value.
    Set { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Del { key: Vec<u8> },
}

