//! LMDB-based key-value database implementation.
//!
//! Uses the heed crate to provide a persistent key-value store backed by LMDB.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::key_value_db::{
    KeyValueDb, KeyValueDbError, KeyValueDbWrites, KeyValueEntry, Result, WriteOp,
};

fn db_err(e: impl std::fmt::Display) -> KeyValueDbError {
    KeyValueDbError::Database(e.to_string())
}

// =============================================================================
// LmdbKeyValueDb
// =============================================================================

/// An LMDB-backed key-value database.
///
/// All LMDB calls run on the blocking thread pool.
pub struct LmdbKeyValueDb {
    env: Arc<Env>,
    db: Database<Bytes, Bytes>,
}

impl LmdbKeyValueDb {
    /// Open (or create) an LMDB database at the given path.
    ///
    /// Creates the directory if it doesn't exist. `map_size` is the maximum
    /// size the database may grow to.
    pub fn new(path: &Path, map_size: u64) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let map_size = usize::try_from(map_size).unwrap_or(usize::MAX);
        // SAFETY: the environment is opened once per path by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path)
                .map_err(db_err)?
        };

        let mut wtxn = env.write_txn().map_err(db_err)?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, None).map_err(db_err)?;
        wtxn.commit().map_err(db_err)?;

        Ok(Self {
            env: Arc::new(env),
            db,
        })
    }
}

#[async_trait]
impl KeyValueDb for LmdbKeyValueDb {
    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let env = self.env.clone();
        let db = self.db;
        let key = key.to_vec();

        tokio::task::spawn_blocking(move || {
            let rtxn = env.read_txn().map_err(db_err)?;
            let value = db.get(&rtxn, &key).map_err(db_err)?.map(|v| v.to_vec());
            Ok(value)
        })
        .await
        .map_err(db_err)?
    }

    async fn list_entries(&self, prefix: &[u8]) -> Result<Vec<KeyValueEntry>> {
        let env = self.env.clone();
        let db = self.db;
        let prefix = prefix.to_vec();

        tokio::task::spawn_blocking(move || {
            let rtxn = env.read_txn().map_err(db_err)?;
            let mut entries = Vec::new();
            for item in db.prefix_iter(&rtxn, &prefix).map_err(db_err)? {
                let (key, value) = item.map_err(db_err)?;
                entries.push(KeyValueEntry {
                    key: key.to_vec(),
                    value: value.to_vec(),
                });
            }
            Ok(entries)
        })
        .await
        .map_err(db_err)?
    }

    async fn count_prefix(&self, prefix: &[u8]) -> Result<u64> {
        let env = self.env.clone();
        let db = self.db;
        let prefix = prefix.to_vec();

        tokio::task::spawn_blocking(move || {
            let rtxn = env.read_txn().map_err(db_err)?;
            let mut count = 0u64;
            for item in db.prefix_iter(&rtxn, &prefix).map_err(db_err)? {
                item.map_err(db_err)?;
                count += 1;
            }
            Ok(count)
        })
        .await
        .map_err(db_err)?
    }

    async fn last_entry(&self, prefix: &[u8]) -> Result<Option<KeyValueEntry>> {
        let env = self.env.clone();
        let db = self.db;
        let prefix = prefix.to_vec();

        tokio::task::spawn_blocking(move || {
            let rtxn = env.read_txn().map_err(db_err)?;
            let mut iter = db.rev_prefix_iter(&rtxn, &prefix).map_err(db_err)?;
            match iter.next() {
                Some(item) => {
                    let (key, value) = item.map_err(db_err)?;
                    Ok(Some(KeyValueEntry {
                        key: key.to_vec(),
                        value: value.to_vec(),
                    }))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(db_err)?
    }

    async fn write(&self) -> Result<Box<dyn KeyValueDbWrites + Send>> {
        Ok(Box::new(LmdbWrites {
            env: self.env.clone(),
            db: self.db,
            pending: Vec::new(),
        }))
    }
}

// =============================================================================
// LmdbWrites
// =============================================================================

struct LmdbWrites {
    env: Arc<Env>,
    db: Database<Bytes, Bytes>,
    pending: Vec<WriteOp>,
}

#[async_trait]
impl KeyValueDbWrites for LmdbWrites {
    fn set(&mut self, key: Vec<u8>, val: Vec<u8>) {
        self.pending.push(WriteOp::Set { key, value: val });
    }

    fn del(&mut self, key: Vec<u8>) {
        self.pending.push(WriteOp::Del { key });
    }

    async fn flush(self: Box<Self>) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let env = self.env;
        let db = self.db;
        let pending = self.pending;

        tokio::task::spawn_blocking(move || {
            let mut wtxn = env.write_txn().map_err(db_err)?;

            for op in pending {
                match op {
                    WriteOp::Set { key, value } => {
                        db.put(&mut wtxn, &key, &value).map_err(db_err)?;
                    }
                    WriteOp::Del { key } => {
                        db.delete(&mut wtxn, &key).map_err(db_err)?;
                    }
                }
            }

            wtxn.commit().map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(db_err)?
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MAP_SIZE: u64 = 64 * 1024 * 1024;

    #[tokio::test]
    async fn test_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let db = LmdbKeyValueDb::new(temp_dir.path(), MAP_SIZE).unwrap();

        assert!(!db.exists(b"key1").await.unwrap());
        assert!(db.get(b"key1").await.unwrap().is_none());

        let mut writes = db.write().await.unwrap();
        writes.set(b"key1".to_vec(), b"value1".to_vec());
        writes.flush().await.unwrap();

        assert!(db.exists(b"key1").await.unwrap());
        assert_eq!(db.get(b"key1").await.unwrap(), Some(b"value1".to_vec()));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let db = LmdbKeyValueDb::new(temp_dir.path(), MAP_SIZE).unwrap();

        let mut writes = db.write().await.unwrap();
        writes.set(b"key1".to_vec(), b"value1".to_vec());
        writes.flush().await.unwrap();

        let mut writes = db.write().await.unwrap();
        writes.del(b"key1".to_vec());
        writes.flush().await.unwrap();

        assert!(!db.exists(b"key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_listing_is_ordered() {
        let temp_dir = TempDir::new().unwrap();
        let db = LmdbKeyValueDb::new(temp_dir.path(), MAP_SIZE).unwrap();

        let mut writes = db.write().await.unwrap();
        writes.set(b"a/2".to_vec(), b"two".to_vec());
        writes.set(b"b/1".to_vec(), b"other".to_vec());
        writes.set(b"a/1".to_vec(), b"one".to_vec());
        writes.flush().await.unwrap();

        let entries = db.list_entries(b"a/").await.unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_slice()).collect();
        assert_eq!(keys, vec![b"a/1".as_slice(), b"a/2".as_slice()]);
        assert_eq!(db.count_prefix(b"a/").await.unwrap(), 2);
        assert_eq!(db.count_prefix(b"c/").await.unwrap(), 0);

        let last = db.last_entry(b"a/").await.unwrap().unwrap();
        assert_eq!(last.value, b"two".to_vec());
        assert!(db.last_entry(b"c/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        {
            let db = LmdbKeyValueDb::new(temp_dir.path(), MAP_SIZE).unwrap();
            let mut writes = db.write().await.unwrap();
            writes.set(b"key".to_vec(), b"value".to_vec());
            writes.flush().await.unwrap();
        }
        let db = LmdbKeyValueDb::new(temp_dir.path(), MAP_SIZE).unwrap();
        assert_eq!(db.get(b"key").await.unwrap(), Some(b"value".to_vec()));
    }
}
