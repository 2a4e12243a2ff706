//! In-memory key-value database, intended for tests and throwaway runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::key_value_db::{KeyValueDb, KeyValueDbWrites, KeyValueEntry, Result, WriteOp};

type Entries = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// An ordered in-memory implementation of `KeyValueDb`.
#[derive(Default)]
pub struct MemoryKeyValueDb {
    entries: Entries,
}

impl MemoryKeyValueDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueDb for MemoryKeyValueDb {
    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn list_entries(&self, prefix: &[u8]) -> Result<Vec<KeyValueEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KeyValueEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn count_prefix(&self, prefix: &[u8]) -> Result<u64> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .count() as u64)
    }

    async fn last_entry(&self, prefix: &[u8]) -> Result<Option<KeyValueEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .last()
            .map(|(key, value)| KeyValueEntry {
                key: key.clone(),
                value: value.clone(),
            }))
    }

    async fn write(&self) -> Result<Box<dyn KeyValueDbWrites + Send>> {
        Ok(Box::new(MemoryWrites {
            entries: self.entries.clone(),
            pending: Vec::new(),
        }))
    }
}

struct MemoryWrites {
    entries: Entries,
    pending: Vec<WriteOp>,
}

#[async_trait]
impl KeyValueDbWrites for MemoryWrites {
    fn set(&mut self, key: Vec<u8>, val: Vec<u8>) {
        self.pending.push(WriteOp::Set { key, value: val });
    }

    fn del(&mut self, key: Vec<u8>) {
        self.pending.push(WriteOp::Del { key });
    }

    async fn flush(self: Box<Self>) -> Result<()> {
        let mut entries = self.entries.write().await;
        for op in self.pending {
            match op {
                WriteOp::Set { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Del { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}
