//! Durable key-value blob storage provided by the host.
//!
//! The store is the only thing that survives a process restart. It is
//! addressed as named containers holding named blobs; the history store uses
//! exactly one slot to hold the serialized database image.

use crate::{HistoryError, Result};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Host-provided durable blob storage.
pub trait BlockStore: Send + Sync + 'static {
    /// Read the blob stored under `key` in `container`.
    ///
    /// Returns `Ok(None)` when the container or key does not exist yet.
    fn get(
        &self,
        container: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key` in `container`, replacing any prior value.
    ///
    /// The container is created if absent.
    fn put(
        &self,
        container: &str,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Process-local [`BlockStore`].
///
/// Clones share the same slots, so a clone kept aside outlives a dropped
/// database and can be used to reopen it.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    slots: Arc<DashMap<(String, String), Vec<u8>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail, simulating a host that rejects access.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail, simulating a full or revoked host store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current bytes in a slot, without going through the async interface.
    pub fn snapshot(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.slots
            .get(&(container.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Overwrite a slot directly.
    pub fn insert_raw(&self, container: &str, key: &str, value: Vec<u8>) {
        self.slots
            .insert((container.to_string(), key.to_string()), value);
    }
}

impl BlockStore for MemoryBlockStore {
    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(HistoryError::BlockStoreError(format!(
                "read rejected for {}/{}",
                container, key
            )));
        }
        Ok(self.snapshot(container, key))
    }

    async fn put(&self, container: &str, key: &str, value: Vec<u8>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HistoryError::BlockStoreError(format!(
                "write rejected for {}/{}",
                container, key
            )));
        }
        self.insert_raw(container, key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_slot_is_none() {
        let store = MemoryBlockStore::new();
        assert!(store.get("database", "pdfground.db").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_value() {
        let store = MemoryBlockStore::new();
        store.put("database", "slot", vec![1, 2, 3]).await.unwrap();
        store.put("database", "slot", vec![9]).await.unwrap();
        assert_eq!(store.get("database", "slot").await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let store = MemoryBlockStore::new();
        let other = store.clone();
        store.put("database", "slot", vec![7]).await.unwrap();
        assert_eq!(other.snapshot("database", "slot"), Some(vec![7]));
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = MemoryBlockStore::new();
        store.set_fail_writes(true);
        let err = store.put("database", "slot", vec![1]).await.unwrap_err();
        assert!(matches!(err, HistoryError::BlockStoreError(_)));

        store.set_fail_writes(false);
        store.put("database", "slot", vec![1]).await.unwrap();

        store.set_fail_reads(true);
        assert!(store.get("database", "slot").await.is_err());
    }
}
