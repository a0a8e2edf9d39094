//! # In-Memory Reference Stores
//!
//! Backend-free implementations of the storage contracts, used by the
//! test suites and by hosts that want to run the core without a real
//! backend. Both stores carry a fault toggle so callers can exercise
//! the unavailable-store paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{DocumentStore, LocalStorage, StorageProbe, StoreError};

/// Buffered change events per subscribed path.
const WATCH_BUFFER: usize = 64;

/// In-memory [`DocumentStore`].
///
/// Documents live in a path-keyed map; each subscribed path gets a
/// broadcast channel that fans the post-write value out to every
/// subscriber, mirroring how the hosted store pushes value-changed
/// events.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, Value>>>,
    watchers: Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backing store becoming unreachable. While offline,
    /// every operation returns [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn notify(&self, path: &str, value: &Value) {
        let watchers = self.watchers.lock().await;
        if let Some(sender) = watchers.get(path) {
            // Send only fails when every receiver is gone; stale
            // channels are harmless and reused on resubscribe.
            let _ = sender.send(value.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.check_online()?;
        let documents = self.documents.lock().await;
        Ok(documents.get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.check_online()?;
        {
            let mut documents = self.documents.lock().await;
            documents.insert(path.to_string(), value.clone());
        }
        debug!(path, "document overwritten");
        self.notify(path, &value).await;
        Ok(())
    }

    async fn update(&self, path: &str, partial: Value) -> Result<(), StoreError> {
        self.check_online()?;
        let merged = {
            let mut documents = self.documents.lock().await;
            let entry = documents
                .entry(path.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(source) = partial {
                if let Some(target) = entry.as_object_mut() {
                    for (key, value) in source {
                        target.insert(key, value);
                    }
                }
            }
            entry.clone()
        };
        debug!(path, "document merged");
        self.notify(path, &merged).await;
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<BoxStream<'static, Value>, StoreError> {
        self.check_online()?;
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .entry(path.to_string())
            .or_insert_with(|| broadcast::channel(WATCH_BUFFER).0);
        let receiver = sender.subscribe();

        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(value) => return Some((value, rx)),
                    // A slow subscriber skips missed revisions and
                    // resumes at the newest one.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

/// In-memory [`LocalStorage`].
#[derive(Clone, Default)]
pub struct MemoryLocalStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate device storage failures. While failing, every
    /// operation returns [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "local storage is failing".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStorage for MemoryLocalStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let items = self.items.lock().await;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut items = self.items.lock().await;
        items.remove(key);
        Ok(())
    }
}

/// [`StorageProbe`] reporting a configurable fixed amount.
#[derive(Clone)]
pub struct FixedStorageProbe {
    free_mb: Arc<AtomicU64>,
}

impl FixedStorageProbe {
    pub fn new(free_mb: u64) -> Self {
        Self {
            free_mb: Arc::new(AtomicU64::new(free_mb)),
        }
    }

    pub fn set_free_mb(&self, free_mb: u64) {
        self.free_mb.store(free_mb, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageProbe for FixedStorageProbe {
    async fn free_space_mb(&self) -> Result<u64, StoreError> {
        Ok(self.free_mb.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryDocumentStore::new();
        store.set("a/b", json!({ "x": 1 })).await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), Some(json!({ "x": 1 })));
        assert_eq!(store.get("a/c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_merges_top_level_keys_only() {
        let store = MemoryDocumentStore::new();
        store
            .set("doc", json!({ "a": { "inner": 1 }, "b": 2 }))
            .await
            .unwrap();
        store
            .update("doc", json!({ "a": { "other": 3 }, "c": 4 }))
            .await
            .unwrap();

        // Top-level "a" was replaced wholesale, not deep-merged.
        assert_eq!(
            store.get("doc").await.unwrap(),
            Some(json!({ "a": { "other": 3 }, "b": 2, "c": 4 }))
        );
    }

    #[tokio::test]
    async fn test_update_creates_missing_document() {
        let store = MemoryDocumentStore::new();
        store.update("fresh", json!({ "k": true })).await.unwrap();
        assert_eq!(store.get("fresh").await.unwrap(), Some(json!({ "k": true })));
    }

    #[tokio::test]
    async fn test_subscribe_sees_writes() {
        let store = MemoryDocumentStore::new();
        let mut stream = store.subscribe("watched").await.unwrap();

        store.set("watched", json!({ "v": 1 })).await.unwrap();
        store.update("watched", json!({ "w": 2 })).await.unwrap();

        assert_eq!(stream.next().await, Some(json!({ "v": 1 })));
        assert_eq!(stream.next().await, Some(json!({ "v": 1, "w": 2 })));
    }

    #[tokio::test]
    async fn test_offline_store_errors() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        assert!(store.get("a").await.is_err());
        assert!(store.set("a", json!(1)).await.is_err());

        store.set_offline(false);
        assert!(store.set("a", json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip_and_failure() {
        let local = MemoryLocalStorage::new();
        local.set_item("k", "v").await.unwrap();
        assert_eq!(local.get_item("k").await.unwrap(), Some("v".to_string()));

        local.remove_item("k").await.unwrap();
        assert_eq!(local.get_item("k").await.unwrap(), None);

        local.set_failing(true);
        assert!(local.get_item("k").await.is_err());
    }
}
