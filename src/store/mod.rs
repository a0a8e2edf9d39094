//! # Storage Contracts
//!
//! The core owns no storage engine. It consumes two external stores and
//! a capacity probe, all injected as trait objects:
//!
//! | Contract | Backing in production | Used by |
//! |----------|----------------------|---------|
//! | [`DocumentStore`] | hosted real-time document database | progression engine, ticket providers |
//! | [`LocalStorage`] | device key-value storage | offline ticket cache |
//! | [`StorageProbe`] | device free-space query | download precondition gate |
//!
//! ## Document store semantics
//!
//! Values live under slash-separated paths. `set` overwrites the whole
//! value at a path; `update` shallow-merges the partial object's
//! top-level keys into whatever is stored there. There are no
//! transactions across paths and no versioning: overlapping partial
//! writes resolve last-write-wins, which callers inherit knowingly.
//!
//! `subscribe` yields the full value at a path after each change, for
//! screens that render live state.
//!
//! In-memory reference implementations live in [`memory`]; hosts supply
//! their own adapters in production.

pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

pub use memory::{FixedStorageProbe, MemoryDocumentStore, MemoryLocalStorage};

/// Errors surfaced by the storage contracts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the call.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A value could not be serialized or deserialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-path document store: read, overwrite, merge, observe.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the value at `path` entirely.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Shallow-merge `partial`'s top-level keys into the value at
    /// `path`, creating the document when absent.
    async fn update(&self, path: &str, partial: Value) -> Result<(), StoreError>;

    /// Stream of the full value at `path` after each change.
    async fn subscribe(&self, path: &str) -> Result<BoxStream<'static, Value>, StoreError>;
}

/// Device-local persistent string storage.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Free-space query, consumed only as a download precondition.
#[async_trait]
pub trait StorageProbe: Send + Sync {
    /// Free local storage, in megabytes.
    async fn free_space_mb(&self) -> Result<u64, StoreError>;
}

/// Path conventions for the namespaces this core touches.
///
/// Game data is owned by this core; events and purchase records belong
/// to other parts of the system and are read-only from here.
pub mod paths {
    /// Per-user progression document.
    pub fn game_data(root: &str, user_id: &str) -> String {
        format!("{}/{}/gameData", root, user_id)
    }

    /// Event metadata document.
    pub fn event(event_id: &str) -> String {
        format!("eventos/{}", event_id)
    }

    /// A user's purchase mapping, ticket token → record.
    pub fn user_tickets(cpf: &str) -> String {
        format!("ingressos/{}", cpf)
    }

}
