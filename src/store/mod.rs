pub mod error;
pub mod memory;
pub mod path;
pub mod push_id;
pub mod rest;
pub mod sse;
pub mod tree;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use path::StorePath;
pub use rest::{RtdbClient, RtdbConfig};

/// What a standing subscription delivers. `Failed` is terminal: nothing
/// follows it.
#[derive(Debug)]
pub enum StoreEvent {
    Snapshot(Option<Value>),
    Failed(StoreError),
}

/// Handle to a standing subscription. Dropping it releases the subscription.
pub struct Subscription {
    path: StorePath,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    pump: Option<AbortHandle>,
}

impl Subscription {
    pub fn new(path: StorePath, events: mpsc::UnboundedReceiver<StoreEvent>) -> Self {
        Self { path, events, pump: None }
    }

    /// Attach the background task feeding this subscription so it stops with it.
    pub fn with_pump(mut self, pump: AbortHandle) -> Self {
        self.pump = Some(pump);
        self
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Next event, or `None` once the source has gone away.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        tracing::debug!("subscription to {} released", self.path);
    }
}

/// Key-path addressable document store with change subscriptions.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One-shot read; `None` when nothing is stored at `path`.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Delivers the current value immediately and again on every change.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;

    /// Replace the value at exactly `path`.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Remove the value at `path` and everything below it.
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Allocate a fresh, chronologically ordered child key under `collection`.
    fn create_child_path(&self, collection: &StorePath) -> Result<StorePath, StoreError> {
        collection.child(&push_id::generate())
    }
}
