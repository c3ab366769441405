use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::{RemoteStore, StoreError, StoreEvent, StorePath, Subscription, tree};

/// In-process document store. Used when no hosted store is configured and
/// as the store behind the tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    root: Value,
    subscribers: Vec<Subscriber>,
    offline: bool,
}

struct Subscriber {
    path: StorePath,
    last: Option<Value>,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(root: Value) -> Self {
        let store = Self::new();
        store.lock().root = root;
        store
    }

    /// While offline every read, write and new subscription fails.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Terminate every subscription overlapping `path` with an error.
    pub fn fail_subscriptions(&self, path: &StorePath, reason: &str) {
        let mut inner = self.lock();
        inner.subscribers.retain(|sub| {
            if sub.path.overlaps(path) {
                let _ = sub
                    .tx
                    .send(StoreEvent::Failed(StoreError::Cancelled(reason.to_string())));
                false
            } else {
                true
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|sub| !sub.tx.is_closed());
        inner.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn apply(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(StoreError::Unavailable);
        }
        tree::set_at(&mut inner.root, path, value);
        inner.notify(path);
        Ok(())
    }
}

impl Inner {
    fn notify(&mut self, changed: &StorePath) {
        let root = &self.root;
        self.subscribers.retain_mut(|sub| {
            if !sub.path.overlaps(changed) {
                return !sub.tx.is_closed();
            }
            let current = tree::get_at(root, &sub.path).cloned();
            if current == sub.last {
                return true;
            }
            sub.last = current.clone();
            sub.tx.send(StoreEvent::Snapshot(current)).is_ok()
        });
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let inner = self.lock();
        if inner.offline {
            return Err(StoreError::Unavailable);
        }
        Ok(tree::get_at(&inner.root, path).cloned())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(StoreError::Unavailable);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let current = tree::get_at(&inner.root, path).cloned();
        let _ = tx.send(StoreEvent::Snapshot(current.clone()));
        inner.subscribers.push(Subscriber {
            path: path.clone(),
            last: current,
            tx,
        });
        debug!("memory store: subscribed to {}", path);
        Ok(Subscription::new(path.clone(), rx))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.apply(path, value)
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        self.apply(path, Value::Null)
    }
}
