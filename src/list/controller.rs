use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::LocalCache;
use crate::error::AppError;
use crate::models::{Collection, Item, ItemAction, ItemMap, ItemRecord, ItemStatus, MAX_NAME_LEN};
use crate::store::{RemoteStore, StoreError, StoreEvent, StorePath, Subscription};

use super::render::render_rows;
use super::view::{ListView, ViewRow};

/// Answers an interactive yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "name", rename_all = "snake_case")]
pub enum RenameOutcome {
    Unchanged,
    Renamed(String),
}

#[derive(Default)]
struct ListState {
    items: ItemMap,
    query: String,
    /// Statuses patched into the view ahead of the store's echo.
    patched: HashMap<String, ItemStatus>,
    /// Snapshots received from the subscription so far.
    snapshots: u64,
    failed: bool,
}

/// One live list (goals or reminders): cached first paint, a standing
/// subscription that redraws on every snapshot, and the mutations a user
/// can issue against it.
pub struct ListController {
    collection: Collection,
    store: Arc<dyn RemoteStore>,
    view: Arc<dyn ListView>,
    state: Arc<Mutex<ListState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ListController {
    pub async fn start(
        collection: Collection,
        store: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        view: Arc<dyn ListView>,
    ) -> Self {
        view.replace_all(vec![ViewRow::placeholder(collection.loading_message())]);
        let state = Arc::new(Mutex::new(ListState::default()));

        if let Some(items) = read_cached(collection, cache.as_ref()).await {
            debug!("painting {} {} from local cache", items.len(), collection.key());
            let mut guard = lock(&state);
            guard.items = items;
            redraw(collection, &mut guard, view.as_ref());
        }

        let listener = match store.subscribe(&collection.path()).await {
            Ok(subscription) => {
                info!("subscribed to {}", collection.key());
                Some(tokio::spawn(listen(
                    collection,
                    subscription,
                    state.clone(),
                    cache,
                    view.clone(),
                )))
            }
            Err(e) => {
                error!("Error loading {}: {}", collection.key(), e);
                fail(collection, &state, view.as_ref());
                None
            }
        };

        Self {
            collection,
            store,
            view,
            state,
            listener: Mutex::new(listener),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Last snapshot received (or read from the cache).
    pub fn items(&self) -> ItemMap {
        self.lock().items.clone()
    }

    pub fn is_failed(&self) -> bool {
        self.lock().failed
    }

    /// Release the subscription. Idempotent.
    pub fn stop(&self) {
        let handle = match self.listener.lock() {
            Ok(mut listener) => listener.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
            info!("unsubscribed from {}", self.collection.key());
        }
    }

    pub async fn create(&self, input: &str) -> Result<String, AppError> {
        let name = input.trim();
        if name.is_empty() {
            return Err(AppError::Validation(self.collection.empty_name_message()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(self.collection.name_too_long_message()));
        }

        let path = self.store.create_child_path(&self.collection.path())?;
        let record = ItemRecord::new(self.collection, name, Utc::now());
        let value = serde_json::to_value(&record).map_err(StoreError::from)?;
        self.store
            .write(&path, value)
            .await
            .map_err(|e| self.remote_failure(ItemAction::Add, e))?;

        let id = path.key().unwrap_or_default().to_string();
        info!("created {} {}", self.collection.key(), id);
        Ok(id)
    }

    /// Rename from the edit box's final text. Input past the length cap is
    /// dropped, as the edit box would have; blank or unchanged text writes
    /// nothing.
    pub async fn rename(&self, id: &str, input: &str) -> Result<RenameOutcome, AppError> {
        let current = self.item_field(id, |item| item.name.clone())?;
        let capped: String = input.chars().take(MAX_NAME_LEN).collect();
        let name = capped.trim();
        if name.is_empty() || name == current {
            return Ok(RenameOutcome::Unchanged);
        }

        let path = self.field_path(id, "name")?;
        self.store
            .write(&path, json!(name))
            .await
            .map_err(|e| self.remote_failure(ItemAction::UpdateName, e))?;
        Ok(RenameOutcome::Renamed(name.to_string()))
    }

    /// Flip the status the row currently shows, then patch the row without
    /// waiting for the store to echo the change back. A snapshot that lands
    /// while the write is in flight governs the row instead of the patch.
    pub async fn toggle_done(&self, id: &str) -> Result<ItemStatus, AppError> {
        let (current, seen) = {
            let state = self.lock();
            let current = state
                .patched
                .get(id)
                .copied()
                .or_else(|| state.items.get(id).map(|item| item.status));
            (current, state.snapshots)
        };
        let next = current.ok_or(AppError::NotFound)?.toggled();

        let path = self.field_path(id, "isDone")?;
        self.store
            .write(&path, json!(self.collection.wire_status(next)))
            .await
            .map_err(|e| self.remote_failure(ItemAction::UpdateStatus, e))?;

        let mut state = self.lock();
        if state.snapshots == seen && !state.failed {
            state.patched.insert(id.to_string(), next);
            self.view
                .patch_status(id, next, self.collection.status_icon(next));
        }
        Ok(next)
    }

    /// Persist the note as it stands, changed or not.
    pub async fn save_note(&self, id: &str, note: &str) -> Result<(), AppError> {
        self.item_field(id, |_| ())?;
        let path = self.field_path(id, "note")?;
        self.store
            .write(&path, json!(note))
            .await
            .map_err(|e| self.remote_failure(ItemAction::UpdateNote, e))
    }

    /// Returns whether the item was removed; a declined prompt removes nothing.
    pub async fn delete(&self, id: &str, confirm: impl Confirm) -> Result<bool, AppError> {
        self.item_field(id, |_| ())?;
        if !confirm.confirm(&self.collection.delete_prompt()) {
            return Ok(false);
        }
        let path = self.collection.item_path(id)?;
        self.store
            .delete(&path)
            .await
            .map_err(|e| self.remote_failure(ItemAction::Delete, e))?;
        info!("deleted {} {}", self.collection.key(), id);
        Ok(true)
    }

    pub fn toggle_note_visibility(&self, id: &str) -> Result<bool, AppError> {
        self.view.toggle_note(id).ok_or(AppError::NotFound)
    }

    pub fn search(&self, query: &str) {
        let mut state = self.lock();
        state.query = query.to_string();
        redraw(self.collection, &mut state, self.view.as_ref());
    }

    fn item_field<T>(&self, id: &str, f: impl FnOnce(&Item) -> T) -> Result<T, AppError> {
        self.lock().items.get(id).map(f).ok_or(AppError::NotFound)
    }

    fn field_path(&self, id: &str, field: &str) -> Result<StorePath, AppError> {
        Ok(self.collection.item_path(id)?.child(field)?)
    }

    fn remote_failure(&self, action: ItemAction, e: StoreError) -> AppError {
        AppError::remote(self.collection.failure_message(action), e)
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        lock(&self.state)
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn read_cached(collection: Collection, cache: &dyn LocalCache) -> Option<ItemMap> {
    let raw = match cache.get(collection.key()).await {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("could not read cached {}: {}", collection.key(), e);
            return None;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Some(collection.decode_snapshot(Some(&value))),
        Err(e) => {
            warn!("Error parsing cached {}: {}", collection.key(), e);
            None
        }
    }
}

async fn listen(
    collection: Collection,
    mut subscription: Subscription,
    state: Arc<Mutex<ListState>>,
    cache: Arc<dyn LocalCache>,
    view: Arc<dyn ListView>,
) {
    while let Some(event) = subscription.next().await {
        match event {
            StoreEvent::Snapshot(snapshot) => {
                let items = collection.decode_snapshot(snapshot.as_ref());
                let serialized = snapshot
                    .unwrap_or_else(|| Value::Object(Map::new()))
                    .to_string();
                if let Err(e) = cache.set(collection.key(), &serialized).await {
                    warn!("could not cache {}: {}", collection.key(), e);
                }

                let mut guard = lock(&state);
                guard.items = items;
                guard.snapshots += 1;
                redraw(collection, &mut guard, view.as_ref());
            }
            StoreEvent::Failed(e) => {
                error!("Error loading {}: {}", collection.key(), e);
                fail(collection, &state, view.as_ref());
                return;
            }
        }
    }

    error!("subscription to {} ended without an error", collection.key());
    fail(collection, &state, view.as_ref());
}

fn redraw(collection: Collection, state: &mut ListState, view: &dyn ListView) {
    if state.failed {
        return;
    }
    state.patched.clear();
    view.replace_all(render_rows(collection, &state.items, &state.query));
}

fn fail(collection: Collection, state: &Mutex<ListState>, view: &dyn ListView) {
    lock(state).failed = true;
    view.replace_all(vec![ViewRow::Error { message: collection.error_message() }]);
}

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
