use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::store::StorePath;

/// Longest item name accepted, in characters.
pub const MAX_NAME_LEN: usize = 60;

/// Current list state keyed by item id, in the order the store lists keys.
pub type ItemMap = BTreeMap<String, Item>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Goals,
    Reminders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Done,
}

/// Remote mutations a list issues, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Add,
    Delete,
    UpdateStatus,
    UpdateName,
    UpdateNote,
}

impl ItemStatus {
    pub fn toggled(self) -> Self {
        match self {
            ItemStatus::Pending => ItemStatus::Done,
            ItemStatus::Done => ItemStatus::Pending,
        }
    }
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Goals, Collection::Reminders];

    /// Store path segment and local cache key.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Goals => "goals",
            Collection::Reminders => "reminders",
        }
    }

    pub fn path(self) -> StorePath {
        StorePath::root()
            .child(self.key())
            .unwrap_or_default()
    }

    pub fn item_path(self, id: &str) -> Result<StorePath, crate::store::StoreError> {
        self.path().child(id)
    }

    fn noun(self) -> &'static str {
        match self {
            Collection::Goals => "goal",
            Collection::Reminders => "reminder",
        }
    }

    fn title_noun(self) -> &'static str {
        match self {
            Collection::Goals => "Goal",
            Collection::Reminders => "Reminder",
        }
    }

    pub fn initial_status(self) -> ItemStatus {
        ItemStatus::Pending
    }

    /// Value stored in the `isDone` field.
    pub fn wire_status(self, status: ItemStatus) -> &'static str {
        match (self, status) {
            (Collection::Goals, ItemStatus::Pending) => "pending",
            (Collection::Goals, ItemStatus::Done) => "achieved",
            (Collection::Reminders, ItemStatus::Pending) => "✖️",
            (Collection::Reminders, ItemStatus::Done) => "✔️",
        }
    }

    /// Anything other than the collection's "done" value reads as pending.
    pub fn decode_status(self, raw: Option<&str>) -> ItemStatus {
        match raw {
            Some(raw) if raw == self.wire_status(ItemStatus::Done) => ItemStatus::Done,
            _ => ItemStatus::Pending,
        }
    }

    pub fn status_icon(self, status: ItemStatus) -> &'static str {
        match (self, status) {
            (Collection::Goals, ItemStatus::Pending) => "⏳",
            (Collection::Reminders, ItemStatus::Pending) => "✖️",
            (_, ItemStatus::Done) => "✔️",
        }
    }

    pub fn empty_name_message(self) -> String {
        format!("Please enter your {}!", self.noun())
    }

    pub fn name_too_long_message(self) -> String {
        format!(
            "{} title is too long! Maximum {} characters allowed.",
            self.title_noun(),
            MAX_NAME_LEN
        )
    }

    pub fn delete_prompt(self) -> String {
        format!("Are you sure you want to delete this {}?", self.noun())
    }

    pub fn failure_message(self, action: ItemAction) -> String {
        let noun = self.noun();
        let what = match action {
            ItemAction::Add => format!("add {}", noun),
            ItemAction::Delete => format!("delete {}", noun),
            ItemAction::UpdateStatus => format!("update {} status", noun),
            ItemAction::UpdateName => format!("update {} name", noun),
            ItemAction::UpdateNote => format!("update {} note", noun),
        };
        format!("Failed to {}. Please try again.", what)
    }

    pub fn loading_message(self) -> String {
        format!("Loading {}...", self.key())
    }

    pub fn empty_message(self) -> String {
        format!("No {} yet. Add your first {}!", self.key(), self.noun())
    }

    pub fn error_message(self) -> String {
        format!("Error loading {}. Please refresh.", self.key())
    }

    pub fn no_results_message(self, query: &str) -> String {
        format!("No results found for \"{}\"", query)
    }

    /// Decode a collection snapshot. Entries that are not item objects are
    /// skipped.
    pub fn decode_snapshot(self, snapshot: Option<&Value>) -> ItemMap {
        let Some(snapshot) = snapshot else {
            return ItemMap::new();
        };
        let Some(entries) = snapshot.as_object() else {
            warn!("{} snapshot is not an object, treating as empty", self.key());
            return ItemMap::new();
        };

        entries
            .iter()
            .filter_map(|(id, raw)| {
                match serde_json::from_value::<ItemRecord>(raw.clone()) {
                    Ok(record) => Some((id.clone(), record.into_item(self, id))),
                    Err(e) => {
                        warn!("skipping malformed {} {}: {}", self.noun(), id, e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Item as stored under `<collection>/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isDone", default)]
    pub is_done: Option<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl ItemRecord {
    pub fn new(collection: Collection, name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            is_done: Some(collection.wire_status(collection.initial_status()).to_string()),
            note: String::new(),
            timestamp: now.timestamp_millis(),
        }
    }

    pub fn into_item(self, collection: Collection, id: &str) -> Item {
        Item {
            id: id.to_string(),
            status: collection.decode_status(self.is_done.as_deref()),
            name: self.name,
            note: self.note,
            created_at: DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItemRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameItemRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: String,
}
