use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::models::{Collection, Item, ItemStatus};

const ADD_NOTE: &str = "Add Note";
const HIDE_NOTE: &str = "Hide Note";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    pub status_icon: String,
    pub note: String,
    pub note_visible: bool,
    pub note_toggle_label: String,
    pub created_at: DateTime<Utc>,
}

impl ItemRow {
    pub fn new(collection: Collection, item: &Item) -> Self {
        let note_visible = !item.note.is_empty();
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            status: item.status,
            status_icon: collection.status_icon(item.status).to_string(),
            note: item.note.clone(),
            note_visible,
            note_toggle_label: note_label(note_visible).to_string(),
            created_at: item.created_at,
        }
    }
}

fn note_label(visible: bool) -> &'static str {
    if visible { HIDE_NOTE } else { ADD_NOTE }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewRow {
    Item(ItemRow),
    Placeholder { message: String },
    Error { message: String },
}

impl ViewRow {
    pub fn placeholder(message: impl Into<String>) -> Self {
        ViewRow::Placeholder { message: message.into() }
    }

    pub fn as_item(&self) -> Option<&ItemRow> {
        match self {
            ViewRow::Item(row) => Some(row),
            _ => None,
        }
    }
}

/// Rendering surface for one list.
pub trait ListView: Send + Sync {
    /// Discard every row and show `rows` instead.
    fn replace_all(&self, rows: Vec<ViewRow>);

    /// Update one row's status and icon in place.
    fn patch_status(&self, id: &str, status: ItemStatus, icon: &str);

    /// Flip one row's note visibility. Returns the new visibility, or `None`
    /// when no such row is shown.
    fn toggle_note(&self, id: &str) -> Option<bool>;
}

/// A [`ListView`] that keeps the rows it was given, observable through a
/// watch channel.
pub struct RowBuffer {
    rows: watch::Sender<Vec<ViewRow>>,
}

impl Default for RowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RowBuffer {
    pub fn new() -> Self {
        let (rows, _) = watch::channel(Vec::new());
        Self { rows }
    }

    pub fn rows(&self) -> Vec<ViewRow> {
        self.rows.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<ViewRow>> {
        self.rows.subscribe()
    }

    pub fn item_rows(&self) -> Vec<ItemRow> {
        self.rows.borrow().iter().filter_map(ViewRow::as_item).cloned().collect()
    }

    fn with_row<T>(&self, id: &str, f: impl FnOnce(&mut ItemRow) -> T) -> Option<T> {
        let mut result = None;
        self.rows.send_if_modified(|rows| {
            let row = rows.iter_mut().find_map(|row| match row {
                ViewRow::Item(item) if item.id == id => Some(item),
                _ => None,
            });
            match row {
                Some(row) => {
                    result = Some(f(row));
                    true
                }
                None => false,
            }
        });
        result
    }
}

impl ListView for RowBuffer {
    fn replace_all(&self, rows: Vec<ViewRow>) {
        self.rows.send_replace(rows);
    }

    fn patch_status(&self, id: &str, status: ItemStatus, icon: &str) {
        self.with_row(id, |row| {
            row.status = status;
            row.status_icon = icon.to_string();
        });
    }

    fn toggle_note(&self, id: &str) -> Option<bool> {
        self.with_row(id, |row| {
            row.note_visible = !row.note_visible;
            row.note_toggle_label = note_label(row.note_visible).to_string();
            row.note_visible
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, note: &str) -> Item {
        Item {
            id: id.to_string(),
            name: "Run 5k".to_string(),
            status: ItemStatus::Pending,
            note: note.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn note_is_expanded_only_when_present() {
        let row = ItemRow::new(Collection::Goals, &item("a", ""));
        assert!(!row.note_visible);
        assert_eq!(row.note_toggle_label, "Add Note");

        let row = ItemRow::new(Collection::Goals, &item("a", "morning only"));
        assert!(row.note_visible);
        assert_eq!(row.note_toggle_label, "Hide Note");
    }

    #[test]
    fn patches_touch_only_the_named_row() {
        let buffer = RowBuffer::new();
        buffer.replace_all(vec![
            ViewRow::Item(ItemRow::new(Collection::Goals, &item("a", ""))),
            ViewRow::Item(ItemRow::new(Collection::Goals, &item("b", ""))),
        ]);

        buffer.patch_status("b", ItemStatus::Done, "✔️");
        assert_eq!(buffer.toggle_note("a"), Some(true));
        assert_eq!(buffer.toggle_note("missing"), None);

        let rows = buffer.item_rows();
        assert_eq!(rows[0].status, ItemStatus::Pending);
        assert!(rows[0].note_visible);
        assert_eq!(rows[1].status, ItemStatus::Done);
        assert_eq!(rows[1].status_icon, "✔️");
    }

    #[test]
    fn rows_serialize_with_kind_tag() {
        let value = serde_json::to_value(ViewRow::placeholder("Loading goals...")).unwrap();
        assert_eq!(value["kind"], "placeholder");
        assert_eq!(value["message"], "Loading goals...");
    }
}
